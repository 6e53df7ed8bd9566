//! JWT 认证与角色授权中间件

use crate::{error::AppError, middleware::AppState, telemetry::ACCESS_DENIED};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}

/// 路由访问级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// 无需令牌
    Public,
    /// 任意有效令牌
    Authenticated,
    /// 有效令牌且为管理员
    Admin,
}

impl Access {
    /// 为一组路由挂载对应的中间件
    ///
    /// 使用 route_layer，未匹配的路径仍然返回 404 而不是 401
    pub fn apply(
        self,
        router: Router<Arc<AppState>>,
        state: Arc<AppState>,
    ) -> Router<Arc<AppState>> {
        match self {
            Access::Public => router,
            Access::Authenticated => {
                router.route_layer(from_fn_with_state(state, jwt_auth_middleware))
            }
            // 后添加的层先执行：先认证，再检查角色
            Access::Admin => router
                .route_layer(from_fn(require_admin_middleware))
                .route_layer(from_fn_with_state(state, jwt_auth_middleware)),
        }
    }
}

/// 从 Authorization 头提取 Bearer 令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;

    let (scheme, token) = value.split_once(' ').ok_or(AppError::Unauthenticated)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthenticated);
    }

    Ok(token.to_string())
}

/// 校验请求头中的令牌并解析出认证上下文
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, AppError> {
    let token = extract_token(headers)?;
    let claims = state.jwt_service.verify(&token)?;
    let user_id = claims.user_id()?;

    // 令牌主体必须仍然存在
    if state.config.security.verify_subject_exists
        && state.credential_store.find_by_id(&user_id).await?.is_none()
    {
        tracing::debug!(user_id = %user_id, "Token subject no longer exists");
        return Err(AppError::Unauthenticated);
    }

    Ok(AuthContext {
        user_id,
        username: claims.username,
        is_admin: claims.is_admin,
    })
}

/// JWT 认证中间件 - 必须认证
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_context = match authenticate(&state, req.headers()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            if matches!(e, AppError::Unauthenticated) {
                metrics::counter!(ACCESS_DENIED, "reason" => "unauthenticated").increment(1);
            }
            return Err(e);
        }
    };

    // 附加到请求扩展
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// 管理员中间件 - 必须在 jwt_auth_middleware 之后执行
pub async fn require_admin_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    let auth_context = get_auth_context(&req)?;

    if !auth_context.is_admin {
        metrics::counter!(ACCESS_DENIED, "reason" => "forbidden").increment(1);
        tracing::warn!(
            user_id = %auth_context.user_id,
            uri = %req.uri().path(),
            "Admin access denied"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(req).await)
}

/// 从扩展中提取 AuthContext 的辅助函数
pub fn get_auth_context(req: &Request) -> Result<AuthContext, AppError> {
    req.extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or(AppError::Unauthenticated)
}
