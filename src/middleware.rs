//! HTTP 中间件与应用状态
//! 请求追踪、显式构造的服务上下文

use crate::{
    auth::{JwtService, PasswordCredentialVerifier, PasswordHasher},
    config::AppConfig,
    error::AppError,
    repository::{CredentialStore, EventStore},
    services::{AuthService, EventService},
};
use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

tokio::task_local! {
    /// 当前请求的 request_id，由 request_tracking_middleware 设置
    pub static REQUEST_ID: String;
}

/// 当前请求的 request_id；不在请求上下文中时生成一个新的
pub fn current_request_id() -> String {
    REQUEST_ID
        .try_with(|id| id.clone())
        .unwrap_or_else(|_| Uuid::new_v4().to_string())
}

const TRACE_ID_HEADER: &str = "x-trace-id";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// 应用状态
///
/// 所有依赖在启动时构造一次并注入，没有全局变量。
/// 服务使用 Arc 包装，Clone 只是指针拷贝。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub credential_store: Arc<dyn CredentialStore>,
    pub jwt_service: Arc<JwtService>,
    pub auth_service: Arc<AuthService>,
    pub event_service: Arc<EventService>,
}

impl AppState {
    /// 根据配置和存储实现组装所有服务
    pub fn new(
        config: AppConfig,
        credential_store: Arc<dyn CredentialStore>,
        event_store: Arc<dyn EventStore>,
    ) -> Result<Self, AppError> {
        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        let hasher = PasswordHasher::from_config(&config.security)?;

        let verifier = Arc::new(PasswordCredentialVerifier::new(
            credential_store.clone(),
            hasher.clone(),
        ));

        let auth_service = Arc::new(AuthService::new(
            credential_store.clone(),
            hasher,
            verifier,
            jwt_service.clone(),
        ));

        let event_service = Arc::new(EventService::new(event_store));

        Ok(Self {
            config,
            credential_store,
            jwt_service,
            auth_service,
            event_service,
        })
    }
}

/// 请求追踪中间件
///
/// 挂在顶层 Router 上，每个请求一个 span，带 trace_id/request_id。
/// 指标标签使用路由模板而不是原始路径，未匹配的请求归为 "unmatched"。
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    async move {
        let start = Instant::now();
        let mut response = REQUEST_ID.scope(request_id.clone(), next.run(req)).await;
        let elapsed = start.elapsed();

        let status = response.status();
        metrics::counter!(
            "http_requests_total",
            "method" => method.to_string(),
            "route" => route.clone(),
            "status" => status_class(status),
        )
        .increment(1);
        metrics::histogram!("http_request_duration_seconds", "route" => route)
            .record(elapsed.as_secs_f64());

        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert(TRACE_ID_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        response
    }
    .instrument(span)
    .await
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
