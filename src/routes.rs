//! 路由注册
//! 创建所有 API 路由并按访问级别应用中间件

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::Access,
    handlers,
    middleware::{request_tracking_middleware, AppState},
};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查、注册、登录）
    let public_routes = Access::Public.apply(
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/ready", get(handlers::health::readiness_check))
            .route("/auth/register", post(handlers::auth::register))
            .route("/auth/login", post(handlers::auth::login)),
        state.clone(),
    );

    // 任意有效令牌
    let authenticated_routes = Access::Authenticated.apply(
        Router::new()
            .route("/auth/me", get(handlers::auth::get_current_user))
            .route("/events", get(handlers::event::list_events)),
        state.clone(),
    );

    // 管理员
    let admin_routes = Access::Admin.apply(
        Router::new()
            .route("/auth/admin/dashboard", get(handlers::auth::admin_dashboard))
            .route("/events", post(handlers::event::create_event)),
        state.clone(),
    );

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(request_tracking_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
