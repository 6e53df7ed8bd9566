//! 活动相关的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext, error::AppError, handlers::JsonOrForm, middleware::AppState,
    models::event::CreateEventRequest,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

/// 创建活动（仅管理员）
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    JsonOrForm(req): JsonOrForm<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_service.create_event(&auth_context, req).await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// 活动列表
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let events = state.event_service.list_events().await?;

    Ok(Json(events))
}
