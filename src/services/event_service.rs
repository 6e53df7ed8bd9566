//! 活动服务：仅管理员可以创建

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    models::event::*,
    repository::event_repo::EventStore,
};
use std::sync::Arc;
use validator::Validate;

pub struct EventService {
    store: Arc<dyn EventStore>,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// 创建活动，调用方已经过管理员校验
    pub async fn create_event(
        &self,
        actor: &AuthContext,
        req: CreateEventRequest,
    ) -> Result<Event, AppError> {
        req.validate()?;

        let event = self.store.create(&req, actor.user_id).await?;

        tracing::info!(
            event_id = %event.id,
            created_by = %actor.user_id,
            "Event created"
        );

        Ok(event)
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        self.store.list().await
    }
}
