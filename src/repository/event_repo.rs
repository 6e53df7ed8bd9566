//! Event repository

use crate::{error::AppError, models::event::*};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, req: &CreateEventRequest, created_by: Uuid) -> Result<Event, AppError>;

    /// 按创建时间倒序
    async fn list(&self) -> Result<Vec<Event>, AppError>;
}

pub struct PgEventStore {
    db: PgPool,
}

impl PgEventStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create(&self, req: &CreateEventRequest, created_by: Uuid) -> Result<Event, AppError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (id, event_name, event_date, event_time, event_location, event_description, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&req.event_name)
        .bind(req.event_date)
        .bind(&req.event_time)
        .bind(&req.event_location)
        .bind(&req.event_description)
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        Ok(event)
    }

    async fn list(&self) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY created_at DESC")
            .fetch_all(&self.db)
            .await?;

        Ok(events)
    }
}

#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create(&self, req: &CreateEventRequest, created_by: Uuid) -> Result<Event, AppError> {
        let event = Event {
            id: Uuid::new_v4(),
            event_name: req.event_name.clone(),
            event_date: req.event_date,
            event_time: req.event_time.clone(),
            event_location: req.event_location.clone(),
            event_description: req.event_description.clone(),
            created_by,
            created_at: Utc::now(),
        };

        self.events
            .write()
            .map_err(|_| AppError::internal_error("event store lock poisoned"))?
            .push(event.clone());

        Ok(event)
    }

    async fn list(&self) -> Result<Vec<Event>, AppError> {
        let events = self
            .events
            .read()
            .map_err(|_| AppError::internal_error("event store lock poisoned"))?;

        Ok(events.iter().rev().cloned().collect())
    }
}
