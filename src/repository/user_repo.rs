//! User repository (凭据存储)
//! PostgreSQL 实现用于生产，内存实现用于测试与本地开发

use crate::{db::HealthStatus, error::AppError, models::user::*};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use sqlx::PgPool;
use uuid::Uuid;

/// Persistence for user credentials.
///
/// `create` must enforce username uniqueness atomically: of two concurrent
/// calls with the same username exactly one succeeds and the other gets
/// [`AppError::DuplicateUsername`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError>;

    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn health_check(&self) -> HealthStatus;

    /// 存储后端名称，用于就绪探针
    fn backend(&self) -> &'static str;
}

pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    /// 根据用户名查找用户
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_admin, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_admin, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// 创建用户，唯一约束冲突映射为 DuplicateUsername
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, is_admin, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(new_user.is_admin)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn health_check(&self) -> HealthStatus {
        crate::db::health_check(&self.db).await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// In-process store keyed by username
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, User>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().id == *id)
            .map(|entry| entry.value().clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        // entry() holds the shard lock, so check and insert are one step
        match self.users.entry(new_user.username.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateUsername),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::new_v4(),
                    username: new_user.username,
                    password_hash: new_user.password_hash,
                    is_admin: new_user.is_admin,
                    created_at: Utc::now(),
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(username: &str, is_admin: bool) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            is_admin,
        }
    }

    #[tokio::test]
    async fn test_memory_store_create_and_find() {
        let store = MemoryCredentialStore::new();

        let created = store.create(new_user("kite@gmail.com", true)).await.unwrap();
        assert!(created.is_admin);

        let by_name = store.find_by_username("kite@gmail.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        let by_id = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "kite@gmail.com");

        assert!(store.find_by_username("nobody").await.unwrap().is_none());
        assert!(store.find_by_id(&Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicate() {
        let store = MemoryCredentialStore::new();

        store.create(new_user("jimmy@gmail.com", false)).await.unwrap();
        let second = store.create(new_user("jimmy@gmail.com", true)).await;

        assert!(matches!(second, Err(AppError::DuplicateUsername)));
        assert_eq!(store.len(), 1);

        // 先写入的角色保持不变
        let stored = store.find_by_username("jimmy@gmail.com").await.unwrap().unwrap();
        assert!(!stored.is_admin);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_memory_store_concurrent_create() {
        let store = Arc::new(MemoryCredentialStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_user("race@example.com", false)).await })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(AppError::DuplicateUsername) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(store.len(), 1);
    }
}
