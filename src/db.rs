//! PostgreSQL 连接池与迁移
//! 连接池在进程启动时创建一次，注入凭据存储和活动存储，关闭时释放

use crate::config::DatabaseConfig;
use secrecy::ExposeSecret;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::{str::FromStr, time::Duration, time::Instant};

/// 连接标识，方便在 pg_stat_activity 中定位
const APPLICATION_NAME: &str = "auth-gateway";

/// 按配置构造连接池参数（不建立连接）
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
}

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let url = config
        .url
        .as_ref()
        .ok_or_else(|| DbError::ConnectionFailed("database.url is not configured".to_string()))?;

    // 解析错误里可能带有完整 URL，不能原样输出
    let connect_options = PgConnectOptions::from_str(url.expose_secret())
        .map_err(|_| DbError::ConnectionFailed("database.url is not a valid URL".to_string()))?
        .application_name(APPLICATION_NAME);

    let pool = pool_options(config)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create database pool");
            DbError::ConnectionFailed(e.to_string())
        })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool created"
    );

    Ok(pool)
}

/// 执行 migrations/ 下的迁移
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationFailed(e.to_string()))?;

    tracing::info!("Migrations applied");
    Ok(())
}

/// 探测数据库，同时记录连接池指标
pub async fn health_check(pool: &PgPool) -> HealthStatus {
    metrics::gauge!("db_pool_connections", "state" => "open").set(pool.size() as f64);
    metrics::gauge!("db_pool_connections", "state" => "idle").set(pool.num_idle() as f64);

    let start = Instant::now();
    let result = sqlx::query("SELECT 1").execute(pool).await;
    metrics::histogram!("db_probe_duration_seconds").record(start.elapsed().as_secs_f64());

    match result {
        Ok(_) => HealthStatus::Healthy,
        Err(e) => {
            tracing::warn!(error = %e, "Database probe failed");
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

/// 关闭连接池，等待借出的连接归还
pub async fn close_pool(pool: &PgPool) {
    pool.close().await;
    tracing::info!("Database pool closed");
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl From<DbError> for crate::error::AppError {
    fn from(e: DbError) -> Self {
        crate::error::AppError::StorageUnavailable(e.to_string())
    }
}

/// 存储探测结果，Unhealthy 中的原因只用于日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            url: url.map(|u| secrecy::Secret::new(u.to_string())),
            max_connections: 4,
            min_connections: 1,
            acquire_timeout_secs: 1,
            idle_timeout_secs: 1,
            max_lifetime_secs: 1,
        }
    }

    #[test]
    fn test_pool_options_follow_config() {
        let options = pool_options(&config(None));

        assert_eq!(options.get_max_connections(), 4);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_create_pool_without_url() {
        let result = create_pool(&config(None)).await;
        assert!(matches!(result, Err(DbError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_echoed() {
        let result = create_pool(&config(Some("not a url with p4ssw0rd"))).await;

        match result {
            Err(DbError::ConnectionFailed(msg)) => assert!(!msg.contains("p4ssw0rd")),
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
    }
}
