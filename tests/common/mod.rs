//! 测试公共模块
//! 提供测试辅助函数和测试工具
#![allow(dead_code)]

use async_trait::async_trait;
use auth_gateway::{
    auth::PasswordHasher,
    config::{
        AppConfig, BootstrapConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig,
    },
    db::HealthStatus,
    error::AppError,
    middleware::AppState,
    models::user::{NewUser, User},
    repository::{CredentialStore, MemoryCredentialStore, MemoryEventStore},
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_USERNAME: &str = "admin@example12.com";
pub const ADMIN_PASSWORD: &str = "securepassword";

/// 创建测试配置（低成本哈希参数，内存存储）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new("test-secret-key-for-testing-only-min-32-chars".to_string()),
            token_lifetime_secs: 3600,
            hash_memory_kib: 64,
            hash_iterations: 1,
            hash_parallelism: 1,
            verify_subject_exists: true,
        },
        bootstrap: BootstrapConfig {
            username: ADMIN_USERNAME.to_string(),
            password: Some(Secret::new(ADMIN_PASSWORD.to_string())),
        },
    }
}

/// 测试上下文：状态 + 直接访问存储
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryCredentialStore>,
    pub router: Router,
}

/// 创建测试应用（内存存储）
pub fn create_test_app_with_config(config: AppConfig) -> TestApp {
    let store = Arc::new(MemoryCredentialStore::new());
    let credential_store: Arc<dyn CredentialStore> = store.clone();

    let state = Arc::new(
        AppState::new(config, credential_store, Arc::new(MemoryEventStore::new()))
            .expect("Failed to build app state"),
    );
    let router = auth_gateway::routes::create_router(state.clone());

    TestApp {
        state,
        store,
        router,
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_config(create_test_config())
}

/// 存储后端不可用时返回的内部细节，不能出现在响应中
pub const STORAGE_FAILURE_DETAIL: &str = "connection refused (10.0.0.5:5432)";

/// 所有操作都失败的凭据存储
pub struct UnavailableCredentialStore;

#[async_trait]
impl CredentialStore for UnavailableCredentialStore {
    async fn find_by_username(&self, _username: &str) -> Result<Option<User>, AppError> {
        Err(AppError::StorageUnavailable(STORAGE_FAILURE_DETAIL.to_string()))
    }

    async fn find_by_id(&self, _id: &Uuid) -> Result<Option<User>, AppError> {
        Err(AppError::StorageUnavailable(STORAGE_FAILURE_DETAIL.to_string()))
    }

    async fn create(&self, _new_user: NewUser) -> Result<User, AppError> {
        Err(AppError::StorageUnavailable(STORAGE_FAILURE_DETAIL.to_string()))
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Unhealthy(STORAGE_FAILURE_DETAIL.to_string())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// 使用指定凭据存储构建路由
pub fn create_router_with_store(store: Arc<dyn CredentialStore>) -> Router {
    let state = Arc::new(
        AppState::new(create_test_config(), store, Arc::new(MemoryEventStore::new()))
            .expect("Failed to build app state"),
    );
    auth_gateway::routes::create_router(state)
}

/// 直接写入存储创建测试用户
pub async fn create_test_user(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
    is_admin: bool,
) -> User {
    let hasher = PasswordHasher::with_params(64, 1, 1).expect("valid params");

    store
        .create(NewUser {
            username: username.to_string(),
            password_hash: hasher.hash(password).expect("Failed to hash password"),
            is_admin,
        })
        .await
        .expect("Failed to create test user")
}

/// 发送请求并解析 JSON 响应
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send_request(app, request).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// 登录并返回令牌
pub async fn login_token(app: &Router, username: &str, password: &str) -> String {
    let (status, json) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed: {json}");
    json["token"].as_str().expect("token in login response").to_string()
}
