//! 服务层测试：注册、登录、管理员初始化、令牌生命周期

use auth_gateway::{
    auth::TokenError,
    error::AppError,
    models::auth::{LoginRequest, RegisterRequest},
    repository::CredentialStore,
    services::BootstrapOutcome,
};
use chrono::{Duration, Utc};

mod common;
use common::create_test_app;

fn register_request(username: &str, password: &str, is_admin: bool) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        password: password.to_string(),
        is_admin,
    }
}

fn login_request(username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_register_and_login_round() {
    let app = create_test_app();
    let auth = &app.state.auth_service;

    let cases = [
        ("peterpan@example.com", "passwordsecure", false),
        ("kite@gmail.com", "896LdB78", true),
        ("unicode-用户", "pässwörd with spaces", false),
    ];

    for (username, password, is_admin) in cases {
        let user = auth
            .register(register_request(username, password, is_admin))
            .await
            .unwrap();
        assert_eq!(user.username, username);
        assert_ne!(user.password_hash, password);
        assert!(!user.password_hash.is_empty());

        let response = auth.login(login_request(username, password)).await.unwrap();
        let claims = app.state.jwt_service.verify(&response.token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.is_admin, is_admin);
    }
}

#[tokio::test]
async fn test_register_duplicate() {
    let app = create_test_app();
    let auth = &app.state.auth_service;

    auth.register(register_request("jimmy@gmail.com", "456LmNPqR!", false))
        .await
        .unwrap();
    let second = auth
        .register(register_request("jimmy@gmail.com", "other", true))
        .await;

    assert!(matches!(second, Err(AppError::DuplicateUsername)));

    let stored = app.store.find_by_username("jimmy@gmail.com").await.unwrap().unwrap();
    assert!(!stored.is_admin);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_persists_one_record() {
    let app = create_test_app();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let auth = app.state.auth_service.clone();
            tokio::spawn(async move {
                auth.register(register_request("race@example.com", &format!("pw-{i}"), false))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::DuplicateUsername) => duplicates += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_register_rejects_blank_input() {
    let app = create_test_app();
    let auth = &app.state.auth_service;

    let blank_user = auth.register(register_request("  ", "passwordsecure", false)).await;
    let blank_password = auth.register(register_request("a@b.c", "", false)).await;

    assert!(matches!(blank_user, Err(AppError::InvalidInput(_))));
    assert!(matches!(blank_password, Err(AppError::InvalidInput(_))));
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_login_errors_are_uniform() {
    let app = create_test_app();
    let auth = &app.state.auth_service;

    auth.register(register_request("newuser92@example.com", "password899", false))
        .await
        .unwrap();

    let unknown = auth.login(login_request("ghost@example.com", "password899")).await;
    let wrong = auth.login(login_request("newuser92@example.com", "password898")).await;

    assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_bootstrap_is_idempotent() {
    let app = create_test_app();
    let config = app.state.config.bootstrap.clone();
    let auth = &app.state.auth_service;

    let first = auth.bootstrap_privileged_account(&config).await.unwrap();
    let second = auth.bootstrap_privileged_account(&config).await.unwrap();

    assert_eq!(first, BootstrapOutcome::Created);
    assert_eq!(second, BootstrapOutcome::AlreadyPresent);
    assert_eq!(app.store.len(), 1);

    let admin = app
        .store
        .find_by_username(common::ADMIN_USERNAME)
        .await
        .unwrap()
        .unwrap();
    assert!(admin.is_admin);
}

#[tokio::test]
async fn test_bootstrap_leaves_existing_account_alone() {
    let app = create_test_app();
    let config = app.state.config.bootstrap.clone();

    // 已存在同名的普通用户：不覆盖，也不报错
    common::create_test_user(app.store.as_ref(), common::ADMIN_USERNAME, "whatever", false).await;

    let outcome = app
        .state
        .auth_service
        .bootstrap_privileged_account(&config)
        .await
        .unwrap();

    assert_eq!(outcome, BootstrapOutcome::AlreadyPresent);
    let existing = app
        .store
        .find_by_username(common::ADMIN_USERNAME)
        .await
        .unwrap()
        .unwrap();
    assert!(!existing.is_admin);
}

#[tokio::test]
async fn test_bootstrap_skipped_without_password() {
    let app = create_test_app();
    let mut config = app.state.config.bootstrap.clone();
    config.password = None;

    let outcome = app
        .state
        .auth_service
        .bootstrap_privileged_account(&config)
        .await
        .unwrap();

    assert_eq!(outcome, BootstrapOutcome::Skipped);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_token_expires_after_lifetime() {
    let app = create_test_app();
    let auth = &app.state.auth_service;
    let jwt = &app.state.jwt_service;

    auth.register(register_request("kite@gmail.com", "896LdB78", true))
        .await
        .unwrap();
    let response = auth.login(login_request("kite@gmail.com", "896LdB78")).await.unwrap();

    let lifetime = Duration::seconds(jwt.token_lifetime_secs() as i64);
    let now = Utc::now();

    assert!(jwt.verify_at(&response.token, now).is_ok());
    assert_eq!(
        jwt.verify_at(&response.token, now + lifetime + Duration::seconds(1)),
        Err(TokenError::Expired)
    );
}
