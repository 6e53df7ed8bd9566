//! 认证服务：注册、登录、管理员账户初始化

use crate::{
    auth::{
        jwt::JwtService,
        password::PasswordHasher,
        verifier::{CredentialVerifier, Credentials},
    },
    config::BootstrapConfig,
    error::AppError,
    models::{auth::*, user::*},
    repository::user_repo::CredentialStore,
    telemetry::{LOGIN_ATTEMPTS, REGISTRATIONS},
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use validator::Validate;

/// 管理员初始化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    AlreadyPresent,
    /// 未配置初始密码
    Skipped,
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    verifier: Arc<dyn CredentialVerifier>,
    jwt_service: Arc<JwtService>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        verifier: Arc<dyn CredentialVerifier>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            store,
            hasher,
            verifier,
            jwt_service,
        }
    }

    /// 用户注册（不自动登录）
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AppError> {
        if let Err(e) = req.validate() {
            metrics::counter!(REGISTRATIONS, "outcome" => "invalid").increment(1);
            return Err(e.into());
        }

        let password_hash = self.hasher.hash_offloaded(req.password).await?;

        let user = match self
            .store
            .create(NewUser {
                username: req.username,
                password_hash,
                is_admin: req.is_admin,
            })
            .await
        {
            Ok(user) => user,
            Err(AppError::DuplicateUsername) => {
                metrics::counter!(REGISTRATIONS, "outcome" => "duplicate").increment(1);
                tracing::info!("Registration rejected: username taken");
                return Err(AppError::DuplicateUsername);
            }
            Err(e) => return Err(e),
        };

        metrics::counter!(REGISTRATIONS, "outcome" => "created").increment(1);
        tracing::info!(user_id = %user.id, is_admin = user.is_admin, "User registered");

        Ok(user)
    }

    /// 用户登录
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let user = match self
            .verifier
            .verify(&Credentials::Password {
                username: req.username,
                password: req.password,
            })
            .await
        {
            Ok(user) => user,
            Err(e) => {
                if matches!(e, AppError::InvalidCredentials) {
                    metrics::counter!(LOGIN_ATTEMPTS, "outcome" => "rejected").increment(1);
                }
                return Err(e);
            }
        };

        let issued = self.jwt_service.issue(&user)?;

        metrics::counter!(LOGIN_ATTEMPTS, "outcome" => "success").increment(1);
        tracing::info!(user_id = %user.id, "Login succeeded");

        Ok(LoginResponse {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in,
            user: UserResponse::from(user),
        })
    }

    /// 启动时创建管理员账户，可重复执行
    pub async fn bootstrap_privileged_account(
        &self,
        config: &BootstrapConfig,
    ) -> Result<BootstrapOutcome, AppError> {
        if self.store.find_by_username(&config.username).await?.is_some() {
            tracing::debug!(username = %config.username, "Admin account already present");
            return Ok(BootstrapOutcome::AlreadyPresent);
        }

        let Some(password) = &config.password else {
            tracing::warn!(
                username = %config.username,
                "No bootstrap password configured, admin account not created"
            );
            return Ok(BootstrapOutcome::Skipped);
        };

        let password_hash = self
            .hasher
            .hash_offloaded(password.expose_secret().clone())
            .await?;

        let result = self
            .store
            .create(NewUser {
                username: config.username.clone(),
                password_hash,
                is_admin: true,
            })
            .await;

        match result {
            Ok(user) => {
                tracing::info!(user_id = %user.id, username = %user.username, "Admin user created");
                Ok(BootstrapOutcome::Created)
            }
            // 另一个实例同时创建了该账户
            Err(AppError::DuplicateUsername) => Ok(BootstrapOutcome::AlreadyPresent),
            Err(e) => Err(e),
        }
    }
}
