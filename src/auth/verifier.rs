//! Credential verification strategies
//!
//! Login goes through [`CredentialVerifier`] so another strategy can be added
//! next to the password one without touching the callers.

use crate::{
    auth::password::PasswordHasher, error::AppError, models::user::User,
    repository::user_repo::CredentialStore,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Credentials presented at login
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { username: String, password: String },
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Resolve credentials to a user.
    ///
    /// Every rejection is [`AppError::InvalidCredentials`]; callers cannot tell
    /// an unknown user from a wrong secret.
    async fn verify(&self, credentials: &Credentials) -> Result<User, AppError>;
}

/// Username + password against the credential store
pub struct PasswordCredentialVerifier {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
}

impl PasswordCredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }
}

#[async_trait]
impl CredentialVerifier for PasswordCredentialVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<User, AppError> {
        let Credentials::Password { username, password } = credentials;

        if username.is_empty() || password.is_empty() {
            return Err(AppError::InvalidCredentials);
        }

        let Some(user) = self.store.find_by_username(username).await? else {
            self.hasher.dummy_verify_offloaded(password.clone()).await;
            tracing::debug!("Login rejected: unknown user");
            return Err(AppError::InvalidCredentials);
        };

        if !self
            .hasher
            .verify_offloaded(password.clone(), user.password_hash.clone())
            .await
        {
            tracing::debug!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }
}
