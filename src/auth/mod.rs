//! Registration and sign-in.
//!
//! The [`Authenticator`] is deliberately thin: it hashes passwords, delegates
//! persistence to a [`UserService`] and passes the service's errors through
//! unchanged so the HTTP layer can tell client errors from internal ones.

pub mod error;
pub mod hasher;
pub mod users;

pub use self::error::{GENERIC_ERROR_MESSAGE, ServiceError};
pub use self::hasher::{BCRYPT_WORK_FACTOR, BcryptHasher, PasswordHasher};
pub use self::users::{PgUserService, User, UserService};

use anyhow::Context;
use axum::http::StatusCode;
use regex::Regex;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, instrument};
use uuid::Uuid;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Lightweight email sanity check applied before any hashing work.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserService>,
    hasher: Arc<dyn PasswordHasher>,
}

impl Authenticator {
    #[must_use]
    pub fn new(users: Arc<dyn UserService>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    /// Hash `password` and create the user.
    ///
    /// # Errors
    /// Returns the user service's error as-is, or `Unknown` if hashing fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email_address: &str,
        password: &str,
    ) -> Result<Uuid, ServiceError> {
        let password_hash = self.hash_password(password).await?;

        let id = self.users.create_user(email_address, &password_hash).await?;
        debug!(%id, "user registered");

        Ok(id)
    }

    /// Look the user up by email address and check the password.
    ///
    /// The lookup always happens exactly once; a missing password fails the
    /// credential check after it.
    ///
    /// # Errors
    /// Returns a `401` status error for an unknown address, a missing or a
    /// wrong password, otherwise the user service's error as-is.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email_address: &str,
        password: Option<&str>,
    ) -> Result<User, ServiceError> {
        let Some(user) = self.users.find_by_email_address(email_address).await? else {
            debug!("no user with this email address");
            return Err(invalid_credentials());
        };

        let Some(password) = password else {
            debug!(id = %user.id, "no password submitted");
            return Err(invalid_credentials());
        };

        if !self.verify_password(password, &user.password_hash).await? {
            debug!(id = %user.id, "password mismatch");
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    async fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();

        let hash = task::spawn_blocking(move || hasher.hash(&password, BCRYPT_WORK_FACTOR))
            .await
            .context("password hashing task failed")??;

        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ServiceError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        let verified = task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .context("password verification task failed")??;

        Ok(verified)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

fn invalid_credentials() -> ServiceError {
    ServiceError::status(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_MESSAGE)
}
