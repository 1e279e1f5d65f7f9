use super::error::ServiceError;
use anyhow::Context;
use async_trait::async_trait;
use axum::http::StatusCode;
use sqlx::{PgPool, Row};
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "A user with this email already exists";

#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub email_address: String,
    pub password_hash: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email_address", &self.email_address)
            .field("password_hash", &"***")
            .finish()
    }
}

/// User persistence used by the authenticator.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create a user and return its id.
    ///
    /// The address is stored as given. A duplicate address, compared
    /// case-insensitively, is a `400` [`ServiceError::Status`].
    async fn create_user(
        &self,
        email_address: &str,
        password_hash: &str,
    ) -> Result<Uuid, ServiceError>;

    async fn find_by_email_address(
        &self,
        email_address: &str,
    ) -> Result<Option<User>, ServiceError>;
}

#[derive(Clone, Debug)]
pub struct PgUserService {
    pool: PgPool,
}

impl PgUserService {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserService for PgUserService {
    async fn create_user(
        &self,
        email_address: &str,
        password_hash: &str,
    ) -> Result<Uuid, ServiceError> {
        let query = r"
            INSERT INTO users (email_address, password_hash)
            VALUES ($1, $2)
            ON CONFLICT ((lower(email_address))) DO NOTHING
            RETURNING id
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(email_address)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("Failed to insert user")?;

        match row {
            Some(row) => Ok(row.try_get("id").context("Failed to read user id")?),
            None => Err(ServiceError::status(
                StatusCode::BAD_REQUEST,
                DUPLICATE_EMAIL_MESSAGE,
            )),
        }
    }

    async fn find_by_email_address(
        &self,
        email_address: &str,
    ) -> Result<Option<User>, ServiceError> {
        let query = r"
            SELECT id, email_address, password_hash
            FROM users
            WHERE lower(email_address) = lower($1)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(email_address)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("Failed to look up user")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(User {
            id: row.try_get("id").context("Failed to read user id")?,
            email_address: row
                .try_get("email_address")
                .context("Failed to read user email")?,
            password_hash: row
                .try_get("password_hash")
                .context("Failed to read password hash")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password_hash() {
        let user = User {
            id: Uuid::nil(),
            email_address: "ada@example.com".to_string(),
            password_hash: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
        };
        let rendered = format!("{user:?}");
        assert!(rendered.contains("ada@example.com"));
        assert!(!rendered.contains("$2b$10$"));
    }
}
