//! Bearer-token session repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storemark_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::user::CurrentUser;

/// Repository for API session tokens.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a freshly issued token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO api_sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user.as_i32())
            .bind(expires_at)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Resolve a bearer token to its user, ignoring expired sessions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_user(&self, token: &str) -> Result<Option<CurrentUser>, RepositoryError> {
        let row: Option<(i32, String, Email, Role)> = sqlx::query_as(
            "SELECT u.id, u.name, u.email, u.role \
             FROM api_sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, name, email, role)| CurrentUser {
            id: UserId::new(id),
            name,
            email,
            role,
        }))
    }

    /// Revoke a token (logout).
    ///
    /// Returns `true` if a session was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM api_sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
