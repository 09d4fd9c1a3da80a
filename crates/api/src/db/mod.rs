//! Database operations for the Storemark `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts (admin, user, store_owner)
//! - `stores` - Rated businesses, optionally owned by a user
//! - `ratings` - One per (user, store) pair, enforced by a unique index
//! - `api_sessions` - Opaque bearer tokens
//!
//! All queries use the runtime sqlx API (`query_as` / `QueryBuilder`) with
//! `FromRow` row structs. Dynamic fragments (filters, sort) bind every user
//! value as a parameter; sort columns come only from a compiled whitelist.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p storemark-cli -- migrate
//! ```

pub mod ratings;
pub mod sessions;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use ratings::RatingRepository;
pub use sessions::SessionRepository;
pub use stores::{StoreFilter, StoreRepository};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, duplicate rating).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, converting unique violations into [`Self::Conflict`].
    pub(crate) fn from_unique(e: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct UniqueViolation;

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let e = sqlx::Error::Database(Box::new(UniqueViolation));
        let mapped = RepositoryError::from_unique(e, "you have already rated this store");
        assert!(matches!(
            mapped,
            RepositoryError::Conflict(ref msg) if msg == "you have already rated this store"
        ));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let mapped = RepositoryError::from_unique(sqlx::Error::RowNotFound, "unused");
        assert!(matches!(mapped, RepositoryError::Database(_)));
    }
}
