//! CLI command implementations.

use secrecy::SecretString;

pub mod migrate;
pub mod seed;

/// Resolve the database URL from `API_DATABASE_URL`, falling back to
/// `DATABASE_URL`. The URL carries credentials, so it stays wrapped.
pub(crate) fn database_url() -> Option<SecretString> {
    std::env::var("API_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
