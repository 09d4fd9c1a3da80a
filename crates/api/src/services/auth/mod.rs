//! Authentication service.
//!
//! Passwords are hashed with Argon2id and never leave this module in the
//! clear. Logins mint opaque bearer tokens persisted in `api_sessions`;
//! the token value carries no claims, the table row is the session.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;

use storemark_core::{Email, Role, UserId};

use crate::db::users::NewUser;
use crate::db::{RepositoryError, SessionRepository, UserRepository};
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
const MAX_PASSWORD_LENGTH: usize = 16;

/// Maximum account name length.
const MAX_NAME_LENGTH: usize = 60;

/// Maximum address length, matching the column width.
const MAX_ADDRESS_LENGTH: usize = 400;

/// How long an issued session token stays valid.
const SESSION_TTL_DAYS: i64 = 7;

/// Random bytes per session token (encodes to 43 base64 characters).
const TOKEN_BYTES: usize = 32;

/// A freshly authenticated session: the user plus their bearer token.
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
///
/// Handles registration, login, logout, and password changes.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    sessions: SessionRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            sessions: SessionRepository::new(pool),
        }
    }

    /// Register a new account and log it in.
    ///
    /// Self-registration always produces a regular user; privileged roles
    /// are assigned through the admin user endpoints.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword`, or
    /// `AuthError::InvalidProfile` if validation fails, and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        address: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let user = self
            .create_user(name, email, password, address, Role::User)
            .await?;
        self.issue_session(user).await
    }

    /// Create an account with an explicit role, without logging it in.
    ///
    /// Backs the admin "create user" endpoint; validation matches
    /// [`Self::register`].
    ///
    /// # Errors
    ///
    /// Same validation and conflict errors as [`Self::register`].
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        address: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_name(name)?;
        validate_address(address)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(NewUser {
                name,
                email: &email,
                password_hash: &password_hash,
                address,
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or
    /// the password is wrong; the two cases are indistinguishable to the
    /// caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        self.issue_session(user).await
    }

    /// Revoke a bearer token.
    ///
    /// Returns `true` if a session was actually revoked. Revoking an
    /// unknown or already-expired token is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.delete(token).await?)
    }

    /// Change a user's password after verifying their current one.
    ///
    /// Existing sessions stay valid; only the credential changes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WrongCurrentPassword` if the current password
    /// doesn't verify, `AuthError::WeakPassword` if the new one fails
    /// validation.
    pub async fn change_password(
        &self,
        user: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let current_hash = self.users.get_password_hash(user).await?;
        verify_password(current_password, &current_hash)
            .map_err(|_| AuthError::WrongCurrentPassword)?;

        let new_hash = hash_password(new_password)?;
        self.users.update_password(user, &new_hash).await?;
        Ok(())
    }

    /// Mint and persist a session token for an already-authenticated user.
    async fn issue_session(&self, user: User) -> Result<AuthenticatedUser, AuthError> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
        self.sessions.create(user.id, &token, expires_at).await?;
        Ok(AuthenticatedUser {
            user,
            token,
            expires_at,
        })
    }
}

/// Generate an opaque, URL-safe session token.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate password strength: 8-16 characters with at least one uppercase
/// letter and one non-alphanumeric character.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(AuthError::WeakPassword(format!(
            "password must be {MIN_PASSWORD_LENGTH}-{MAX_PASSWORD_LENGTH} characters"
        )));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(AuthError::WeakPassword(
            "password must contain at least one uppercase letter".to_owned(),
        ));
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(AuthError::WeakPassword(
            "password must contain at least one special character".to_owned(),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidProfile("name cannot be empty".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidProfile(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_address(address: &str) -> Result<(), AuthError> {
    if address.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(AuthError::InvalidProfile(format!(
            "address must be at most {MAX_ADDRESS_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_bounds() {
        assert!(matches!(
            validate_password("Ab!4567"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("Ab!45678").is_ok());
        assert!(validate_password("Ab!4567890123456").is_ok());
        assert!(matches!(
            validate_password("Ab!45678901234567"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_password_requires_uppercase() {
        assert!(matches!(
            validate_password("lowercase!1"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("Lowercase!1").is_ok());
    }

    #[test]
    fn test_password_requires_special_character() {
        assert!(matches!(
            validate_password("NoSpecial1"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("WithSpace 1").is_ok());
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("Ada Lovelace").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(61)).is_err());
    }

    #[test]
    fn test_address_validation() {
        assert!(validate_address("1 Main Street").is_ok());
        assert!(validate_address(&"x".repeat(401)).is_err());
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("Sup3rSecret!").unwrap();
        assert!(verify_password("Sup3rSecret!", &hash).is_ok());
        assert!(matches!(
            verify_password("WrongPass1!", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_tokens_are_opaque_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
