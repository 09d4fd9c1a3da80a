//! Authentication extractors.
//!
//! Every protected route takes one of these extractors. The bearer token
//! from the `Authorization` header is resolved against `api_sessions` on
//! each request; an unknown or expired token is indistinguishable from a
//! missing one.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::db::SessionRepository;
use crate::error::set_sentry_user;
use crate::models::user::CurrentUser;
use crate::state::AppState;

/// Extractor that requires an authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that additionally requires the admin role.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that requires the store owner role (admins also pass).
pub struct RequireStoreOwner(pub CurrentUser);

/// Rejection for the auth extractors.
pub enum AuthRejection {
    /// Missing, malformed, unknown, or expired token.
    Unauthorized,
    /// Valid token, insufficient role.
    Forbidden,
    /// Session lookup failed.
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to access this resource",
            ),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        let body = Json(json!({
            "success": false,
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// Resolve the bearer token in `parts` to the current user.
async fn resolve_user(parts: &Parts, state: &AppState) -> Result<CurrentUser, AuthRejection> {
    let token = bearer_token(&parts.headers).ok_or(AuthRejection::Unauthorized)?;

    let sessions = SessionRepository::new(state.pool());
    let user = sessions
        .find_user(token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "session lookup failed");
            AuthRejection::Internal
        })?
        .ok_or(AuthRejection::Unauthorized)?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(user)
}

/// Pull the token out of the `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireStoreOwner {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        if !user.role.is_store_owner() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn headers_with(value: Option<&str>) -> HeaderMap {
        let mut builder = Request::builder().uri("/api/stores");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        match builder.body(()) {
            Ok(request) => request.into_parts().0.headers,
            Err(_) => unreachable!("static request construction cannot fail"),
        }
    }

    #[test]
    fn test_bearer_token_extraction() {
        let headers = headers_with(Some("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = headers_with(None);
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let headers = headers_with(Some("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_empty_value() {
        let headers = headers_with(Some("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
