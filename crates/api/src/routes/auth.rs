//! Authentication route handlers.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::middleware::auth::bearer_token;
use crate::models::user::CurrentUser;
use crate::services::AuthService;
use crate::services::auth::AuthenticatedUser;
use crate::state::AppState;

use super::{success, success_message};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn session_payload(session: &AuthenticatedUser) -> Value {
    json!({
        "user": CurrentUser::from(&session.user),
        "token": session.token,
        "expiresAt": session.expires_at,
    })
}

/// `POST /api/auth/register`
///
/// Creates a regular user account and logs it in.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool());
    let session = auth
        .register(&body.name, &body.email, &body.password, &body.address)
        .await?;

    tracing::info!(user_id = %session.user.id, "user registered");
    Ok((StatusCode::CREATED, success(session_payload(&session))))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool());
    let session = auth.login(&body.email, &body.password).await?;

    tracing::info!(user_id = %session.user.id, "user logged in");
    Ok(success(session_payload(&session)))
}

/// `POST /api/auth/logout`
///
/// Revokes the presented bearer token. The `RequireAuth` extractor has
/// already validated it, so the header is present here.
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;

    let auth = AuthService::new(state.pool());
    auth.logout(token).await?;

    tracing::info!(user_id = %user.id, "user logged out");
    Ok(success_message("Logged out"))
}

/// `PUT /api/auth/change-password`
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool());
    auth.change_password(user.id, &body.current_password, &body.new_password)
        .await?;

    tracing::info!(user_id = %user.id, "password changed");
    Ok(success_message("Password updated"))
}
