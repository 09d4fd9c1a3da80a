//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (pings the database)
//!
//! # Auth
//! POST /api/auth/register          - Register a new account (logs it in)
//! POST /api/auth/login             - Login, returns a bearer token
//! POST /api/auth/logout            - Revoke the presented token
//! PUT  /api/auth/change-password   - Change own password
//!
//! # Users (admin unless noted)
//! GET  /api/users                  - List users (search, role filter, sort)
//! GET  /api/users/dashboard/stats  - Dashboard statistics
//! GET  /api/users/{id}             - Get a user
//! POST /api/users                  - Create a user with any role
//! PUT  /api/users/{id}             - Update a user
//! DELETE /api/users/{id}           - Delete a user
//!
//! # Stores
//! GET  /api/stores                 - Public listing with rating aggregates
//! GET  /api/stores/my-stores       - Stores owned by the caller (store owner)
//! GET  /api/stores/{id}            - Store detail (newest 100 ratings inline)
//! GET  /api/stores/{id}/ratings    - Paginated ratings for a store
//! POST /api/stores                 - Create a store (admin)
//! PUT  /api/stores/{id}            - Update a store (admin)
//! DELETE /api/stores/{id}          - Delete a store (admin)
//!
//! # Ratings
//! GET  /api/ratings                - List all ratings with filters (admin)
//! GET  /api/ratings/my-ratings     - Ratings submitted by the caller
//! GET  /api/ratings/{id}           - Get a rating with user and store
//! POST /api/ratings                - Rate a store (one rating per pair)
//! PUT  /api/ratings/{id}           - Update own rating (admin: any)
//! DELETE /api/ratings/{id}         - Delete own rating (admin: any)
//! ```
//!
//! Every response body uses the same envelope: `{"success": true, "data":
//! ...}` on success, `{"success": false, "message": ...}` on failure.

pub mod auth;
pub mod health;
pub mod ratings;
pub mod stores;
pub mod users;

use axum::{
    Json,
    Router,
    routing::{get, post, put},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::state::AppState;

/// Wrap a payload in the success envelope.
pub(crate) fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": data,
    }))
}

/// Success envelope carrying only a message (logout, deletes).
pub(crate) fn success_message(message: &str) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
    }))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/change-password", put(auth::change_password))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list).post(users::create))
        .route("/dashboard/stats", get(users::dashboard_stats))
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::list).post(stores::create))
        .route("/my-stores", get(stores::my_stores))
        .route(
            "/{id}",
            get(stores::show).put(stores::update).delete(stores::destroy),
        )
        .route("/{id}/ratings", get(stores::ratings))
}

/// Create the rating routes router.
pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(ratings::list).post(ratings::create))
        .route("/my-ratings", get(ratings::my_ratings))
        .route(
            "/{id}",
            get(ratings::show)
                .put(ratings::update)
                .delete(ratings::destroy),
        )
}

/// Assemble the full application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api/auth", auth_routes())
        .nest("/api/users", user_routes())
        .nest("/api/stores", store_routes())
        .nest("/api/ratings", rating_routes())
}
