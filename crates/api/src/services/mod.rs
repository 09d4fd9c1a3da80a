//! Business services sitting between the route handlers and the repositories.

pub mod auth;
pub mod listing;

pub use auth::{AuthError, AuthService};
