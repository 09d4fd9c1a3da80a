//! Core types for Storemark.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod category;
pub mod email;
pub mod id;
pub mod rating;
pub mod role;

pub use category::{CategoryError, StoreCategory};
pub use email::{Email, EmailError};
pub use id::*;
pub use rating::{RatingValue, RatingValueError};
pub use role::{Role, RoleError};
