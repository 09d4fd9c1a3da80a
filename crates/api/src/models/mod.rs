//! Domain models for the API.

pub mod rating;
pub mod store;
pub mod user;

pub use rating::{Rating, RatingAuthor, RatingStoreInfo, RatingWithContext};
pub use store::{Store, StoreOwner};
pub use user::{CurrentUser, User};
