//! Rating models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storemark_core::{Email, RatingId, RatingValue, StoreId, UserId};

/// A rating row as persisted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub rating: RatingValue,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store summary attached to rating payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStoreInfo {
    pub id: StoreId,
    pub name: String,
    pub address: String,
}

/// A rating with the author and store attached, used by detail endpoints
/// and the admin ratings listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingWithContext {
    pub id: RatingId,
    pub rating: RatingValue,
    pub review_text: Option<String>,
    pub user: RatingAuthor,
    pub store: RatingStoreInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author summary attached to rating payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingAuthor {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}
