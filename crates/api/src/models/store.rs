//! Store models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storemark_core::{Email, StoreCategory, StoreId, UserId};

/// A store row as persisted.
///
/// `average_rating` and `total_ratings` are deliberately NOT here: they are
/// derived from the ratings table at query time (see `services::listing`),
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: String,
    pub category: StoreCategory,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner summary attached to store payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOwner {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}
