//! Rating repository.
//!
//! The (user, store) uniqueness invariant lives in the database as a unique
//! index; concurrent duplicate submissions surface here as
//! `RepositoryError::Conflict` without any locking in this layer.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use storemark_core::{Email, RatingId, RatingValue, StoreId, UserId};

use super::RepositoryError;
use crate::models::rating::{Rating, RatingAuthor, RatingStoreInfo, RatingWithContext};

const RATING_COLUMNS: &str = "id, user_id, store_id, rating, review_text, created_at, updated_at";

const CONTEXT_SELECT: &str = "SELECT r.id, r.rating, r.review_text, r.created_at, r.updated_at, \
     u.id AS user_id, u.name AS user_name, u.email AS user_email, \
     s.id AS store_id, s.name AS store_name, s.address AS store_address \
     FROM ratings r \
     JOIN users u ON u.id = r.user_id \
     JOIN stores s ON s.id = r.store_id";

/// Filter for the admin ratings listing.
#[derive(Debug, Clone, Default)]
pub struct RatingFilter {
    pub store: Option<StoreId>,
    pub user: Option<UserId>,
    pub value: Option<RatingValue>,
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &RatingFilter) {
    let mut prefix = " WHERE ";
    if let Some(store) = filter.store {
        qb.push(prefix).push("r.store_id = ").push_bind(store.as_i32());
        prefix = " AND ";
    }
    if let Some(user) = filter.user {
        qb.push(prefix).push("r.user_id = ").push_bind(user.as_i32());
        prefix = " AND ";
    }
    if let Some(value) = filter.value {
        qb.push(prefix).push("r.rating = ").push_bind(value.as_i32());
    }
}

/// Repository for rating database operations.
pub struct RatingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RatingRepository<'a> {
    /// Create a new rating repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a rating by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError> {
        let rating = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;
        Ok(rating)
    }

    /// Get a rating with author and store attached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_context(
        &self,
        id: RatingId,
    ) -> Result<Option<RatingWithContext>, RepositoryError> {
        let row = sqlx::query_as::<_, ContextRow>(&format!("{CONTEXT_SELECT} WHERE r.id = $1"))
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(ContextRow::into_context))
    }

    /// Find the rating a user gave a store, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_user_and_store(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Option<Rating>, RepositoryError> {
        let rating = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 AND store_id = $2"
        ))
        .bind(user.as_i32())
        .bind(store.as_i32())
        .fetch_optional(self.pool)
        .await?;
        Ok(rating)
    }

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if this user already rated this
    /// store (unique index on the pair).
    pub async fn create(
        &self,
        user: UserId,
        store: StoreId,
        rating: RatingValue,
        review_text: Option<&str>,
    ) -> Result<Rating, RepositoryError> {
        sqlx::query_as::<_, Rating>(&format!(
            "INSERT INTO ratings (user_id, store_id, rating, review_text) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(user.as_i32())
        .bind(store.as_i32())
        .bind(rating.as_i32())
        .bind(review_text)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_unique(
                e,
                "you have already rated this store; use update to modify your rating",
            )
        })
    }

    /// Update a rating's value and review text.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rating doesn't exist.
    pub async fn update(
        &self,
        id: RatingId,
        rating: RatingValue,
        review_text: Option<&str>,
    ) -> Result<Rating, RepositoryError> {
        sqlx::query_as::<_, Rating>(&format!(
            "UPDATE ratings SET rating = $1, review_text = $2, updated_at = now() \
             WHERE id = $3 \
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(rating.as_i32())
        .bind(review_text)
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a rating.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: RatingId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List ratings matching the filter, newest first, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &RatingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RatingWithContext>, RepositoryError> {
        let mut qb = QueryBuilder::new(CONTEXT_SELECT);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY r.created_at DESC, r.id DESC");
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let rows = qb.build_query_as::<ContextRow>().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(ContextRow::into_context).collect())
    }

    /// Count ratings matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &RatingFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ratings r");
        push_filter(&mut qb, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(self.pool).await?;
        Ok(count)
    }

    /// Count ratings created at or after the given instant, for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_created_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE created_at >= $1")
                .bind(since)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}

/// Joined row backing [`RatingWithContext`].
#[derive(sqlx::FromRow)]
struct ContextRow {
    id: RatingId,
    rating: RatingValue,
    review_text: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: UserId,
    user_name: String,
    user_email: Email,
    store_id: StoreId,
    store_name: String,
    store_address: String,
}

impl ContextRow {
    fn into_context(self) -> RatingWithContext {
        RatingWithContext {
            id: self.id,
            rating: self.rating,
            review_text: self.review_text,
            user: RatingAuthor {
                id: self.user_id,
                name: self.user_name,
                email: self.user_email,
            },
            store: RatingStoreInfo {
                id: self.store_id,
                name: self.store_name,
                address: self.store_address,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
