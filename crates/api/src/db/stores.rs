//! Store repository.
//!
//! Provides the two fetch shapes the listing service needs (a database-paginated
//! page for persisted-column sorts, and the full filtered set for
//! computed-column sorts) plus plain CRUD.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use storemark_core::{Email, StoreCategory, StoreId, UserId};

use super::RepositoryError;
use crate::models::store::{Store, StoreOwner};

const STORE_COLUMNS: &str = "id, name, email, address, category, owner_id, created_at, updated_at";

/// Filter applied to store listings.
///
/// Both listing call sites build one of these: the public directory sets
/// `search`, the "my stores" view sets `owner`. The same WHERE clause is used
/// for fetching and for the pagination count, so the two can never disagree.
#[derive(Debug, Clone, Default)]
pub struct StoreFilter {
    /// Case-insensitive substring matched against name, email, and address.
    pub search: Option<String>,
    /// Restrict to stores owned by this user.
    pub owner: Option<UserId>,
}

impl StoreFilter {
    /// Free-text directory search.
    #[must_use]
    pub fn matching(search: Option<String>) -> Self {
        Self {
            // Treat a blank search box as no filter.
            search: search.filter(|s| !s.trim().is_empty()),
            owner: None,
        }
    }

    /// Stores owned by a specific user.
    #[must_use]
    pub const fn owned_by(owner: UserId) -> Self {
        Self {
            search: None,
            owner: Some(owner),
        }
    }
}

/// Append the filter's WHERE clause. Every user-supplied value is bound as a
/// parameter; nothing from the filter is interpolated into the SQL text.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &StoreFilter) {
    let mut prefix = " WHERE ";
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(prefix)
            .push("(name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR address ILIKE ")
            .push_bind(pattern)
            .push(")");
        prefix = " AND ";
    }
    if let Some(owner) = filter.owner {
        qb.push(prefix).push("owner_id = ").push_bind(owner.as_i32());
    }
}

/// Append the ORDER BY clause for a database-paginated page. `order_by` is a
/// compile-time column name from the listing service's whitelist; the store ID
/// tiebreaker keeps equal-key pagination deterministic.
fn push_order(qb: &mut QueryBuilder<'_, Postgres>, order_by: &'static str, descending: bool) {
    qb.push(" ORDER BY ")
        .push(order_by)
        .push(if descending { " DESC" } else { " ASC" })
        .push(", id ASC");
}

/// Fields for creating or replacing a store.
#[derive(Debug, Clone)]
pub struct StoreRecord<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub address: &'a str,
    pub category: StoreCategory,
    pub owner_id: Option<UserId>,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count all stores matching the filter (pre-pagination).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &StoreFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM stores");
        push_filter(&mut qb, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(self.pool).await?;
        Ok(count)
    }

    /// Fetch one page of stores with filter, sort, and pagination pushed down
    /// to the database.
    ///
    /// `order_by` must be a persisted column name; callers go through the
    /// listing service's sort-field whitelist, never through user input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn fetch_page(
        &self,
        filter: &StoreFilter,
        order_by: &'static str,
        descending: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Store>, RepositoryError> {
        let mut qb = QueryBuilder::new(format!("SELECT {STORE_COLUMNS} FROM stores"));
        push_filter(&mut qb, filter);
        push_order(&mut qb, order_by, descending);
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let stores = qb.build_query_as::<Store>().fetch_all(self.pool).await?;
        Ok(stores)
    }

    /// Fetch the entire filtered, unpaginated result set.
    ///
    /// Used when sorting by a computed field: the listing service must see
    /// every matching row before it can order them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn fetch_all(&self, filter: &StoreFilter) -> Result<Vec<Store>, RepositoryError> {
        let mut qb = QueryBuilder::new(format!("SELECT {STORE_COLUMNS} FROM stores"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id ASC");

        let stores = qb.build_query_as::<Store>().fetch_all(self.pool).await?;
        Ok(stores)
    }

    /// Fetch raw rating values grouped by store for the given store IDs.
    ///
    /// Stores with no ratings are simply absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ratings_by_store(
        &self,
        store_ids: &[i32],
    ) -> Result<HashMap<StoreId, Vec<i32>>, RepositoryError> {
        if store_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i32, i32)> =
            sqlx::query_as("SELECT store_id, rating FROM ratings WHERE store_id = ANY($1)")
                .bind(store_ids)
                .fetch_all(self.pool)
                .await?;

        let mut ratings: HashMap<StoreId, Vec<i32>> = HashMap::new();
        for (store_id, rating) in rows {
            ratings.entry(StoreId::new(store_id)).or_default().push(rating);
        }
        Ok(ratings)
    }

    /// Fetch owner summaries for the given user IDs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn owners_by_id(
        &self,
        owner_ids: &[i32],
    ) -> Result<HashMap<UserId, StoreOwner>, RepositoryError> {
        if owner_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i32, String, Email)> =
            sqlx::query_as("SELECT id, name, email FROM users WHERE id = ANY($1)")
                .bind(owner_ids)
                .fetch_all(self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, email)| {
                let id = UserId::new(id);
                (id, StoreOwner { id, name, email })
            })
            .collect())
    }

    /// Get a store by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;
        Ok(store)
    }

    /// Create a new store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, record: StoreRecord<'_>) -> Result<Store, RepositoryError> {
        sqlx::query_as::<_, Store>(&format!(
            "INSERT INTO stores (name, email, address, category, owner_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(record.name)
        .bind(record.email.as_str())
        .bind(record.address)
        .bind(record.category.as_str())
        .bind(record.owner_id.map(|id| id.as_i32()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "store with this email already exists"))
    }

    /// Replace a store's fields.
    ///
    /// Callers merge partial updates against the current row first, so this
    /// always writes every column.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new email is already taken.
    pub async fn update(
        &self,
        id: StoreId,
        record: StoreRecord<'_>,
    ) -> Result<Store, RepositoryError> {
        sqlx::query_as::<_, Store>(&format!(
            "UPDATE stores \
             SET name = $1, email = $2, address = $3, category = $4, owner_id = $5, \
                 updated_at = now() \
             WHERE id = $6 \
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(record.name)
        .bind(record.email.as_str())
        .bind(record.address)
        .bind(record.category.as_str())
        .bind(record.owner_id.map(|id| id.as_i32()))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "store with this email already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Count stores created at or after the given instant, for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_created_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stores WHERE created_at >= $1")
                .bind(since)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Delete a store. Associated ratings are removed by the cascade.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: StoreId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_uses_column_and_direction() {
        let mut qb = QueryBuilder::new("SELECT id FROM stores");
        push_order(&mut qb, "name", true);
        assert_eq!(qb.sql(), "SELECT id FROM stores ORDER BY name DESC, id ASC");

        let mut qb = QueryBuilder::new("SELECT id FROM stores");
        push_order(&mut qb, "created_at", false);
        assert_eq!(
            qb.sql(),
            "SELECT id FROM stores ORDER BY created_at ASC, id ASC"
        );
    }

    #[test]
    fn test_search_filter_binds_every_value() {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM stores");
        push_filter(&mut qb, &StoreFilter::matching(Some("cafe".to_owned())));
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM stores WHERE (name ILIKE $1 OR email ILIKE $2 OR address ILIKE $3)"
        );
    }

    #[test]
    fn test_owner_filter_binds_id() {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM stores");
        push_filter(&mut qb, &StoreFilter::owned_by(UserId::new(7)));
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM stores WHERE owner_id = $1");
    }
}
