//! Store listing aggregation and pagination engine.
//!
//! A store's `averageRating` and `totalRatings` are derived from the ratings
//! table at read time, never stored. That splits listing into two plans:
//!
//! - **Pushdown**: the sort key is a persisted column, so filter, sort, and
//!   LIMIT/OFFSET all run in the database; aggregates are computed only for
//!   the returned page.
//! - **Materialize**: the sort key is a computed value, so the entire
//!   filtered set is fetched, aggregated, sorted in memory, and then the
//!   requested page window is sliced out. Paginating before computing the
//!   sort key would scramble page ordering.
//!
//! The choice is an explicit [`SortPlan`] decided by [`SortField::plan`],
//! and the filtered (pre-pagination) count feeds pagination metadata in both
//! plans. Both listing call sites - the public directory and "my stores" -
//! go through [`list_stores`].

use std::collections::HashMap;

use serde::Serialize;

use storemark_core::{StoreId, UserId};

use crate::db::{RepositoryError, StoreFilter, StoreRepository};
use crate::models::store::{Store, StoreOwner};

/// Page size used when the client doesn't send `limit`.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Sortable fields for the store listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Email,
    Address,
    Category,
    CreatedAt,
    UpdatedAt,
    /// Mean rating, derived. Forces the materialize plan.
    AverageRating,
    /// Rating count, derived. Forces the materialize plan.
    TotalRatings,
}

impl SortField {
    /// Parse a `sortBy` query value.
    ///
    /// Unknown or missing fields fall back to `created_at` rather than
    /// failing; an invalid sort is not a client error.
    #[must_use]
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("name") => Self::Name,
            Some("email") => Self::Email,
            Some("address") => Self::Address,
            Some("category") => Self::Category,
            Some("updated_at" | "updatedAt") => Self::UpdatedAt,
            Some("averageRating" | "average_rating") => Self::AverageRating,
            Some("totalRatings" | "total_ratings") => Self::TotalRatings,
            _ => Self::CreatedAt,
        }
    }

    /// Decide how listing executes for this sort field.
    #[must_use]
    pub const fn plan(self) -> SortPlan {
        match self {
            Self::Name => SortPlan::Pushdown("name"),
            Self::Email => SortPlan::Pushdown("email"),
            Self::Address => SortPlan::Pushdown("address"),
            Self::Category => SortPlan::Pushdown("category"),
            Self::CreatedAt => SortPlan::Pushdown("created_at"),
            Self::UpdatedAt => SortPlan::Pushdown("updated_at"),
            Self::AverageRating => SortPlan::Materialize(ComputedKey::AverageRating),
            Self::TotalRatings => SortPlan::Materialize(ComputedKey::TotalRatings),
        }
    }
}

/// The two ways a listing can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPlan {
    /// Sort and paginate in the database by this (whitelisted) column.
    Pushdown(&'static str),
    /// Fetch everything, aggregate, sort in memory by this key, then slice.
    Materialize(ComputedKey),
}

/// Computed sort keys available to the materialize plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedKey {
    AverageRating,
    TotalRatings,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a `sortOrder` query value, defaulting to descending.
    #[must_use]
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some(v) if v.eq_ignore_ascii_case("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    /// Whether this is a descending sort.
    #[must_use]
    pub const fn is_descending(self) -> bool {
        matches!(self, Self::Desc)
    }
}

/// A coerced page window: `page >= 1`, `limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: i64,
    limit: i64,
}

impl PageWindow {
    /// Build a window from raw query values, coercing non-positive or
    /// missing values.
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
        }
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(self) -> i64 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn limit(self) -> i64 {
        self.limit
    }

    /// Rows to skip before this page starts.
    #[must_use]
    pub const fn offset(self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// Pagination metadata, computed from the filtered total in both plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_stores: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Compute metadata for a window over `total` matching rows.
    #[must_use]
    pub const fn new(window: PageWindow, total: i64) -> Self {
        // Integer ceil; zero matches yield zero pages, not one empty page.
        let total_pages = if total == 0 {
            0
        } else {
            (total + window.limit - 1) / window.limit
        };
        Self {
            current_page: window.page,
            total_pages,
            total_stores: total,
            has_next: window.page < total_pages,
            has_prev: window.page > 1,
        }
    }
}

/// A store annotated with its derived rating statistics.
///
/// Per-rating detail is deliberately absent from listing payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreListing {
    #[serde(flatten)]
    pub store: Store,
    pub owner: Option<StoreOwner>,
    /// Mean of this store's ratings, rounded to 2 decimals; exactly 0 when
    /// the store has no ratings.
    pub average_rating: f64,
    pub total_ratings: i64,
}

/// One page of stores plus pagination metadata, ready for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct StorePage {
    pub stores: Vec<StoreListing>,
    pub pagination: Pagination,
}

/// Compute `(averageRating, totalRatings)` for a set of raw rating values.
#[must_use]
pub fn aggregate(ratings: &[i32]) -> (f64, i64) {
    let total = ratings.len() as i64;
    if total == 0 {
        return (0.0, 0);
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    #[allow(clippy::cast_precision_loss)] // rating sums are tiny
    let mean = sum as f64 / total as f64;
    (round2(mean), total)
}

/// Round to 2 decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Attach aggregates and owner summaries to fetched store rows.
#[must_use]
pub fn annotate(
    stores: Vec<Store>,
    ratings: &HashMap<StoreId, Vec<i32>>,
    owners: &HashMap<UserId, StoreOwner>,
) -> Vec<StoreListing> {
    stores
        .into_iter()
        .map(|store| {
            let (average_rating, total_ratings) = ratings
                .get(&store.id)
                .map_or((0.0, 0), |values| aggregate(values));
            let owner = store.owner_id.and_then(|id| owners.get(&id).cloned());
            StoreListing {
                store,
                owner,
                average_rating,
                total_ratings,
            }
        })
        .collect()
}

/// Sort a fully materialized listing by a computed key.
///
/// The sort is stable, so rows with equal keys keep their fetch order
/// (ascending store ID).
pub fn sort_by_computed(listings: &mut [StoreListing], key: ComputedKey, direction: SortDirection) {
    listings.sort_by(|a, b| {
        let ordering = match key {
            ComputedKey::AverageRating => a.average_rating.total_cmp(&b.average_rating),
            ComputedKey::TotalRatings => a.total_ratings.cmp(&b.total_ratings),
        };
        if direction.is_descending() {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

/// Slice the requested page window out of a sorted, materialized listing.
#[must_use]
pub fn page_slice(listings: Vec<StoreListing>, window: PageWindow) -> Vec<StoreListing> {
    let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(window.limit()).unwrap_or(usize::MAX);
    listings.into_iter().skip(offset).take(limit).collect()
}

/// Produce a filtered, sorted, paginated page of stores with computed rating
/// statistics.
///
/// Reads are not transactionally consistent with each other; a rating
/// landing between the store fetch and the aggregate fetch is an accepted
/// staleness window.
///
/// # Errors
///
/// Returns `RepositoryError` if any persistence lookup fails. No partial
/// results: either a complete page is produced or the error propagates.
pub async fn list_stores(
    repo: &StoreRepository<'_>,
    filter: &StoreFilter,
    sort: SortField,
    direction: SortDirection,
    window: PageWindow,
) -> Result<StorePage, RepositoryError> {
    let total = repo.count(filter).await?;

    let stores = match sort.plan() {
        SortPlan::Pushdown(column) => {
            let page = repo
                .fetch_page(
                    filter,
                    column,
                    direction.is_descending(),
                    window.limit(),
                    window.offset(),
                )
                .await?;
            annotate_from_db(repo, page).await?
        }
        SortPlan::Materialize(key) => {
            let everything = repo.fetch_all(filter).await?;
            let mut listings = annotate_from_db(repo, everything).await?;
            sort_by_computed(&mut listings, key, direction);
            page_slice(listings, window)
        }
    };

    Ok(StorePage {
        stores,
        pagination: Pagination::new(window, total),
    })
}

/// Fetch ratings and owner summaries for the given rows and annotate them.
async fn annotate_from_db(
    repo: &StoreRepository<'_>,
    stores: Vec<Store>,
) -> Result<Vec<StoreListing>, RepositoryError> {
    let store_ids: Vec<i32> = stores.iter().map(|s| s.id.as_i32()).collect();
    let ratings = repo.ratings_by_store(&store_ids).await?;

    let mut owner_ids: Vec<i32> = stores
        .iter()
        .filter_map(|s| s.owner_id.map(|id| id.as_i32()))
        .collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();
    let owners = repo.owners_by_id(&owner_ids).await?;

    Ok(annotate(stores, &ratings, &owners))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use storemark_core::{Email, StoreCategory};

    use super::*;

    fn store(id: i32) -> Store {
        Store {
            id: StoreId::new(id),
            name: format!("Store {id}"),
            email: Email::parse(&format!("store{id}@example.com")).unwrap(),
            address: format!("{id} Main Street"),
            category: StoreCategory::Other,
            owner_id: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn listing(id: i32, average_rating: f64, total_ratings: i64) -> StoreListing {
        StoreListing {
            store: store(id),
            owner: None,
            average_rating,
            total_ratings,
        }
    }

    #[test]
    fn test_sort_field_parse_known() {
        assert_eq!(SortField::parse(Some("name")), SortField::Name);
        assert_eq!(
            SortField::parse(Some("averageRating")),
            SortField::AverageRating
        );
        assert_eq!(
            SortField::parse(Some("total_ratings")),
            SortField::TotalRatings
        );
    }

    #[test]
    fn test_sort_field_parse_fallback() {
        // Invalid sort fields fall back to the default rather than failing.
        assert_eq!(SortField::parse(Some("password_hash")), SortField::CreatedAt);
        assert_eq!(
            SortField::parse(Some("name; DROP TABLE stores")),
            SortField::CreatedAt
        );
        assert_eq!(SortField::parse(None), SortField::CreatedAt);
    }

    #[test]
    fn test_plan_pushdown_for_persisted_columns() {
        assert_eq!(SortField::Name.plan(), SortPlan::Pushdown("name"));
        assert_eq!(SortField::CreatedAt.plan(), SortPlan::Pushdown("created_at"));
        assert_eq!(SortField::Category.plan(), SortPlan::Pushdown("category"));
    }

    #[test]
    fn test_every_persisted_column_pushes_down() {
        // The pushdown plan's ORDER BY column comes from this mapping and
        // nowhere else; each persisted field must name its own column.
        let persisted = [
            (SortField::Name, "name"),
            (SortField::Email, "email"),
            (SortField::Address, "address"),
            (SortField::Category, "category"),
            (SortField::CreatedAt, "created_at"),
            (SortField::UpdatedAt, "updated_at"),
        ];
        for (field, column) in persisted {
            assert_eq!(field.plan(), SortPlan::Pushdown(column));
        }
    }

    #[test]
    fn test_direction_maps_to_sql_keyword() {
        assert!(SortDirection::Desc.is_descending());
        assert!(!SortDirection::Asc.is_descending());
    }

    #[test]
    fn test_plan_materialize_for_computed_fields() {
        assert_eq!(
            SortField::AverageRating.plan(),
            SortPlan::Materialize(ComputedKey::AverageRating)
        );
        assert_eq!(
            SortField::TotalRatings.plan(),
            SortPlan::Materialize(ComputedKey::TotalRatings)
        );
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(SortDirection::parse(Some("asc")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(Some("ASC")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("sideways")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(None), SortDirection::Desc);
    }

    #[test]
    fn test_window_coerces_to_positive() {
        let window = PageWindow::new(Some(0), Some(-5));
        assert_eq!(window.page(), 1);
        assert_eq!(window.limit(), 1);

        let window = PageWindow::new(None, None);
        assert_eq!(window.page(), 1);
        assert_eq!(window.limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_window_offset() {
        assert_eq!(PageWindow::new(Some(1), Some(5)).offset(), 0);
        assert_eq!(PageWindow::new(Some(3), Some(5)).offset(), 10);
    }

    #[test]
    fn test_aggregate_empty_is_exactly_zero() {
        let (average, total) = aggregate(&[]);
        assert_eq!(average, 0.0);
        assert_eq!(total, 0);
    }

    #[test]
    fn test_aggregate_example_from_contract() {
        // [5, 4, 3] -> averageRating 4.0, totalRatings 3
        assert_eq!(aggregate(&[5, 4, 3]), (4.0, 3));
    }

    #[test]
    fn test_aggregate_rounds_to_two_decimals() {
        assert_eq!(aggregate(&[5, 4]), (4.5, 2));
        assert_eq!(aggregate(&[1, 2, 5]), (2.67, 3));
        assert_eq!(aggregate(&[2, 2, 2, 3]), (2.25, 4));
        assert_eq!(aggregate(&[1, 1, 2]), (1.33, 3));
    }

    #[test]
    fn test_pagination_ceil() {
        let pagination = Pagination::new(PageWindow::new(Some(1), Some(5)), 12);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.total_stores, 12);
        assert!(pagination.has_next);
        assert!(!pagination.has_prev);

        let pagination = Pagination::new(PageWindow::new(Some(3), Some(5)), 12);
        assert!(!pagination.has_next);
        assert!(pagination.has_prev);

        // Exact multiple
        let pagination = Pagination::new(PageWindow::new(Some(2), Some(6)), 12);
        assert_eq!(pagination.total_pages, 2);
        assert!(!pagination.has_next);
    }

    #[test]
    fn test_pagination_zero_matches() {
        let pagination = Pagination::new(PageWindow::new(Some(1), Some(10)), 0);
        assert_eq!(pagination.total_pages, 0);
        assert_eq!(pagination.total_stores, 0);
        assert!(!pagination.has_next);
        assert!(!pagination.has_prev);
    }

    #[test]
    fn test_annotate_zero_ratings_store() {
        let stores = vec![store(1)];
        let listings = annotate(stores, &HashMap::new(), &HashMap::new());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].average_rating, 0.0);
        assert_eq!(listings[0].total_ratings, 0);
    }

    #[test]
    fn test_annotate_attaches_aggregates_and_owner() {
        let mut rated = store(1);
        rated.owner_id = Some(UserId::new(7));
        let stores = vec![rated, store(2)];

        let mut ratings = HashMap::new();
        ratings.insert(StoreId::new(1), vec![5, 4, 3]);

        let mut owners = HashMap::new();
        owners.insert(
            UserId::new(7),
            StoreOwner {
                id: UserId::new(7),
                name: "Owner".to_owned(),
                email: Email::parse("owner@example.com").unwrap(),
            },
        );

        let listings = annotate(stores, &ratings, &owners);
        assert_eq!(listings[0].average_rating, 4.0);
        assert_eq!(listings[0].total_ratings, 3);
        assert!(listings[0].owner.is_some());
        assert_eq!(listings[1].average_rating, 0.0);
        assert!(listings[1].owner.is_none());
    }

    /// Twelve stores, three with zero ratings, sorted by average rating
    /// descending with limit 5: page 1 holds the five highest averages and
    /// the zero-rating stores land on the last page.
    #[test]
    fn test_computed_sort_pages_are_globally_ordered() {
        // Averages: store i gets average (12 - i) * 0.25 for i in 1..=9,
        // stores 10..=12 have no ratings (average 0).
        let mut listings: Vec<StoreListing> = (1..=9)
            .map(|i| listing(i, f64::from(12 - i) * 0.25, i64::from(i)))
            .collect();
        listings.extend((10..=12).map(|i| listing(i, 0.0, 0)));

        sort_by_computed(&mut listings, ComputedKey::AverageRating, SortDirection::Desc);

        let window1 = PageWindow::new(Some(1), Some(5));
        let window2 = PageWindow::new(Some(2), Some(5));
        let window3 = PageWindow::new(Some(3), Some(5));
        let page1 = page_slice(listings.clone(), window1);
        let page2 = page_slice(listings.clone(), window2);
        let page3 = page_slice(listings, window3);

        assert_eq!(page1.len(), 5);
        assert_eq!(page2.len(), 5);
        assert_eq!(page3.len(), 2);

        // Descending within each page
        for page in [&page1, &page2, &page3] {
            for pair in page.windows(2) {
                assert!(pair[0].average_rating >= pair[1].average_rating);
            }
        }

        // Globally ordered across the page boundary: first item of page n+1
        // never outranks the last item of page n.
        assert!(page2[0].average_rating <= page1[4].average_rating);
        assert!(page3[0].average_rating <= page2[4].average_rating);

        // Zero-rating stores appear last
        assert_eq!(page3[0].average_rating, 0.0);
        assert_eq!(page3[1].average_rating, 0.0);

        // Pagination metadata agrees with the example
        let pagination = Pagination::new(window1, 12);
        assert_eq!(pagination.total_pages, 3);
    }

    #[test]
    fn test_computed_sort_by_total_ratings_asc() {
        let mut listings = vec![listing(1, 3.0, 7), listing(2, 5.0, 1), listing(3, 1.0, 4)];
        sort_by_computed(&mut listings, ComputedKey::TotalRatings, SortDirection::Asc);
        let totals: Vec<i64> = listings.iter().map(|l| l.total_ratings).collect();
        assert_eq!(totals, vec![1, 4, 7]);
    }

    #[test]
    fn test_computed_sort_is_stable_on_ties() {
        let mut listings = vec![listing(1, 4.0, 2), listing(2, 4.0, 2), listing(3, 4.0, 2)];
        sort_by_computed(&mut listings, ComputedKey::AverageRating, SortDirection::Desc);
        let ids: Vec<i32> = listings.iter().map(|l| l.store.id.as_i32()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_page_slice_beyond_end_is_empty() {
        let listings = vec![listing(1, 1.0, 1), listing(2, 2.0, 1)];
        let page = page_slice(listings, PageWindow::new(Some(5), Some(10)));
        assert!(page.is_empty());
    }

    #[test]
    fn test_sort_then_slice_is_idempotent() {
        let build = || {
            let mut listings: Vec<StoreListing> =
                (1..=8).map(|i| listing(i, f64::from(i % 4), 1)).collect();
            sort_by_computed(&mut listings, ComputedKey::AverageRating, SortDirection::Desc);
            page_slice(listings, PageWindow::new(Some(2), Some(3)))
        };
        assert_eq!(build(), build());
    }
}
