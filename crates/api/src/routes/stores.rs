//! Store route handlers.
//!
//! The public directory and the owner's "my stores" view are the two entry
//! points into the listing service; both accept the same sort and
//! pagination parameters.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use storemark_core::{Email, StoreCategory, StoreId, UserId};

use crate::db::ratings::RatingFilter;
use crate::db::stores::StoreRecord;
use crate::db::{RatingRepository, StoreFilter, StoreRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireStoreOwner};
use crate::services::listing::{
    self, PageWindow, Pagination, SortDirection, SortField, aggregate,
};
use crate::state::AppState;

use super::success;

/// Cap on the ratings embedded in the store detail payload. The payload's
/// `totalRatings` always reflects the full count, so a consumer can tell
/// when the inline list is truncated and page through `/{id}/ratings`.
const DETAIL_RATINGS_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStoresQuery {
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRatingsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub category: Option<String>,
    pub owner_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoreRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    /// Absent leaves the owner unchanged.
    pub owner_id: Option<i32>,
}

fn parse_category(category: Option<&str>) -> Result<Option<StoreCategory>> {
    category
        .map(|c| {
            c.parse::<StoreCategory>()
                .map_err(|e| AppError::BadRequest(e.to_string()))
        })
        .transpose()
}

/// Run the listing service for a prepared filter and raw query parameters.
async fn run_listing(
    state: &AppState,
    filter: StoreFilter,
    query: &ListStoresQuery,
) -> Result<Json<serde_json::Value>> {
    let sort = SortField::parse(query.sort_by.as_deref());
    let direction = SortDirection::parse(query.sort_order.as_deref());
    let window = PageWindow::new(query.page, query.limit);

    let repo = StoreRepository::new(state.pool());
    let page = listing::list_stores(&repo, &filter, sort, direction, window).await?;

    Ok(success(json!({
        "stores": page.stores,
        "pagination": page.pagination,
    })))
}

/// `GET /api/stores`
///
/// Public directory: filter, sort (persisted or computed fields), paginate.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListStoresQuery>,
) -> Result<impl IntoResponse> {
    run_listing(&state, StoreFilter::matching(query.search.clone()), &query).await
}

/// `GET /api/stores/my-stores`
///
/// Same listing semantics as the public directory, restricted to stores the
/// caller owns.
pub async fn my_stores(
    State(state): State<AppState>,
    RequireStoreOwner(owner): RequireStoreOwner,
    Query(query): Query<ListStoresQuery>,
) -> Result<impl IntoResponse> {
    run_listing(&state, StoreFilter::owned_by(owner.id), &query).await
}

/// `GET /api/stores/{id}`
///
/// Store detail with rating aggregates and the newest individual ratings,
/// capped at [`DETAIL_RATINGS_LIMIT`]. `totalRatings` covers every rating;
/// the full history pages through `/{id}/ratings`.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let id = StoreId::new(id);
    let repo = StoreRepository::new(state.pool());
    let store = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Store not found".to_owned()))?;

    let rating_values = repo.ratings_by_store(&[id.as_i32()]).await?;
    let (average_rating, total_ratings) =
        rating_values.get(&id).map_or((0.0, 0), |v| aggregate(v));

    let owner = match store.owner_id {
        Some(owner_id) => repo
            .owners_by_id(&[owner_id.as_i32()])
            .await?
            .remove(&owner_id),
        None => None,
    };

    let filter = RatingFilter {
        store: Some(id),
        ..RatingFilter::default()
    };
    // Newest ratings inline; the full history pages through /{id}/ratings.
    let ratings = RatingRepository::new(state.pool())
        .list(&filter, DETAIL_RATINGS_LIMIT, 0)
        .await?;

    Ok(success(json!({
        "store": store,
        "owner": owner,
        "averageRating": average_rating,
        "totalRatings": total_ratings,
        "ratings": ratings,
    })))
}

/// `GET /api/stores/{id}/ratings`
///
/// Paginated ratings for one store, newest first.
pub async fn ratings(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<StoreRatingsQuery>,
) -> Result<impl IntoResponse> {
    let id = StoreId::new(id);
    let stores = StoreRepository::new(state.pool());
    if stores.get_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Store not found".to_owned()));
    }

    let window = PageWindow::new(query.page, query.limit);
    let filter = RatingFilter {
        store: Some(id),
        ..RatingFilter::default()
    };

    let repo = RatingRepository::new(state.pool());
    let total = repo.count(&filter).await?;
    let ratings = repo.list(&filter, window.limit(), window.offset()).await?;

    Ok(success(json!({
        "ratings": ratings,
        "pagination": Pagination::new(window, total),
    })))
}

/// `POST /api/stores`
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateStoreRequest>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(&body.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let category = parse_category(body.category.as_deref())?.unwrap_or_default();
    let owner_id = validate_owner(&state, body.owner_id).await?;

    let repo = StoreRepository::new(state.pool());
    let store = repo
        .create(StoreRecord {
            name: &body.name,
            email: &email,
            address: &body.address,
            category,
            owner_id,
        })
        .await?;

    tracing::info!(admin_id = %admin.id, store_id = %store.id, "store created");
    Ok((StatusCode::CREATED, success(json!({ "store": store }))))
}

/// `PUT /api/stores/{id}`
///
/// Partial update: absent fields keep their current value.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Json(body): Json<UpdateStoreRequest>,
) -> Result<impl IntoResponse> {
    let id = StoreId::new(id);
    let repo = StoreRepository::new(state.pool());
    let current = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Store not found".to_owned()))?;

    let email = match body.email {
        Some(raw) => Email::parse(&raw).map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => current.email,
    };
    let category = parse_category(body.category.as_deref())?.unwrap_or(current.category);
    let owner_id = match body.owner_id {
        Some(new_owner) => validate_owner(&state, Some(new_owner)).await?,
        None => current.owner_id,
    };
    let name = body.name.unwrap_or(current.name);
    let address = body.address.unwrap_or(current.address);

    let store = repo
        .update(
            id,
            StoreRecord {
                name: &name,
                email: &email,
                address: &address,
                category,
                owner_id,
            },
        )
        .await?;

    tracing::info!(admin_id = %admin.id, store_id = %store.id, "store updated");
    Ok(success(json!({ "store": store })))
}

/// `DELETE /api/stores/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = StoreRepository::new(state.pool());
    let deleted = repo.delete(StoreId::new(id)).await?;
    if !deleted {
        return Err(AppError::NotFound("Store not found".to_owned()));
    }

    tracing::info!(admin_id = %admin.id, store_id = %id, "store deleted");
    Ok(super::success_message("Store deleted"))
}

/// Check that a prospective owner exists and holds the store owner role.
async fn validate_owner(state: &AppState, owner_id: Option<i32>) -> Result<Option<UserId>> {
    let Some(raw) = owner_id else {
        return Ok(None);
    };
    let id = UserId::new(raw);
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Owner user does not exist".to_owned()))?;
    if !user.role.is_store_owner() {
        return Err(AppError::BadRequest(
            "Owner must have the store owner role".to_owned(),
        ));
    }
    Ok(Some(id))
}
