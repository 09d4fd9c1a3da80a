//! Rating route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use storemark_core::{RatingId, RatingValue, StoreId, UserId};

use crate::db::ratings::RatingFilter;
use crate::db::{RatingRepository, StoreRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::user::CurrentUser;
use crate::services::listing::{PageWindow, Pagination};
use crate::state::AppState;

use super::success;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRatingsQuery {
    pub store_id: Option<i32>,
    pub user_id: Option<i32>,
    pub rating: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyRatingsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatingRequest {
    pub store_id: i32,
    pub rating: i32,
    pub review_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRatingRequest {
    pub rating: i32,
    pub review_text: Option<String>,
}

/// Review text is capped by the column width; reject early with a 400
/// instead of letting the insert fail.
const MAX_REVIEW_LENGTH: usize = 1000;

fn parse_value(raw: i32) -> Result<RatingValue> {
    RatingValue::new(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn validate_review(review: Option<&str>) -> Result<()> {
    if review.is_some_and(|r| r.chars().count() > MAX_REVIEW_LENGTH) {
        return Err(AppError::BadRequest(format!(
            "review text must be at most {MAX_REVIEW_LENGTH} characters"
        )));
    }
    Ok(())
}

/// `GET /api/ratings`
///
/// Admin listing with store, user, and value filters.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListRatingsQuery>,
) -> Result<impl IntoResponse> {
    let filter = RatingFilter {
        store: query.store_id.map(StoreId::new),
        user: query.user_id.map(UserId::new),
        value: query.rating.map(parse_value).transpose()?,
    };
    let window = PageWindow::new(query.page, query.limit);

    let repo = RatingRepository::new(state.pool());
    let total = repo.count(&filter).await?;
    let ratings = repo.list(&filter, window.limit(), window.offset()).await?;

    Ok(success(json!({
        "ratings": ratings,
        "pagination": Pagination::new(window, total),
    })))
}

/// `GET /api/ratings/my-ratings`
pub async fn my_ratings(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MyRatingsQuery>,
) -> Result<impl IntoResponse> {
    let filter = RatingFilter {
        user: Some(user.id),
        ..RatingFilter::default()
    };
    let window = PageWindow::new(query.page, query.limit);

    let repo = RatingRepository::new(state.pool());
    let total = repo.count(&filter).await?;
    let ratings = repo.list(&filter, window.limit(), window.offset()).await?;

    Ok(success(json!({
        "ratings": ratings,
        "pagination": Pagination::new(window, total),
    })))
}

/// `GET /api/ratings/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = RatingRepository::new(state.pool());
    let rating = repo
        .get_with_context(RatingId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Rating not found".to_owned()))?;

    Ok(success(json!({ "rating": rating })))
}

/// `POST /api/ratings`
///
/// One rating per (user, store) pair; a second submission for the same
/// store is a conflict, not an upsert. An existing rating is reported
/// before the insert is attempted; concurrent duplicates are caught by
/// the unique index.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateRatingRequest>,
) -> Result<impl IntoResponse> {
    let value = parse_value(body.rating)?;
    validate_review(body.review_text.as_deref())?;
    let store_id = StoreId::new(body.store_id);

    let stores = StoreRepository::new(state.pool());
    if stores.get_by_id(store_id).await?.is_none() {
        return Err(AppError::NotFound("Store not found".to_owned()));
    }

    let repo = RatingRepository::new(state.pool());
    if repo
        .find_by_user_and_store(user.id, store_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "you have already rated this store; use update to modify your rating".to_owned(),
        ));
    }

    let rating = repo
        .create(user.id, store_id, value, body.review_text.as_deref())
        .await?;

    tracing::info!(user_id = %user.id, store_id = %store_id, rating = value.as_i32(), "rating created");
    Ok((StatusCode::CREATED, success(json!({ "rating": rating }))))
}

/// `PUT /api/ratings/{id}`
///
/// Users can update their own ratings; admins can update any.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Json(body): Json<UpdateRatingRequest>,
) -> Result<impl IntoResponse> {
    let id = RatingId::new(id);
    let value = parse_value(body.rating)?;
    validate_review(body.review_text.as_deref())?;

    let repo = RatingRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Rating not found".to_owned()))?;
    check_ownership(&user, existing.user_id)?;

    let rating = repo.update(id, value, body.review_text.as_deref()).await?;

    tracing::info!(user_id = %user.id, rating_id = %id, "rating updated");
    Ok(success(json!({ "rating": rating })))
}

/// `DELETE /api/ratings/{id}`
///
/// Users can delete their own ratings; admins can delete any.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let id = RatingId::new(id);

    let repo = RatingRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Rating not found".to_owned()))?;
    check_ownership(&user, existing.user_id)?;

    repo.delete(id).await?;

    tracing::info!(user_id = %user.id, rating_id = %id, "rating deleted");
    Ok(super::success_message("Rating deleted"))
}

/// Own-or-admin check shared by update and delete.
fn check_ownership(caller: &CurrentUser, rating_owner: UserId) -> Result<()> {
    if caller.id == rating_owner || caller.role.is_admin() {
        return Ok(());
    }
    Err(AppError::Forbidden(
        "You can only modify your own ratings".to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use storemark_core::{Email, Role};

    use super::*;

    fn caller(id: i32, role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            name: "Caller".to_owned(),
            email: match Email::parse("caller@example.com") {
                Ok(email) => email,
                Err(_) => unreachable!("static email is valid"),
            },
            role,
        }
    }

    #[test]
    fn test_owner_can_modify() {
        assert!(check_ownership(&caller(1, Role::User), UserId::new(1)).is_ok());
    }

    #[test]
    fn test_admin_can_modify_any() {
        assert!(check_ownership(&caller(1, Role::Admin), UserId::new(2)).is_ok());
    }

    #[test]
    fn test_other_user_is_forbidden() {
        assert!(matches!(
            check_ownership(&caller(1, Role::User), UserId::new(2)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_store_owner_cannot_modify_others() {
        assert!(check_ownership(&caller(1, Role::StoreOwner), UserId::new(2)).is_err());
    }

    #[test]
    fn test_rating_value_bounds() {
        assert!(parse_value(0).is_err());
        assert!(parse_value(1).is_ok());
        assert!(parse_value(5).is_ok());
        assert!(parse_value(6).is_err());
    }

    #[test]
    fn test_review_length() {
        assert!(validate_review(None).is_ok());
        assert!(validate_review(Some("short and sweet")).is_ok());
        let long = "x".repeat(1001);
        assert!(validate_review(Some(&long)).is_err());
    }
}
