//! User management route handlers (admin).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use storemark_core::{Email, Role, UserId};

use crate::db::ratings::RatingFilter;
use crate::db::users::{UserChanges, UserFilter};
use crate::db::{RatingRepository, StoreFilter, StoreRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::AuthService;
use crate::services::listing::{PageWindow, Pagination};
use crate::state::AppState;

use super::success;

/// Window covered by the dashboard's "recent" counters.
const RECENT_DAYS: i64 = 7;

/// Persisted columns the user listing may sort by. Anything else falls back
/// to the default.
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("name") => "name",
        Some("email") => "email",
        Some("address") => "address",
        Some("role") => "role",
        _ => "created_at",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
}

fn parse_role(role: Option<&str>) -> Result<Option<Role>> {
    role.map(|r| {
        r.parse::<Role>()
            .map_err(|e| AppError::BadRequest(e.to_string()))
    })
    .transpose()
}

/// `GET /api/users`
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse> {
    let filter = UserFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        role: parse_role(query.role.as_deref())?,
    };
    let order_by = sort_column(query.sort_by.as_deref());
    let descending = !query
        .sort_order
        .as_deref()
        .is_some_and(|o| o.eq_ignore_ascii_case("asc"));
    let window = PageWindow::new(query.page, query.limit);

    let repo = UserRepository::new(state.pool());
    let total = repo.count(&filter).await?;
    let users = repo
        .list(&filter, order_by, descending, window.limit(), window.offset())
        .await?;

    Ok(success(json!({
        "users": users,
        "pagination": Pagination::new(window, total),
    })))
}

/// `GET /api/users/dashboard/stats`
pub async fn dashboard_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let stores = StoreRepository::new(state.pool());
    let ratings = RatingRepository::new(state.pool());

    let total_users = users.count(&UserFilter::default()).await?;
    let total_stores = stores.count(&StoreFilter::default()).await?;
    let total_ratings = ratings.count(&RatingFilter::default()).await?;

    let by_role = users.count_by_role().await?;
    let role_count = |role: Role| {
        by_role
            .iter()
            .find(|(r, _)| *r == role)
            .map_or(0, |(_, count)| *count)
    };

    let since = Utc::now() - Duration::days(RECENT_DAYS);
    let recent_users = users.count_created_since(since).await?;
    let recent_stores = stores.count_created_since(since).await?;
    let recent_ratings = ratings.count_created_since(since).await?;

    Ok(success(json!({
        "totalUsers": total_users,
        "totalStores": total_stores,
        "totalRatings": total_ratings,
        "usersByRole": {
            "admin": role_count(Role::Admin),
            "user": role_count(Role::User),
            "storeOwner": role_count(Role::StoreOwner),
        },
        "recentActivity": {
            "newUsers": recent_users,
            "newStores": recent_stores,
            "newRatings": recent_ratings,
        },
    })))
}

/// `GET /api/users/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = UserRepository::new(state.pool());
    let user = repo
        .get_by_id(UserId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

    Ok(success(json!({ "user": user })))
}

/// `POST /api/users`
///
/// Unlike self-registration, admins can assign any role.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    let role = parse_role(body.role.as_deref())?.unwrap_or_default();

    let auth = AuthService::new(state.pool());
    let user = auth
        .create_user(&body.name, &body.email, &body.password, &body.address, role)
        .await?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, role = %role.as_str(), "user created");
    Ok((StatusCode::CREATED, success(json!({ "user": user }))))
}

/// `PUT /api/users/{id}`
///
/// Partial update: absent fields keep their current value.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse> {
    let id = UserId::new(id);
    let repo = UserRepository::new(state.pool());
    let current = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

    let email = match body.email {
        Some(raw) => Email::parse(&raw).map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => current.email,
    };
    let role = parse_role(body.role.as_deref())?.unwrap_or(current.role);
    let name = body.name.unwrap_or(current.name);
    let address = body.address.unwrap_or(current.address);

    let user = repo
        .update(
            id,
            UserChanges {
                name: &name,
                email: &email,
                address: &address,
                role,
            },
        )
        .await?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, "user updated");
    Ok(success(json!({ "user": user })))
}

/// `DELETE /api/users/{id}`
///
/// The user's ratings are cascade-deleted; stores they owned survive
/// without an owner.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = UserRepository::new(state.pool());
    let deleted = repo.delete(UserId::new(id)).await?;
    if !deleted {
        return Err(AppError::NotFound("User not found".to_owned()));
    }

    tracing::info!(admin_id = %admin.id, user_id = %id, "user deleted");
    Ok(super::success_message("User deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_whitelist() {
        assert_eq!(sort_column(Some("name")), "name");
        assert_eq!(sort_column(Some("role")), "role");
        assert_eq!(sort_column(Some("password_hash")), "created_at");
        assert_eq!(sort_column(None), "created_at");
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(None).ok(), Some(None));
        assert!(matches!(
            parse_role(Some("store_owner")),
            Ok(Some(Role::StoreOwner))
        ));
        assert!(parse_role(Some("superuser")).is_err());
    }
}
