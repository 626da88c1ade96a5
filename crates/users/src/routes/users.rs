//! Admin user listing.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};

use shopfloor_core::{ApiResponse, Page};

use crate::db::UserRepository;
use crate::db::users::{ListUsersQuery, UserListQuery};
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Paginated user listing, newest first.
///
/// GET /users?role=&search=&active=&page=&limit=
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<User>>>, AppError> {
    let Query(raw) = query?;
    let query = UserListQuery::try_from(raw)?;

    let (users, total) = UserRepository::new(state.pool()).list(&query).await?;
    Ok(Json(ApiResponse::ok(Page::new(
        users,
        &query.pagination,
        total,
    ))))
}
