//! Handlers for the caller's own account.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use shopfloor_core::auth::{Claims, CurrentUser};
use shopfloor_core::{ApiResponse, UserId};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{ChangePassword, UpdateProfile, User};
use crate::services::AuthService;
use crate::state::AppState;

/// The user id in the token's subject.
pub(crate) fn caller_id(claims: &Claims) -> Result<UserId, AppError> {
    claims.user_id().map_err(|_| AppError::Unauthorized)
}

/// Current user's profile.
///
/// GET /profile
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = UserRepository::new(state.pool())
        .get_active(caller_id(&claims)?)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(ApiResponse::ok(user)))
}

/// Update names and phone.
///
/// PUT /profile
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    payload: Result<Json<UpdateProfile>, JsonRejection>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let Json(input) = payload?;
    input.validate()?;

    let user = UserRepository::new(state.pool())
        .update_profile(caller_id(&claims)?, input)
        .await
        .map_err(AppError::not_found("User"))?;

    Ok(Json(ApiResponse::ok(user).with_message("Profile updated")))
}

/// Change the password; the current one must be supplied.
///
/// PUT /profile/password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    payload: Result<Json<ChangePassword>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Json(request) = payload?;

    AuthService::new(state.pool(), state.token_keys())
        .change_password(caller_id(&claims)?, &request)
        .await?;

    Ok(Json(ApiResponse::message("Password changed")))
}

/// Deactivate the caller's account.
///
/// DELETE /profile
pub async fn deactivate(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<ApiResponse<()>>, AppError> {
    UserRepository::new(state.pool())
        .deactivate(caller_id(&claims)?)
        .await
        .map_err(AppError::not_found("User"))?;

    Ok(Json(ApiResponse::message("Account deactivated")))
}
