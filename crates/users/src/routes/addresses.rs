//! Address handlers for the caller's own addresses.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

use shopfloor_core::auth::CurrentUser;
use shopfloor_core::{AddressId, ApiResponse};

use super::profile::caller_id;
use crate::db::AddressRepository;
use crate::error::AppError;
use crate::models::{Address, CreateAddress, UpdateAddress};
use crate::state::AppState;

/// Active addresses, default first.
///
/// GET /profile/addresses
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<ApiResponse<Vec<Address>>>, AppError> {
    let addresses = AddressRepository::new(state.pool())
        .list(caller_id(&claims)?)
        .await?;
    Ok(Json(ApiResponse::ok(addresses)))
}

/// Add an address.
///
/// POST /profile/addresses
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    payload: Result<Json<CreateAddress>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Address>>), AppError> {
    let Json(input) = payload?;
    input.validate()?;

    let address = AddressRepository::new(state.pool())
        .create(caller_id(&claims)?, input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(address).with_message("Address added")),
    ))
}

/// Update an address.
///
/// PUT /profile/addresses/{id}
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    id: Result<Path<AddressId>, PathRejection>,
    payload: Result<Json<UpdateAddress>, JsonRejection>,
) -> Result<Json<ApiResponse<Address>>, AppError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    input.validate()?;

    let address = AddressRepository::new(state.pool())
        .update(caller_id(&claims)?, id, input)
        .await
        .map_err(AppError::not_found("Address"))?;

    Ok(Json(ApiResponse::ok(address).with_message("Address updated")))
}

/// Soft delete an address.
///
/// DELETE /profile/addresses/{id}
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    id: Result<Path<AddressId>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Path(id) = id?;
    AddressRepository::new(state.pool())
        .soft_delete(caller_id(&claims)?, id)
        .await
        .map_err(AppError::not_found("Address"))?;

    Ok(Json(ApiResponse::message("Address deleted")))
}
