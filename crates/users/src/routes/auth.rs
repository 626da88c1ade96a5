//! Registration and login handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use shopfloor_core::ApiResponse;

use crate::error::AppError;
use crate::models::{LoginRequest, RegisterRequest};
use crate::services::{AuthResponse, AuthService};
use crate::state::AppState;

/// Register a customer account and return a token.
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let response = AuthService::new(state.pool(), state.token_keys())
        .register(request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response).with_message("Registration successful")),
    ))
}

/// Exchange email and password for a token.
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let Json(request) = payload?;

    let response = AuthService::new(state.pool(), state.token_keys())
        .login(&request)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "login rejected"))?;

    Ok(Json(
        ApiResponse::ok(response).with_message("Login successful"),
    ))
}
