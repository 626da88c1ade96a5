//! Category route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;

use shopfloor_core::{ApiResponse, CategoryId};

use crate::db::CategoryRepository;
use crate::error::AppError;
use crate::models::{Category, CategoryDetail, CategoryNode, CreateCategory, UpdateCategory};
use crate::state::AppState;

/// Query parameters of `GET /categories`.
#[derive(Debug, Default, Deserialize)]
pub struct ListCategoriesQuery {
    /// Only return the direct children of this category.
    pub parent_id: Option<CategoryId>,
}

/// List active categories.
///
/// GET /categories?parent_id=
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListCategoriesQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Category>>>, AppError> {
    let Query(query) = query?;
    let categories = CategoryRepository::new(state.pool())
        .list(query.parent_id)
        .await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// Active categories as a nested tree.
///
/// GET /categories/tree
pub async fn tree(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryNode>>>, AppError> {
    let categories = CategoryRepository::new(state.pool()).list(None).await?;
    Ok(Json(ApiResponse::ok(CategoryNode::build_tree(categories))))
}

/// Get a category with its active children.
///
/// GET /categories/{id}
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<CategoryId>, PathRejection>,
) -> Result<Json<ApiResponse<CategoryDetail>>, AppError> {
    let Path(id) = id?;
    let repo = CategoryRepository::new(state.pool());

    let category = repo.get(id).await?.ok_or(AppError::NotFound("Category"))?;
    let children = repo.list(Some(id)).await?;

    Ok(Json(ApiResponse::ok(CategoryDetail { category, children })))
}

/// Create a category.
///
/// POST /categories
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategory>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), AppError> {
    let Json(input) = payload?;
    input.validate()?;

    let category = CategoryRepository::new(state.pool()).create(&input).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "category created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(category).with_message("Category created")),
    ))
}

/// Update a category.
///
/// PUT /categories/{id}
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<CategoryId>, PathRejection>,
    payload: Result<Json<UpdateCategory>, JsonRejection>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    input.validate(id)?;

    let category = CategoryRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(AppError::not_found("Category"))?;

    Ok(Json(
        ApiResponse::ok(category).with_message("Category updated"),
    ))
}

/// Soft delete a category.
///
/// DELETE /categories/{id}
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<CategoryId>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Path(id) = id?;
    CategoryRepository::new(state.pool())
        .soft_delete(id)
        .await
        .map_err(AppError::not_found("Category"))?;

    tracing::info!(category_id = %id, "category deactivated");
    Ok(Json(ApiResponse::message("Category deleted")))
}
