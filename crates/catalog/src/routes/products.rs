//! Product route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};

use shopfloor_core::{ApiResponse, ImageId, Page, ProductId, VariantId};

use crate::db::ProductRepository;
use crate::db::product_query::{ListProductsQuery, ProductFilter};
use crate::error::AppError;
use crate::models::{
    CreateImage, CreateProduct, CreateVariant, Product, ProductDetail, ProductImage,
    ProductVariant, UpdateProduct, UpdateVariant,
};
use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

/// List active products.
///
/// GET /products?category_id=&category=&search=&min_price=&max_price=&tags=&customizable=&featured=&sort=&order=&page=&limit=
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListProductsQuery>, QueryRejection>,
) -> ApiResult<Page<Product>> {
    let Query(query) = query?;
    let filter = ProductFilter::try_from(query)?;

    let (products, total) = ProductRepository::new(state.pool()).list(&filter).await?;

    Ok(Json(ApiResponse::ok(Page::new(
        products,
        &filter.pagination,
        total,
    ))))
}

/// Get one active product with its variants and images.
///
/// GET /products/{id}
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
) -> ApiResult<ProductDetail> {
    let Path(id) = id?;
    let product = ProductRepository::new(state.pool())
        .get_detail(id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(ApiResponse::ok(product)))
}

/// Get one active product by slug.
///
/// GET /products/slug/{slug}
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<ProductDetail> {
    let product = ProductRepository::new(state.pool())
        .get_detail_by_slug(&slug.to_lowercase())
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(ApiResponse::ok(product)))
}

/// Create a product together with its variants and images.
///
/// POST /products
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateProduct>, JsonRejection>,
) -> Created<ProductDetail> {
    let Json(input) = payload?;
    input.validate()?;

    let product = ProductRepository::new(state.pool()).create(&input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(product).with_message("Product created")),
    ))
}

/// Update an active product.
///
/// PUT /products/{id}
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
    payload: Result<Json<UpdateProduct>, JsonRejection>,
) -> ApiResult<ProductDetail> {
    let Path(id) = id?;
    let Json(input) = payload?;
    input.validate()?;

    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(AppError::not_found("Product"))?;

    Ok(Json(ApiResponse::ok(product).with_message("Product updated")))
}

/// Soft delete a product.
///
/// DELETE /products/{id}
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    ProductRepository::new(state.pool())
        .soft_delete(id)
        .await
        .map_err(AppError::not_found("Product"))?;

    tracing::info!(product_id = %id, "product deactivated");
    Ok(Json(ApiResponse::message("Product deleted")))
}

/// Add a variant to a product.
///
/// POST /products/{id}/variants
pub async fn create_variant(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
    payload: Result<Json<CreateVariant>, JsonRejection>,
) -> Created<ProductVariant> {
    let Path(id) = id?;
    let Json(input) = payload?;
    input.validate()?;

    let variant = ProductRepository::new(state.pool())
        .add_variant(id, &input)
        .await
        .map_err(AppError::not_found("Product"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(variant).with_message("Variant created")),
    ))
}

/// Update a variant.
///
/// PUT /products/{id}/variants/{variant_id}
pub async fn update_variant(
    State(state): State<AppState>,
    ids: Result<Path<(ProductId, VariantId)>, PathRejection>,
    payload: Result<Json<UpdateVariant>, JsonRejection>,
) -> ApiResult<ProductVariant> {
    let Path((id, variant_id)) = ids?;
    let Json(input) = payload?;
    input.validate()?;

    let variant = ProductRepository::new(state.pool())
        .update_variant(id, variant_id, &input)
        .await
        .map_err(AppError::not_found("Variant"))?;

    Ok(Json(ApiResponse::ok(variant).with_message("Variant updated")))
}

/// Soft delete a variant.
///
/// DELETE /products/{id}/variants/{variant_id}
pub async fn delete_variant(
    State(state): State<AppState>,
    ids: Result<Path<(ProductId, VariantId)>, PathRejection>,
) -> ApiResult<()> {
    let Path((id, variant_id)) = ids?;
    ProductRepository::new(state.pool())
        .delete_variant(id, variant_id)
        .await
        .map_err(AppError::not_found("Variant"))?;

    Ok(Json(ApiResponse::message("Variant deleted")))
}

/// Add an image to a product.
///
/// POST /products/{id}/images
pub async fn create_image(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
    payload: Result<Json<CreateImage>, JsonRejection>,
) -> Created<ProductImage> {
    let Path(id) = id?;
    let Json(input) = payload?;
    input.validate()?;

    let image = ProductRepository::new(state.pool())
        .add_image(id, &input)
        .await
        .map_err(AppError::not_found("Product"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(image).with_message("Image added")),
    ))
}

/// Remove an image.
///
/// DELETE /products/{id}/images/{image_id}
pub async fn delete_image(
    State(state): State<AppState>,
    ids: Result<Path<(ProductId, ImageId)>, PathRejection>,
) -> ApiResult<()> {
    let Path((id, image_id)) = ids?;
    ProductRepository::new(state.pool())
        .delete_image(id, image_id)
        .await
        .map_err(AppError::not_found("Image"))?;

    Ok(Json(ApiResponse::message("Image deleted")))
}
