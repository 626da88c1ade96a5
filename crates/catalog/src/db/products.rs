//! Product repository: products with their variants and images.

use sqlx::{PgConnection, PgPool};

use shopfloor_core::slug::{generate_sku, normalize_sku, slugify};
use shopfloor_core::validation::clean_optional;
use shopfloor_core::{ImageId, ProductId, VariantId};

use super::categories::{ensure_active, explicit_slug};
use super::product_query::{PRODUCT_COLUMNS, ProductFilter};
use super::{RepositoryError, SlugTable, free_slug, free_value};
use crate::models::product::normalize_tags;
use crate::models::{
    CreateImage, CreateProduct, CreateVariant, Product, ProductDetail, ProductImage,
    ProductVariant, UpdateProduct, UpdateVariant,
};

const VARIANT_COLUMNS: &str = "id, product_id, sku, name, price, inventory_count, attributes, \
     is_active, created_at, updated_at";

const IMAGE_COLUMNS: &str = "id, product_id, url, alt_text, is_primary, sort_order, created_at";

const DUPLICATE_SKU: &str = "sku already exists";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of active products matching `filter`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = filter.count_query();
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = filter.select_query();
        let products = select
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        Ok((products, total))
    }

    /// Get an active product with its active variants and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.id = $1 AND p.is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match product {
            Some(product) => Ok(Some(self.with_children(product).await?)),
            None => Ok(None),
        }
    }

    /// Get an active product by slug with its active variants and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.slug = $1 AND p.is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        match product {
            Some(product) => Ok(Some(self.with_children(product).await?)),
            None => Ok(None),
        }
    }

    async fn with_children(&self, product: Product) -> Result<ProductDetail, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let variants = active_variants(&mut conn, product.id).await?;
        let images = images(&mut conn, product.id).await?;
        Ok(ProductDetail {
            product,
            variants,
            images,
        })
    }

    /// Create a product with its variants and images in one transaction.
    ///
    /// Either every row is written or none is.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for duplicate slugs or SKUs and
    /// unknown categories.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &CreateProduct) -> Result<ProductDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(category_id) = input.category_id {
            ensure_active(&mut *tx, category_id).await?;
        }

        let slug = match &input.slug {
            Some(slug) => explicit_slug(slug)?,
            None => {
                let base = slugify(&input.name)
                    .map_err(|e| RepositoryError::Conflict(format!("name: {e}")))?;
                free_slug(&mut *tx, SlugTable::Product, &base).await?
            }
        };

        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO catalog.product AS p \
                 (name, slug, description, category_id, base_price, is_featured, \
                  is_customizable, tags, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(&slug)
        .bind(clean_optional(input.description.clone()))
        .bind(input.category_id)
        .bind(input.base_price)
        .bind(input.is_featured)
        .bind(input.is_customizable)
        .bind(normalize_tags(&input.tags))
        .bind(
            input
                .metadata
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product slug already exists"))?;

        let mut variants = Vec::with_capacity(input.variants.len());
        for (i, variant) in input.variants.iter().enumerate() {
            let ordinal = u32::try_from(i + 1).unwrap_or(u32::MAX);
            variants.push(insert_variant(&mut *tx, &product, variant, ordinal).await?);
        }

        let mut images = Vec::with_capacity(input.images.len());
        for image in &input.images {
            images.push(insert_image(&mut *tx, product.id, image).await?);
        }

        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            slug = %product.slug,
            variants = variants.len(),
            images = images.len(),
            "product created"
        );

        Ok(ProductDetail {
            product,
            variants,
            images,
        })
    }

    /// Apply a partial update to an active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is missing or inactive.
    /// Returns `RepositoryError::Conflict` for slug clashes and unknown categories.
    pub async fn update(
        &self,
        id: ProductId,
        input: &UpdateProduct,
    ) -> Result<ProductDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let current = lock_product(&mut *tx, id).await?;

        let category_id = match input.category_id {
            Some(Some(category_id)) => {
                ensure_active(&mut *tx, category_id).await?;
                Some(category_id)
            }
            Some(None) => None,
            None => current.category_id,
        };
        let slug = match &input.slug {
            Some(slug) => explicit_slug(slug)?,
            None => current.slug,
        };
        let description = match &input.description {
            Some(description) => clean_optional(description.clone()),
            None => current.description,
        };

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE catalog.product AS p \
             SET name = $2, slug = $3, description = $4, category_id = $5, base_price = $6, \
                 is_featured = $7, is_customizable = $8, tags = $9, metadata = $10, \
                 updated_at = now() \
             WHERE p.id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(
            input
                .name
                .as_deref()
                .map_or(current.name, |n| n.trim().to_owned()),
        )
        .bind(slug)
        .bind(description)
        .bind(category_id)
        .bind(input.base_price.unwrap_or(current.base_price))
        .bind(input.is_featured.unwrap_or(current.is_featured))
        .bind(input.is_customizable.unwrap_or(current.is_customizable))
        .bind(input.tags.as_deref().map_or(current.tags, normalize_tags))
        .bind(input.metadata.clone().unwrap_or(current.metadata))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product slug already exists"))?;

        let variants = active_variants(&mut *tx, id).await?;
        let images = images(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(ProductDetail {
            product,
            variants,
            images,
        })
    }

    /// Soft delete a product. Its variants and images are kept untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is missing or already inactive.
    pub async fn soft_delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE catalog.product SET is_active = FALSE, updated_at = now() \
             WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add a variant to an active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is missing or inactive.
    /// Returns `RepositoryError::Conflict` if the SKU is taken.
    pub async fn add_variant(
        &self,
        product_id: ProductId,
        input: &CreateVariant,
    ) -> Result<ProductVariant, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let product = lock_product(&mut *tx, product_id).await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog.product_variant WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await?;
        let ordinal = u32::try_from(existing + 1).unwrap_or(u32::MAX);

        let variant = insert_variant(&mut *tx, &product, input, ordinal).await?;
        tx.commit().await?;
        Ok(variant)
    }

    /// Apply a partial update to an active variant of an active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or variant is missing or inactive.
    /// Returns `RepositoryError::Conflict` if a new SKU is taken.
    pub async fn update_variant(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
        input: &UpdateVariant,
    ) -> Result<ProductVariant, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut *tx, product_id).await?;

        let current = sqlx::query_as::<_, ProductVariant>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM catalog.product_variant \
             WHERE id = $1 AND product_id = $2 AND is_active FOR UPDATE"
        ))
        .bind(variant_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let sku = match &input.sku {
            Some(sku) => normalize_sku(sku).map_err(|e| RepositoryError::Conflict(e.to_string()))?,
            None => current.sku,
        };

        let variant = sqlx::query_as::<_, ProductVariant>(&format!(
            "UPDATE catalog.product_variant \
             SET sku = $2, name = $3, price = $4, inventory_count = $5, attributes = $6, \
                 updated_at = now() \
             WHERE id = $1 RETURNING {VARIANT_COLUMNS}"
        ))
        .bind(variant_id)
        .bind(sku)
        .bind(
            input
                .name
                .as_deref()
                .map_or(current.name, |n| n.trim().to_owned()),
        )
        .bind(input.price.unwrap_or(current.price))
        .bind(input.inventory_count.unwrap_or(current.inventory_count))
        .bind(input.attributes.clone().unwrap_or(current.attributes))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_SKU))?;

        tx.commit().await?;
        Ok(variant)
    }

    /// Soft delete a variant of an active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or variant is missing or inactive.
    pub async fn delete_variant(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE catalog.product_variant v SET is_active = FALSE, updated_at = now() \
             FROM catalog.product p \
             WHERE v.id = $1 AND v.product_id = $2 AND v.is_active \
               AND p.id = v.product_id AND p.is_active",
        )
        .bind(variant_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add an image to an active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is missing or inactive.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        input: &CreateImage,
    ) -> Result<ProductImage, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut *tx, product_id).await?;
        let image = insert_image(&mut *tx, product_id, input).await?;
        tx.commit().await?;
        Ok(image)
    }

    /// Remove an image from an active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or image does not exist.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM catalog.product_image i USING catalog.product p \
             WHERE i.id = $1 AND i.product_id = $2 AND p.id = i.product_id AND p.is_active",
        )
        .bind(image_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Lock an active product row for the rest of the transaction.
async fn lock_product(conn: &mut PgConnection, id: ProductId) -> Result<Product, RepositoryError> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.id = $1 AND p.is_active FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

async fn active_variants(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Vec<ProductVariant>, RepositoryError> {
    let variants = sqlx::query_as::<_, ProductVariant>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM catalog.product_variant \
         WHERE product_id = $1 AND is_active ORDER BY id"
    ))
    .bind(product_id)
    .fetch_all(conn)
    .await?;
    Ok(variants)
}

async fn images(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Vec<ProductImage>, RepositoryError> {
    let images = sqlx::query_as::<_, ProductImage>(&format!(
        "SELECT {IMAGE_COLUMNS} FROM catalog.product_image \
         WHERE product_id = $1 ORDER BY is_primary DESC, sort_order, id"
    ))
    .bind(product_id)
    .fetch_all(conn)
    .await?;
    Ok(images)
}

/// Insert a variant. Without an explicit SKU one is generated from the
/// product slug, the variant name and `ordinal`, suffixed with `-N` if
/// another product already holds it. Without a price the product's base
/// price is used.
async fn insert_variant(
    conn: &mut PgConnection,
    product: &Product,
    input: &CreateVariant,
    ordinal: u32,
) -> Result<ProductVariant, RepositoryError> {
    let sku = match &input.sku {
        Some(sku) => normalize_sku(sku).map_err(|e| RepositoryError::Conflict(e.to_string()))?,
        None => {
            let base = generate_sku(&product.slug, &input.name, ordinal);
            free_value(
                &mut *conn,
                "SELECT sku FROM catalog.product_variant WHERE sku = $1 OR sku LIKE $2",
                &base,
            )
            .await?
        }
    };

    sqlx::query_as::<_, ProductVariant>(&format!(
        "INSERT INTO catalog.product_variant \
             (product_id, sku, name, price, inventory_count, attributes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(product.id)
    .bind(sku)
    .bind(input.name.trim())
    .bind(input.price.unwrap_or(product.base_price))
    .bind(input.inventory_count)
    .bind(
        input
            .attributes
            .clone()
            .unwrap_or_else(|| serde_json::json!({})),
    )
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_SKU))
}

/// Insert an image. A primary image first clears the flag on its siblings.
async fn insert_image(
    conn: &mut PgConnection,
    product_id: ProductId,
    input: &CreateImage,
) -> Result<ProductImage, RepositoryError> {
    if input.is_primary {
        sqlx::query(
            "UPDATE catalog.product_image SET is_primary = FALSE \
             WHERE product_id = $1 AND is_primary",
        )
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    }

    let image = sqlx::query_as::<_, ProductImage>(&format!(
        "INSERT INTO catalog.product_image (product_id, url, alt_text, is_primary, sort_order) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {IMAGE_COLUMNS}"
    ))
    .bind(product_id)
    .bind(input.url.trim())
    .bind(clean_optional(input.alt_text.clone()))
    .bind(input.is_primary)
    .bind(input.sort_order)
    .fetch_one(conn)
    .await?;
    Ok(image)
}
