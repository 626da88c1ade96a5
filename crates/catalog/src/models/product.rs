//! Product, variant and image domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shopfloor_core::slug::normalize_sku;
use shopfloor_core::{CategoryId, ImageId, ProductId, VariantId};
use shopfloor_core::validation::{Validator, double_option};

/// Maximum length of a product name.
pub const MAX_NAME_LENGTH: usize = 200;
/// Maximum length of a variant name.
pub const MAX_VARIANT_NAME_LENGTH: usize = 200;
/// Maximum length of a single tag.
pub const MAX_TAG_LENGTH: usize = 50;
/// Maximum length of an image URL.
pub const MAX_URL_LENGTH: usize = 2048;
/// Maximum slug length; the column leaves room for a `-N` suffix.
pub const MAX_SLUG_LENGTH: usize = 200;

/// Largest price a `NUMERIC(12, 2)` column holds.
const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub base_price: Decimal,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_customizable: bool,
    pub tags: Vec<String>,
    /// Free-form JSON object.
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    pub inventory_count: i32,
    /// Option values such as `{"size": "L"}`.
    pub attributes: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub url: String,
    pub alt_text: Option<String>,
    pub is_primary: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// A product with its active variants and its images.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    pub images: Vec<ProductImage>,
}

/// Body of `POST /products`.
///
/// Variants and images are created in the same transaction as the product.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    /// Explicit slug; derived from `name` when absent.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub base_price: Decimal,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_customizable: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
    #[serde(default)]
    pub variants: Vec<CreateVariant>,
    #[serde(default)]
    pub images: Vec<CreateImage>,
}

impl CreateProduct {
    /// Check field constraints of the product and everything nested in it.
    ///
    /// # Errors
    ///
    /// Returns one message per problem. Nested problems are prefixed with
    /// their position, e.g. `variants[1]: price must not be negative`.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        v.text("name", &self.name, MAX_NAME_LENGTH);
        v.slug(Some(&self.name), self.slug.as_deref(), MAX_SLUG_LENGTH);
        check_price(&mut v, "base_price", self.base_price);
        check_tags(&mut v, &self.tags);
        if let Some(metadata) = &self.metadata {
            v.check(metadata.is_object(), "metadata must be a JSON object");
        }

        for (i, variant) in self.variants.iter().enumerate() {
            if let Err(problems) = variant.validate() {
                for p in problems {
                    v.push(format!("variants[{i}]: {p}"));
                }
            }
        }
        for (i, image) in self.images.iter().enumerate() {
            if let Err(problems) = image.validate() {
                for p in problems {
                    v.push(format!("images[{i}]: {p}"));
                }
            }
        }
        v.check(
            self.images.iter().filter(|i| i.is_primary).count() <= 1,
            "at most one image can be primary",
        );
        v.finish()
    }
}

/// Body of `PUT /products/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<CategoryId>>,
    pub base_price: Option<Decimal>,
    pub is_featured: Option<bool>,
    pub is_customizable: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

impl UpdateProduct {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.text("name", name, MAX_NAME_LENGTH);
        }
        v.slug(None, self.slug.as_deref(), MAX_SLUG_LENGTH);
        if let Some(price) = self.base_price {
            check_price(&mut v, "base_price", price);
        }
        if let Some(tags) = &self.tags {
            check_tags(&mut v, tags);
        }
        if let Some(metadata) = &self.metadata {
            v.check(metadata.is_object(), "metadata must be a JSON object");
        }
        v.finish()
    }
}

/// A new variant, nested in [`CreateProduct`] or posted on its own.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVariant {
    /// Explicit SKU; generated from the product slug and variant name when absent.
    pub sku: Option<String>,
    pub name: String,
    /// Defaults to the product's base price.
    pub price: Option<Decimal>,
    #[serde(default)]
    pub inventory_count: i32,
    pub attributes: Option<Value>,
}

impl CreateVariant {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        v.text("name", &self.name, MAX_VARIANT_NAME_LENGTH);
        if let Some(sku) = &self.sku
            && let Err(e) = normalize_sku(sku)
        {
            v.push(e.to_string());
        }
        if let Some(price) = self.price {
            check_price(&mut v, "price", price);
        }
        v.check(
            self.inventory_count >= 0,
            "inventory_count must not be negative",
        );
        if let Some(attributes) = &self.attributes {
            v.check(attributes.is_object(), "attributes must be a JSON object");
        }
        v.finish()
    }
}

/// Body of `PUT /products/{id}/variants/{variant_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVariant {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub inventory_count: Option<i32>,
    pub attributes: Option<Value>,
}

impl UpdateVariant {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        if let Some(sku) = &self.sku
            && let Err(e) = normalize_sku(sku)
        {
            v.push(e.to_string());
        }
        if let Some(name) = &self.name {
            v.text("name", name, MAX_VARIANT_NAME_LENGTH);
        }
        if let Some(price) = self.price {
            check_price(&mut v, "price", price);
        }
        if let Some(count) = self.inventory_count {
            v.check(count >= 0, "inventory_count must not be negative");
        }
        if let Some(attributes) = &self.attributes {
            v.check(attributes.is_object(), "attributes must be a JSON object");
        }
        v.finish()
    }
}

/// A new image, nested in [`CreateProduct`] or posted on its own.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImage {
    pub url: String,
    pub alt_text: Option<String>,
    /// Setting this clears the flag on the product's other images.
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl CreateImage {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        let url = self.url.trim();
        v.check(!url.is_empty(), "url is required");
        v.check(
            url.len() <= MAX_URL_LENGTH,
            format!("url must be at most {MAX_URL_LENGTH} characters"),
        );
        v.check(
            url.is_empty() || url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/'),
            "url must be an http(s) URL or an absolute path",
        );
        v.check(self.sort_order >= 0, "sort_order must not be negative");
        v.finish()
    }
}

/// Trim, lowercase and de-duplicate tags, dropping blanks. Order is kept.
#[must_use]
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn check_price(v: &mut Validator, field: &str, price: Decimal) {
    v.check(
        price >= Decimal::ZERO,
        format!("{field} must not be negative"),
    );
    v.check(
        price.normalize().scale() <= 2,
        format!("{field} must have at most 2 decimal places"),
    );
    v.check(price <= MAX_PRICE, format!("{field} must be at most {MAX_PRICE}"));
}

fn check_tags(v: &mut Validator, tags: &[String]) {
    v.check(
        tags.iter().all(|t| t.trim().chars().count() <= MAX_TAG_LENGTH),
        format!("tags must be at most {MAX_TAG_LENGTH} characters each"),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: Value) -> CreateProduct {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_create_product_minimal() {
        let product = create(json!({"name": "Mug", "base_price": "12.50"}));
        assert!(product.validate().is_ok());
        assert_eq!(product.base_price, Decimal::new(1250, 2));
        assert!(product.variants.is_empty());
    }

    #[test]
    fn test_create_product_accepts_numeric_price() {
        let product = create(json!({"name": "Mug", "base_price": 12.5}));
        assert_eq!(product.base_price, Decimal::new(125, 1));
    }

    #[test]
    fn test_create_product_reports_nested_problems() {
        let product = create(json!({
            "name": "Tee",
            "base_price": "-1",
            "metadata": [1, 2],
            "variants": [
                {"name": "Small"},
                {"name": "", "price": "3.999", "inventory_count": -2}
            ],
            "images": [
                {"url": "https://cdn.example.com/a.jpg", "is_primary": true},
                {"url": "ftp://nope", "is_primary": true}
            ]
        }));
        let problems = product.validate().unwrap_err();

        assert!(problems.contains(&"base_price must not be negative".to_owned()));
        assert!(problems.contains(&"metadata must be a JSON object".to_owned()));
        assert!(problems.contains(&"variants[1]: name is required".to_owned()));
        assert!(problems.contains(&"variants[1]: price must have at most 2 decimal places".to_owned()));
        assert!(problems.contains(&"variants[1]: inventory_count must not be negative".to_owned()));
        assert!(problems.iter().any(|p| p.starts_with("images[1]: url must be")));
        assert!(problems.contains(&"at most one image can be primary".to_owned()));
        assert!(!problems.iter().any(|p| p.starts_with("variants[0]")));
    }

    #[test]
    fn test_explicit_slug_length_is_capped() {
        let product = create(json!({"name": "Mug", "base_price": "10", "slug": "a".repeat(300)}));
        assert_eq!(
            product.validate().unwrap_err(),
            vec!["slug must be at most 200 characters"]
        );

        let fits = create(json!({"name": "Mug", "base_price": "10", "slug": "a".repeat(200)}));
        assert!(fits.validate().is_ok());
    }

    #[test]
    fn test_price_upper_bound() {
        let at_limit = create(json!({"name": "Gold Mug", "base_price": "9999999999.99"}));
        assert!(at_limit.validate().is_ok());

        let product = create(json!({
            "name": "Gold Mug",
            "base_price": "100000000000",
            "variants": [{"name": "Solid", "price": "10000000000"}]
        }));
        let problems = product.validate().unwrap_err();
        assert!(problems.contains(&"base_price must be at most 9999999999.99".to_owned()));
        assert!(problems.contains(&"variants[0]: price must be at most 9999999999.99".to_owned()));
    }

    #[test]
    fn test_price_trailing_zeros_allowed() {
        let product = create(json!({"name": "Mug", "base_price": "5.000"}));
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_variant_rejects_bad_sku() {
        let variant: CreateVariant =
            serde_json::from_value(json!({"name": "Large", "sku": "has space"})).unwrap();
        assert!(variant.validate().is_err());
    }

    #[test]
    fn test_update_product_null_clears_category() {
        let update: UpdateProduct = serde_json::from_value(json!({"category_id": null})).unwrap();
        assert_eq!(update.category_id, Some(None));
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_normalize_tags() {
        assert_eq!(
            normalize_tags(&[" Eco ", "eco", "", "Summer"]),
            vec!["eco".to_owned(), "summer".to_owned()]
        );
    }
}
