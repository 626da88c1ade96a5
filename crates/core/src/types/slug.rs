//! Slug and SKU generation.
//!
//! Slugs are URL-safe identifiers derived from a display name. They are
//! deterministic: the same name always yields the same base slug, and
//! [`disambiguate`] turns a base slug into one that is free in a given set.

use std::collections::HashSet;

/// Maximum length of a generated or supplied SKU.
pub const MAX_SKU_LENGTH: usize = 64;

/// Length budget for the product part of a generated SKU.
///
/// Product and variant parts plus the ordinal leave room within
/// [`MAX_SKU_LENGTH`] for a `-N` suffix added on collision.
const SKU_PRODUCT_PART: usize = 28;
/// Length budget for the variant part of a generated SKU.
const SKU_VARIANT_PART: usize = 24;

/// Errors produced by [`slugify`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Nothing alphanumeric was left after normalisation.
    #[error("slug would be empty; name must contain letters or digits")]
    Empty,
}

/// Errors produced by [`normalize_sku`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SkuError {
    /// The SKU is empty after trimming.
    #[error("sku cannot be empty")]
    Empty,
    /// The SKU is longer than [`MAX_SKU_LENGTH`].
    #[error("sku must be at most {MAX_SKU_LENGTH} characters")]
    TooLong,
    /// The SKU contains characters other than letters, digits and hyphens.
    #[error("sku may only contain letters, digits and hyphens")]
    InvalidCharacter,
}

/// Derive a slug from a name.
///
/// Lowercases the input, collapses every run of characters that are not ASCII
/// letters or digits into a single hyphen and trims hyphens from both ends.
///
/// # Errors
///
/// Returns [`SlugError::Empty`] when the name has no ASCII letters or digits.
///
/// # Example
///
/// ```
/// use shopfloor_core::slug::slugify;
///
/// assert_eq!(slugify("  Hello, World!  ").unwrap(), "hello-world");
/// assert!(slugify("!!!").is_err());
/// ```
pub fn slugify(name: &str) -> Result<String, SlugError> {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        return Err(SlugError::Empty);
    }
    Ok(slug)
}

/// Return `base` if it is not taken, otherwise the first free `base-N` (N >= 2).
///
/// ```
/// use std::collections::HashSet;
/// use shopfloor_core::slug::disambiguate;
///
/// let taken: HashSet<String> = ["mug".to_owned(), "mug-2".to_owned()].into();
/// assert_eq!(disambiguate("mug", &taken), "mug-3");
/// assert_eq!(disambiguate("cup", &taken), "cup");
/// ```
#[must_use]
pub fn disambiguate(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_owned();
    }
    (2_u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_owned())
}

/// Generate a SKU for a variant that was created without one.
///
/// The result is `PRODUCT-SLUG-VARIANT-NNN`: the product slug and the
/// slugified variant name (omitted when it has no letters or digits),
/// uppercased and truncated, followed by the zero-padded 1-based ordinal.
///
/// ```
/// use shopfloor_core::slug::generate_sku;
///
/// assert_eq!(generate_sku("organic-tee", "Large / Blue", 2), "ORGANIC-TEE-LARGE-BLUE-002");
/// ```
#[must_use]
pub fn generate_sku(product_slug: &str, variant_name: &str, ordinal: u32) -> String {
    let product = truncate_slug(product_slug, SKU_PRODUCT_PART);
    let variant = slugify(variant_name)
        .map(|s| truncate_slug(&s, SKU_VARIANT_PART))
        .unwrap_or_default();

    let sku = if variant.is_empty() {
        format!("{product}-{ordinal:03}")
    } else {
        format!("{product}-{variant}-{ordinal:03}")
    };
    sku.to_uppercase()
}

/// Normalise a caller-supplied SKU: trim and uppercase, then validate.
///
/// # Errors
///
/// Returns a [`SkuError`] when the SKU is empty, too long or contains
/// characters other than ASCII letters, digits and hyphens.
pub fn normalize_sku(sku: &str) -> Result<String, SkuError> {
    let sku = sku.trim().to_uppercase();
    if sku.is_empty() {
        return Err(SkuError::Empty);
    }
    if sku.len() > MAX_SKU_LENGTH {
        return Err(SkuError::TooLong);
    }
    if !sku.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(SkuError::InvalidCharacter);
    }
    Ok(sku)
}

/// Cut a slug to at most `max` bytes without leaving a trailing hyphen.
///
/// ```
/// use shopfloor_core::slug::truncate_slug;
///
/// assert_eq!(truncate_slug("big-red-mug", 8), "big-red");
/// assert_eq!(truncate_slug("mug", 8), "mug");
/// ```
#[must_use]
pub fn truncate_slug(slug: &str, max: usize) -> String {
    // Slugs are ASCII, so byte truncation lands on a char boundary.
    let cut = slug.get(..max).unwrap_or(slug);
    cut.trim_end_matches('-').to_owned()
}
