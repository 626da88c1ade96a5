//! JSON response envelope and pagination shared by both services.
//!
//! Every response body has the shape
//!
//! ```text
//! { "success": true,  "data": ..., "message": "optional" }
//! { "success": false, "error": "...", "details": ["optional"] }
//! ```

use serde::{Deserialize, Serialize};

/// Default page size when the caller does not pass `limit`.
pub const DEFAULT_LIMIT: u32 = 20;
/// Largest page size a caller may request.
pub const MAX_LIMIT: u32 = 100;

/// Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            details: Vec::new(),
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// A successful response with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
            details: Vec::new(),
        }
    }

    /// A failed response.
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
            details: Vec::new(),
        }
    }

    /// A failed response with one entry per problem found.
    #[must_use]
    pub fn error_with_details(error: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            details,
            ..Self::error(error)
        }
    }
}

/// Errors from [`Pagination::new`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be at least 1")]
    PageTooSmall,
    #[error("limit must be between 1 and {MAX_LIMIT}")]
    LimitOutOfRange,
}

/// Validated page/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Build from optional query values, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`PaginationError`] if `page` is 0 or `limit` is outside `1..=MAX_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, PaginationError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 {
            return Err(PaginationError::PageTooSmall);
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(PaginationError::LimitOutOfRange);
        }
        Ok(Self { page, limit })
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Row offset of the first item on this page.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Page metadata for a result set of `total` rows.
    #[must_use]
    pub fn meta(&self, total: i64) -> PageMeta {
        let total = total.max(0);
        let limit = i64::from(self.limit);
        let total_pages = (total + limit - 1) / limit;
        PageMeta {
            page: self.page,
            limit: self.limit,
            total,
            total_pages,
            has_next: i64::from(self.page) < total_pages,
            has_prev: self.page > 1,
        }
    }
}

/// Pagination metadata returned alongside a page of items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// A page of items with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, pagination: &Pagination, total: i64) -> Self {
        Self {
            items,
            pagination: pagination.meta(total),
        }
    }
}
