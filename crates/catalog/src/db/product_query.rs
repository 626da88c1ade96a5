//! Product listing filter.
//!
//! Turns the raw `GET /products` query string into a validated
//! [`ProductFilter`], then renders it as a conjunctive `WHERE` clause with
//! every value bound as a parameter. Sort columns come from [`SortField`],
//! never from request text.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use shopfloor_core::validation::Validator;
use shopfloor_core::{CategoryId, Pagination};

use super::escape_like;
use crate::models::product::normalize_tags;

/// Column list for `catalog.product` aliased as `p`.
pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.category_id, \
     p.base_price, p.is_active, p.is_featured, p.is_customizable, p.tags, p.metadata, \
     p.created_at, p.updated_at";

/// Raw query parameters of `GET /products`.
///
/// Everything is taken as text so that every malformed value can be
/// reported, not just the first one serde trips over.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProductsQuery {
    pub category_id: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    /// Comma-separated; a product must carry all of them.
    pub tags: Option<String>,
    pub customizable: Option<String>,
    pub featured: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Sortable product columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Name,
    Price,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::Name => "p.name",
            Self::Price => "p.base_price",
            Self::CreatedAt => "p.created_at",
            Self::UpdatedAt => "p.updated_at",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A validated product listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub category_slug: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub tags: Vec<String>,
    pub customizable: Option<bool>,
    pub featured: Option<bool>,
    pub sort: SortField,
    pub order: SortOrder,
    pub pagination: Pagination,
}

impl TryFrom<ListProductsQuery> for ProductFilter {
    type Error = Vec<String>;

    fn try_from(query: ListProductsQuery) -> Result<Self, Self::Error> {
        let mut v = Validator::new();

        let category_id = parse_field(&mut v, "category_id", query.category_id.as_deref())
            .map(CategoryId::new);
        let min_price: Option<Decimal> = parse_field(&mut v, "min_price", query.min_price.as_deref());
        let max_price: Option<Decimal> = parse_field(&mut v, "max_price", query.max_price.as_deref());
        let customizable = parse_bool(&mut v, "customizable", query.customizable.as_deref());
        let featured = parse_bool(&mut v, "featured", query.featured.as_deref());
        let page: Option<u32> = parse_field(&mut v, "page", query.page.as_deref());
        let limit: Option<u32> = parse_field(&mut v, "limit", query.limit.as_deref());

        if let Some(min) = min_price {
            v.check(min >= Decimal::ZERO, "min_price must not be negative");
        }
        if let Some(max) = max_price {
            v.check(max >= Decimal::ZERO, "max_price must not be negative");
        }
        if let (Some(min), Some(max)) = (min_price, max_price) {
            v.check(min <= max, "min_price cannot be greater than max_price");
        }

        let sort = match non_empty(query.sort.as_deref()) {
            None => SortField::default(),
            Some(s) => SortField::parse(s).unwrap_or_else(|| {
                v.push("sort must be one of name, price, created_at, updated_at");
                SortField::default()
            }),
        };
        let order = match non_empty(query.order.as_deref()) {
            None => SortOrder::default(),
            Some(s) => SortOrder::parse(s).unwrap_or_else(|| {
                v.push("order must be asc or desc");
                SortOrder::default()
            }),
        };

        let pagination = Pagination::new(page, limit).unwrap_or_else(|e| {
            v.push(e.to_string());
            Pagination::default()
        });

        let tags = query
            .tags
            .as_deref()
            .map(|raw| normalize_tags(&raw.split(',').collect::<Vec<_>>()))
            .unwrap_or_default();

        v.finish()?;

        Ok(Self {
            category_id,
            category_slug: non_empty(query.category.as_deref()).map(str::to_lowercase),
            search: non_empty(query.search.as_deref()).map(String::from),
            min_price,
            max_price,
            tags,
            customizable,
            featured,
            sort,
            order,
            pagination,
        })
    }
}

impl ProductFilter {
    /// `SELECT` of one page of matching products.
    #[must_use]
    pub fn select_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product p"));
        self.push_where(&mut qb);

        let direction = self.order.keyword();
        qb.push(format!(
            " ORDER BY {} {direction}, p.id {direction}",
            self.sort.column()
        ));
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(self.pagination.limit()));
        qb.push(" OFFSET ");
        qb.push_bind(self.pagination.offset());
        qb
    }

    /// `SELECT COUNT(*)` over the same predicate, ignoring pagination.
    #[must_use]
    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM catalog.product p");
        self.push_where(&mut qb);
        qb
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" WHERE p.is_active = TRUE");

        if let Some(category_id) = self.category_id {
            qb.push(" AND p.category_id = ");
            qb.push_bind(category_id);
        }
        if let Some(slug) = &self.category_slug {
            qb.push(" AND p.category_id IN (SELECT id FROM catalog.category WHERE slug = ");
            qb.push_bind(slug.clone());
            qb.push(")");
        }
        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (p.name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.description ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if let Some(min) = self.min_price {
            qb.push(" AND p.base_price >= ");
            qb.push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND p.base_price <= ");
            qb.push_bind(max);
        }
        if !self.tags.is_empty() {
            qb.push(" AND p.tags @> ");
            qb.push_bind(self.tags.clone());
        }
        if let Some(customizable) = self.customizable {
            qb.push(" AND p.is_customizable = ");
            qb.push_bind(customizable);
        }
        if let Some(featured) = self.featured {
            qb.push(" AND p.is_featured = ");
            qb.push_bind(featured);
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_field<T: std::str::FromStr>(v: &mut Validator, field: &str, raw: Option<&str>) -> Option<T> {
    let raw = non_empty(raw)?;
    raw.parse().map_or_else(
        |_| {
            v.push(format!("{field} is not valid: '{raw}'"));
            None
        },
        Some,
    )
}

fn parse_bool(v: &mut Validator, field: &str, raw: Option<&str>) -> Option<bool> {
    match non_empty(raw)?.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        other => {
            v.push(format!("{field} must be true or false, got '{other}'"));
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filter(pairs: &[(&str, &str)]) -> Result<ProductFilter, Vec<String>> {
        let object: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), serde_json::Value::String((*v).to_owned())))
            .collect();
        let query: ListProductsQuery =
            serde_json::from_value(serde_json::Value::Object(object)).unwrap();
        ProductFilter::try_from(query)
    }

    #[test]
    fn test_defaults() {
        let f = filter(&[]).unwrap();
        assert_eq!(f.sort, SortField::CreatedAt);
        assert_eq!(f.order, SortOrder::Desc);
        assert_eq!(f.pagination, Pagination::default());
        assert_eq!(
            f.count_query().into_sql(),
            "SELECT COUNT(*) FROM catalog.product p WHERE p.is_active = TRUE"
        );
    }

    #[test]
    fn test_select_orders_with_id_tiebreaker_and_binds_paging() {
        let f = filter(&[("sort", "price"), ("order", "asc"), ("page", "3"), ("limit", "10")]).unwrap();
        let sql = f.select_query().into_sql();
        assert!(sql.starts_with("SELECT p.id, p.name"));
        assert!(sql.ends_with(
            " WHERE p.is_active = TRUE ORDER BY p.base_price ASC, p.id ASC LIMIT $1 OFFSET $2"
        ));
        assert_eq!(f.pagination.offset(), 20);
    }

    #[test]
    fn test_every_filter_is_bound() {
        let f = filter(&[
            ("category_id", "4"),
            ("category", "Shirts"),
            ("search", "tee"),
            ("min_price", "5"),
            ("max_price", "50.00"),
            ("tags", "Eco, summer,,"),
            ("customizable", "true"),
            ("featured", "0"),
        ])
        .unwrap();

        assert_eq!(f.category_slug.as_deref(), Some("shirts"));
        assert_eq!(f.tags, vec!["eco".to_owned(), "summer".to_owned()]);
        assert_eq!(f.featured, Some(false));

        let sql = f.count_query().into_sql();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM catalog.product p WHERE p.is_active = TRUE \
             AND p.category_id = $1 \
             AND p.category_id IN (SELECT id FROM catalog.category WHERE slug = $2) \
             AND (p.name ILIKE $3 OR p.description ILIKE $4) \
             AND p.base_price >= $5 AND p.base_price <= $6 \
             AND p.tags @> $7 AND p.is_customizable = $8 AND p.is_featured = $9"
        );
    }

    #[test]
    fn test_search_text_never_reaches_sql() {
        let f = filter(&[("search", "'; DROP TABLE catalog.product; --")]).unwrap();
        let sql = f.count_query().into_sql();
        assert!(!sql.contains("DROP"));
        assert!(sql.contains("ILIKE $1"));
    }

    #[test]
    fn test_unknown_sort_is_rejected() {
        let errors = filter(&[("sort", "p.id; DROP TABLE x")]).unwrap_err();
        assert_eq!(errors, vec!["sort must be one of name, price, created_at, updated_at"]);
    }

    #[test]
    fn test_reports_every_problem() {
        let errors = filter(&[
            ("category_id", "abc"),
            ("min_price", "10"),
            ("max_price", "5"),
            ("customizable", "maybe"),
            ("order", "sideways"),
            ("limit", "500"),
        ])
        .unwrap_err();

        assert!(errors.contains(&"category_id is not valid: 'abc'".to_owned()));
        assert!(errors.contains(&"min_price cannot be greater than max_price".to_owned()));
        assert!(errors.contains(&"customizable must be true or false, got 'maybe'".to_owned()));
        assert!(errors.contains(&"order must be asc or desc".to_owned()));
        assert!(errors.contains(&"limit must be between 1 and 100".to_owned()));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_page_zero_rejected() {
        let errors = filter(&[("page", "0")]).unwrap_err();
        assert_eq!(errors, vec!["page must be at least 1"]);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let f = filter(&[("search", "   "), ("category_id", ""), ("sort", "")]).unwrap();
        assert_eq!(f, ProductFilter::default());
    }
}
