//! Category domain types.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::CategoryId;
use shopfloor_core::validation::{Validator, double_option};

/// Maximum length of a category name.
pub const MAX_NAME_LENGTH: usize = 100;
/// Maximum slug length; the column leaves room for a `-N` suffix.
pub const MAX_SLUG_LENGTH: usize = 100;

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Parent category; `None` for top-level categories.
    pub parent_id: Option<CategoryId>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category with its active direct children.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Category>,
}

/// A category and its whole active subtree.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Arrange a flat list of categories into a forest.
    ///
    /// Siblings are ordered by `sort_order`, then name. A category whose
    /// parent is not in `categories` is placed at the top level.
    #[must_use]
    pub fn build_tree(categories: Vec<Category>) -> Vec<Self> {
        let known: HashSet<CategoryId> =
            categories.iter().map(|c| c.id).collect();

        let mut by_parent: HashMap<Option<CategoryId>, Vec<Category>> = HashMap::new();
        for category in categories {
            let parent = category.parent_id.filter(|p| known.contains(p));
            by_parent.entry(parent).or_default().push(category);
        }

        Self::attach(None, &mut by_parent)
    }

    fn attach(
        parent: Option<CategoryId>,
        by_parent: &mut HashMap<Option<CategoryId>, Vec<Category>>,
    ) -> Vec<Self> {
        let mut level = by_parent.remove(&parent).unwrap_or_default();
        level.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });

        level
            .into_iter()
            .map(|category| {
                let children = Self::attach(Some(category.id), by_parent);
                Self { category, children }
            })
            .collect()
    }
}

/// Body of `POST /categories`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    /// Explicit slug; derived from `name` when absent.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CreateCategory {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        v.text("name", &self.name, MAX_NAME_LENGTH);
        v.slug(Some(&self.name), self.slug.as_deref(), MAX_SLUG_LENGTH);
        v.check(self.sort_order >= 0, "sort_order must not be negative");
        v.finish()
    }
}

/// Body of `PUT /categories/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// `null` moves the category to the top level.
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<CategoryId>>,
    pub sort_order: Option<i32>,
}

impl UpdateCategory {
    /// Check field constraints, including that a category is not its own parent.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self, id: CategoryId) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.text("name", name, MAX_NAME_LENGTH);
        }
        v.slug(None, self.slug.as_deref(), MAX_SLUG_LENGTH);
        if let Some(sort_order) = self.sort_order {
            v.check(sort_order >= 0, "sort_order must not be negative");
        }
        v.check(
            self.parent_id != Some(Some(id)),
            "a category cannot be its own parent",
        );
        v.finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn category(id: i32, parent: Option<i32>, name: &str, sort_order: i32) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
            slug: name.to_lowercase(),
            description: None,
            parent_id: parent.map(CategoryId::new),
            sort_order,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_tree_nests_and_orders() {
        let tree = CategoryNode::build_tree(vec![
            category(1, None, "Apparel", 1),
            category(2, Some(1), "Shirts", 2),
            category(3, Some(1), "Hats", 1),
            category(4, None, "Accessories", 0),
            category(5, Some(2), "Tees", 0),
        ]);

        let roots: Vec<&str> = tree.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(roots, vec!["Accessories", "Apparel"]);

        let apparel = tree.get(1).unwrap();
        let children: Vec<&str> = apparel
            .children
            .iter()
            .map(|n| n.category.name.as_str())
            .collect();
        assert_eq!(children, vec!["Hats", "Shirts"]);
        assert_eq!(apparel.children.get(1).unwrap().children.len(), 1);
    }

    #[test]
    fn test_build_tree_promotes_orphans() {
        let tree = CategoryNode::build_tree(vec![category(7, Some(99), "Orphan", 0)]);
        assert_eq!(tree.len(), 1);
        assert!(tree.first().unwrap().children.is_empty());
    }

    #[test]
    fn test_build_tree_ties_break_on_name() {
        let tree = CategoryNode::build_tree(vec![
            category(1, None, "Beta", 0),
            category(2, None, "Alpha", 0),
        ]);
        assert_eq!(tree.first().unwrap().category.name, "Alpha");
    }

    #[test]
    fn test_create_category_validation() {
        let ok: CreateCategory = serde_json::from_str(r#"{"name":"Shirts"}"#).unwrap();
        assert!(ok.validate().is_ok());

        let bad: CreateCategory =
            serde_json::from_value(serde_json::json!({"name": "", "sort_order": -1})).unwrap();
        assert_eq!(bad.validate().unwrap_err().len(), 2);
    }

    #[test]
    fn test_category_slug_length_is_capped() {
        let long: CreateCategory = serde_json::from_value(
            serde_json::json!({"name": "Shirts", "slug": "s".repeat(MAX_SLUG_LENGTH + 1)}),
        )
        .unwrap();
        assert_eq!(
            long.validate().unwrap_err(),
            vec!["slug must be at most 100 characters"]
        );

        let update: UpdateCategory =
            serde_json::from_value(serde_json::json!({"slug": "s".repeat(150)})).unwrap();
        assert!(update.validate(CategoryId::new(1)).is_err());
    }

    #[test]
    fn test_update_category_distinguishes_null_parent() {
        let absent: UpdateCategory = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.parent_id, None);

        let null: UpdateCategory = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(null.parent_id, Some(None));

        let set: UpdateCategory = serde_json::from_str(r#"{"parent_id":3}"#).unwrap();
        assert_eq!(set.parent_id, Some(Some(CategoryId::new(3))));
    }

    #[test]
    fn test_update_category_rejects_self_parent() {
        let update: UpdateCategory = serde_json::from_str(r#"{"parent_id":3}"#).unwrap();
        assert!(update.validate(CategoryId::new(3)).is_err());
        assert!(update.validate(CategoryId::new(4)).is_ok());
    }
}
