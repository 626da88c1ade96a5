//! Category repository.

use sqlx::{PgConnection, PgPool};

use shopfloor_core::CategoryId;
use shopfloor_core::slug::slugify;
use shopfloor_core::validation::clean_optional;

use super::{RepositoryError, SlugTable, free_slug};
use crate::models::{Category, CreateCategory, UpdateCategory};

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, parent_id, sort_order, is_active, created_at, updated_at";

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active categories, optionally only the direct children of `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        parent_id: Option<CategoryId>,
    ) -> Result<Vec<Category>, RepositoryError> {
        let categories = match parent_id {
            Some(parent_id) => {
                sqlx::query_as::<_, Category>(&format!(
                    "SELECT {CATEGORY_COLUMNS} FROM catalog.category \
                     WHERE is_active AND parent_id = $1 ORDER BY sort_order, name"
                ))
                .bind(parent_id)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Category>(&format!(
                    "SELECT {CATEGORY_COLUMNS} FROM catalog.category \
                     WHERE is_active ORDER BY sort_order, name"
                ))
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(categories)
    }

    /// Get an active category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM catalog.category WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(category)
    }

    /// Create a category.
    ///
    /// Without an explicit slug one is derived from the name and suffixed
    /// until it is free.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the explicit slug is taken or
    /// the parent does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &CreateCategory) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = input.parent_id {
            ensure_active(&mut *tx, parent_id).await?;
        }

        let slug = match &input.slug {
            Some(slug) => explicit_slug(slug)?,
            None => {
                let base = slugify(&input.name)
                    .map_err(|e| RepositoryError::Conflict(format!("name: {e}")))?;
                free_slug(&mut *tx, SlugTable::Category, &base).await?
            }
        };

        let category = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO catalog.category (name, slug, description, parent_id, sort_order) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(&slug)
        .bind(clean_optional(input.description.clone()))
        .bind(input.parent_id)
        .bind(input.sort_order)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category slug already exists"))?;

        tx.commit().await?;
        Ok(category)
    }

    /// Apply a partial update.
    ///
    /// The slug only changes when one is passed explicitly. Moving a category
    /// under itself or one of its descendants is rejected.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category is missing or inactive.
    /// Returns `RepositoryError::Conflict` for slug clashes, unknown parents and cycles.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &UpdateCategory,
    ) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM catalog.category \
             WHERE id = $1 AND is_active FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let parent_id = match input.parent_id {
            Some(Some(parent_id)) => {
                ensure_active(&mut *tx, parent_id).await?;
                if is_ancestor_or_self(&mut *tx, id, parent_id).await? {
                    return Err(RepositoryError::Conflict(
                        "a category cannot be moved under itself or its descendants".to_owned(),
                    ));
                }
                Some(parent_id)
            }
            Some(None) => None,
            None => current.parent_id,
        };

        let slug = match &input.slug {
            Some(slug) => explicit_slug(slug)?,
            None => current.slug,
        };
        let name = input
            .name
            .as_deref()
            .map_or(current.name, |n| n.trim().to_owned());
        let description = match &input.description {
            Some(description) => clean_optional(description.clone()),
            None => current.description,
        };

        let category = sqlx::query_as::<_, Category>(&format!(
            "UPDATE catalog.category \
             SET name = $2, slug = $3, description = $4, parent_id = $5, sort_order = $6, \
                 updated_at = now() \
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(parent_id)
        .bind(input.sort_order.unwrap_or(current.sort_order))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category slug already exists"))?;

        tx.commit().await?;
        Ok(category)
    }

    /// Soft delete a category.
    ///
    /// Active children are re-attached to the deleted category's parent so the
    /// hierarchy stays connected.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category is missing or already inactive.
    pub async fn soft_delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let parent_id: Option<Option<CategoryId>> = sqlx::query_scalar(
            "UPDATE catalog.category SET is_active = FALSE, updated_at = now() \
             WHERE id = $1 AND is_active RETURNING parent_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let parent_id = parent_id.ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            "UPDATE catalog.category SET parent_id = $2, updated_at = now() \
             WHERE parent_id = $1 AND is_active",
        )
        .bind(id)
        .bind(parent_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Fail with `Conflict` unless `id` names an active category.
pub(crate) async fn ensure_active(
    conn: &mut PgConnection,
    id: CategoryId,
) -> Result<(), RepositoryError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM catalog.category WHERE id = $1 AND is_active)",
    )
    .bind(id)
    .fetch_one(conn)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(RepositoryError::Conflict(format!("category {id} does not exist")))
    }
}

/// Whether `id` is `candidate` or one of its ancestors.
async fn is_ancestor_or_self(
    conn: &mut PgConnection,
    id: CategoryId,
    candidate: CategoryId,
) -> Result<bool, RepositoryError> {
    // UNION (not UNION ALL) stops the walk if the stored data already loops.
    let found: bool = sqlx::query_scalar(
        "WITH RECURSIVE ancestors (id, parent_id) AS ( \
             SELECT id, parent_id FROM catalog.category WHERE id = $1 \
             UNION \
             SELECT c.id, c.parent_id FROM catalog.category c \
             JOIN ancestors a ON c.id = a.parent_id \
         ) \
         SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)",
    )
    .bind(candidate)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(found)
}

/// Normalise a caller-supplied slug.
pub(crate) fn explicit_slug(slug: &str) -> Result<String, RepositoryError> {
    slugify(slug).map_err(|e| RepositoryError::Conflict(format!("slug: {e}")))
}
