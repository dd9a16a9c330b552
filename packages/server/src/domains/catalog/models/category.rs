use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::CategoryId;

/// Category - a node in the marketplace category tree
///
/// Categories form an adjacency-list tree via `parent_id`. They are created
/// administratively, rarely mutated, and never physically deleted while
/// referenced by listings or attribute definitions.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub parent_id: Option<CategoryId>,

    pub name_ar: String,
    pub name_en: String,
    pub slug: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Category {
    /// Find category by ID
    pub async fn find_by_id(id: CategoryId, pool: &PgPool) -> Result<Self> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(category)
    }

    /// Find category by ID, returning None if not found
    pub async fn find_by_id_optional(id: CategoryId, pool: &PgPool) -> Result<Option<Self>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(category)
    }

    /// Load the full category set, ordered by slug.
    ///
    /// The tree is small and admin-managed; discovery loads it once per
    /// request and walks it in memory.
    pub async fn load_all(pool: &PgPool) -> Result<Vec<Self>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY slug")
                .fetch_all(pool)
                .await?;
        Ok(categories)
    }

    /// Create a new category
    pub async fn create(
        parent_id: Option<CategoryId>,
        name_ar: String,
        name_en: String,
        slug: String,
        pool: &PgPool,
    ) -> Result<Self> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, parent_id, name_ar, name_en, slug)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(CategoryId::new())
        .bind(parent_id)
        .bind(name_ar)
        .bind(name_en)
        .bind(slug)
        .fetch_one(pool)
        .await?;
        Ok(category)
    }
}
