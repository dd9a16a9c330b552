use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::{CategoryId, DefinitionId};

/// Attribute value type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Int,
    Decimal,
    Text,
    Bool,
    Enum,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeType::Int => write!(f, "int"),
            AttributeType::Decimal => write!(f, "decimal"),
            AttributeType::Text => write!(f, "text"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::Enum => write!(f, "enum"),
        }
    }
}

impl std::str::FromStr for AttributeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int" => Ok(AttributeType::Int),
            "decimal" => Ok(AttributeType::Decimal),
            "text" => Ok(AttributeType::Text),
            "bool" => Ok(AttributeType::Bool),
            "enum" => Ok(AttributeType::Enum),
            _ => Err(anyhow::anyhow!("Invalid attribute type: {}", s)),
        }
    }
}

/// CategoryAttributeDefinition - a typed attribute a category exposes
///
/// Definitions are inherited down the category tree; a child category
/// overrides a parent definition sharing the same `key`. Identity
/// `(category_id, key)` is immutable once values reference it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttributeDefinition {
    pub id: DefinitionId,
    pub category_id: CategoryId,

    pub key: String,
    pub label_ar: String,
    pub label_en: String,

    /// One of: int, decimal, text, bool, enum
    pub attr_type: String,
    pub unit: Option<String>,
    /// Required and non-empty iff `attr_type` is enum
    pub choices: Option<Json<Vec<String>>>,

    pub is_required_in_post: bool,
    pub is_filterable: bool,
    pub sort_order: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttributeDefinition {
    /// Parsed attribute type
    pub fn attr_type(&self) -> Result<AttributeType> {
        self.attr_type.parse()
    }

    /// Allowed choices for enum-typed definitions (empty otherwise)
    pub fn choices(&self) -> &[String] {
        self.choices.as_ref().map(|c| c.0.as_slice()).unwrap_or(&[])
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl AttributeDefinition {
    /// Find definition by ID
    pub async fn find_by_id(id: DefinitionId, pool: &PgPool) -> Result<Self> {
        let def = sqlx::query_as::<_, AttributeDefinition>(
            "SELECT * FROM category_attribute_definitions WHERE id = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(def)
    }

    /// Fetch all definitions attached to any of the given categories.
    ///
    /// Used by the schema resolver with a category's ancestor set.
    pub async fn for_categories(
        category_ids: &[CategoryId],
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let defs = sqlx::query_as::<_, AttributeDefinition>(
            "SELECT * FROM category_attribute_definitions
             WHERE category_id = ANY($1)
             ORDER BY category_id, sort_order, key",
        )
        .bind(category_ids)
        .fetch_all(pool)
        .await?;
        Ok(defs)
    }

    /// Create a new definition
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        category_id: CategoryId,
        key: String,
        label_ar: String,
        label_en: String,
        attr_type: AttributeType,
        unit: Option<String>,
        choices: Option<Vec<String>>,
        is_required_in_post: bool,
        is_filterable: bool,
        sort_order: i32,
        pool: &PgPool,
    ) -> Result<Self> {
        let def = sqlx::query_as::<_, AttributeDefinition>(
            r#"
            INSERT INTO category_attribute_definitions (
                id,
                category_id,
                key,
                label_ar,
                label_en,
                attr_type,
                unit,
                choices,
                is_required_in_post,
                is_filterable,
                sort_order
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(DefinitionId::new())
        .bind(category_id)
        .bind(key)
        .bind(label_ar)
        .bind(label_en)
        .bind(attr_type.to_string())
        .bind(unit)
        .bind(choices.map(Json))
        .bind(is_required_in_post)
        .bind(is_filterable)
        .bind(sort_order)
        .fetch_one(pool)
        .await?;
        Ok(def)
    }
}
