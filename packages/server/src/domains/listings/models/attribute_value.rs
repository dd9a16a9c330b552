use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

use crate::common::{AttributeValueId, DefinitionId, ListingId};
use crate::domains::catalog::models::attribute_definition::{AttributeDefinition, AttributeType};

/// A typed attribute value.
///
/// In memory the value is a sum type; the five nullable columns of the
/// storage row exist only at the persistence boundary, so application code
/// can never express a row with more than one populated slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum AttrValue {
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Bool(bool),
    Enum(String),
}

impl AttrValue {
    /// The attribute type this value belongs to.
    pub fn attr_type(&self) -> AttributeType {
        match self {
            AttrValue::Int(_) => AttributeType::Int,
            AttrValue::Decimal(_) => AttributeType::Decimal,
            AttrValue::Text(_) => AttributeType::Text,
            AttrValue::Bool(_) => AttributeType::Bool,
            AttrValue::Enum(_) => AttributeType::Enum,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Decimal(v) => write!(f, "{}", v),
            AttrValue::Text(v) => write!(f, "{}", v),
            AttrValue::Bool(v) => write!(f, "{}", v),
            AttrValue::Enum(v) => write!(f, "{}", v),
        }
    }
}

/// Outcome of validating one incoming attribute: store a value or clear it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValueWrite {
    Set(AttrValue),
    Delete,
}

/// ListingAttributeValue - one stored EAV row per (listing, definition)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttributeValue {
    pub id: AttributeValueId,
    pub listing_id: ListingId,
    pub definition_id: DefinitionId,

    pub int_value: Option<i64>,
    pub decimal_value: Option<Decimal>,
    pub text_value: Option<String>,
    pub bool_value: Option<bool>,
    pub enum_value: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttributeValue {
    /// Decode the populated typed slot, if any.
    ///
    /// Rows written through [`AttributeValue::upsert`] always have exactly
    /// one populated slot; empty enum/text strings count as unpopulated.
    pub fn value(&self) -> Option<AttrValue> {
        if let Some(v) = self.int_value {
            return Some(AttrValue::Int(v));
        }
        if let Some(v) = self.decimal_value {
            return Some(AttrValue::Decimal(v));
        }
        if let Some(v) = self.bool_value {
            return Some(AttrValue::Bool(v));
        }
        if let Some(v) = self.enum_value.as_deref().filter(|s| !s.is_empty()) {
            return Some(AttrValue::Enum(v.to_string()));
        }
        if let Some(v) = self.text_value.as_deref().filter(|s| !s.is_empty()) {
            return Some(AttrValue::Text(v.to_string()));
        }
        None
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl AttributeValue {
    /// Fetch all stored values for a listing
    pub async fn for_listing(listing_id: ListingId, pool: &PgPool) -> Result<Vec<Self>> {
        let values = sqlx::query_as::<_, AttributeValue>(
            "SELECT * FROM listing_attribute_values WHERE listing_id = $1",
        )
        .bind(listing_id)
        .fetch_all(pool)
        .await?;
        Ok(values)
    }

    /// Find the stored value for one (listing, definition) pair
    pub async fn find(
        listing_id: ListingId,
        definition_id: DefinitionId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let value = sqlx::query_as::<_, AttributeValue>(
            "SELECT * FROM listing_attribute_values
             WHERE listing_id = $1 AND definition_id = $2",
        )
        .bind(listing_id)
        .bind(definition_id)
        .fetch_optional(pool)
        .await?;
        Ok(value)
    }

    /// Upsert one attribute value for a listing.
    ///
    /// Delete clears the row if present (idempotent). Set writes exactly the
    /// slot implied by the value's type and nulls the other four in a single
    /// `ON CONFLICT (listing_id, definition_id)` statement, so concurrent
    /// writes to the same pair cannot interleave partial clears/sets.
    pub async fn upsert(
        listing_id: ListingId,
        definition: &AttributeDefinition,
        write: &AttrValueWrite,
        executor: impl PgExecutor<'_>,
    ) -> Result<()> {
        let value = match write {
            AttrValueWrite::Delete => {
                sqlx::query(
                    "DELETE FROM listing_attribute_values
                     WHERE listing_id = $1 AND definition_id = $2",
                )
                .bind(listing_id)
                .bind(definition.id)
                .execute(executor)
                .await?;
                return Ok(());
            }
            AttrValueWrite::Set(value) => value,
        };

        let mut int_value: Option<i64> = None;
        let mut decimal_value: Option<Decimal> = None;
        let mut text_value: Option<String> = None;
        let mut bool_value: Option<bool> = None;
        let mut enum_value: Option<String> = None;
        match value {
            AttrValue::Int(v) => int_value = Some(*v),
            AttrValue::Decimal(v) => decimal_value = Some(*v),
            AttrValue::Text(v) => text_value = Some(v.clone()),
            AttrValue::Bool(v) => bool_value = Some(*v),
            AttrValue::Enum(v) => enum_value = Some(v.clone()),
        }

        sqlx::query(
            r#"
            INSERT INTO listing_attribute_values (
                id,
                listing_id,
                definition_id,
                int_value,
                decimal_value,
                text_value,
                bool_value,
                enum_value
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (listing_id, definition_id) DO UPDATE SET
                int_value = EXCLUDED.int_value,
                decimal_value = EXCLUDED.decimal_value,
                text_value = EXCLUDED.text_value,
                bool_value = EXCLUDED.bool_value,
                enum_value = EXCLUDED.enum_value,
                updated_at = NOW()
            "#,
        )
        .bind(AttributeValueId::new())
        .bind(listing_id)
        .bind(definition.id)
        .bind(int_value)
        .bind(decimal_value)
        .bind(text_value)
        .bind(bool_value)
        .bind(enum_value)
        .execute(executor)
        .await?;

        Ok(())
    }
}
