//! Attribute validation and upsert pipeline.
//!
//! Incoming attribute payloads are validated against the category's
//! effective schema before anything touches storage: either the whole write
//! set is valid or the operation is rejected. A null or all-whitespace value
//! is a delete instruction, not a type error.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use crate::common::ListingId;
use crate::config::PublishQuality;
use crate::domains::catalog::models::attribute_definition::{AttributeDefinition, AttributeType};
use crate::domains::catalog::schema::effective_definitions;
use crate::domains::catalog::tree::CategoryTree;

use super::models::attribute_value::{AttrValue, AttrValueWrite, AttributeValue};
use super::models::listing::{Listing, ListingStatus};

/// Client-input validation failures for listing writes.
///
/// All are detected before storage is touched; none are retried and none are
/// process-fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Invalid integer for {0}")]
    InvalidInteger(String),

    #[error("Invalid decimal for {0}")]
    InvalidDecimal(String),

    #[error("Invalid boolean for {0}")]
    InvalidBoolean(String),

    #[error("Invalid choice for {0}")]
    InvalidEnumChoice(String),

    #[error("Missing required attribute(s): {}", .0.join(", "))]
    MissingRequiredAttributes(Vec<String>),

    #[error("Title is too short (minimum {min} characters)")]
    TitleTooShort { min: usize },

    #[error("Description is too short (minimum {min} characters)")]
    DescriptionTooShort { min: usize },

    #[error("At least {min} image(s) is required")]
    NotEnoughImages { min: u32 },
}

/// Boolean token sets shared by the validator and the filter engine.
pub fn parse_bool_token(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Validate an incoming attribute payload against the effective schema.
///
/// `existing` is the listing's current stored state keyed by definition key
/// (empty on creation); `final_status` is the status the listing will have
/// after this write. The required-attribute check runs against the effective
/// final map (existing overlaid with incoming) and only when the final
/// status is not draft; all violations are collected into a single
/// [`AttributeError::MissingRequiredAttributes`] with keys sorted ascending.
///
/// Returns the validated write set, keyed by definition key.
pub fn validate_attributes(
    defs: &[AttributeDefinition],
    incoming: &HashMap<String, Option<String>>,
    existing: &HashMap<String, AttrValue>,
    final_status: ListingStatus,
) -> Result<BTreeMap<String, AttrValueWrite>, AttributeError> {
    let defs_by_key: HashMap<&str, &AttributeDefinition> =
        defs.iter().map(|d| (d.key.as_str(), d)).collect();

    // Deterministic key order so the first failing key is stable.
    let mut keys: Vec<&String> = incoming.keys().collect();
    keys.sort();

    let mut writes: BTreeMap<String, AttrValueWrite> = BTreeMap::new();
    for key in keys {
        let def = defs_by_key
            .get(key.as_str())
            .ok_or_else(|| AttributeError::UnknownAttribute(key.clone()))?;

        let raw = incoming.get(key).and_then(|v| v.as_deref());
        let write = match raw {
            None => AttrValueWrite::Delete,
            Some(s) if s.trim().is_empty() => AttrValueWrite::Delete,
            Some(s) => AttrValueWrite::Set(coerce_value(def, key, s)?),
        };
        writes.insert(key.clone(), write);
    }

    if final_status != ListingStatus::Draft {
        // Effective final value map: existing overlaid with incoming.
        let mut final_keys: HashMap<&str, ()> =
            existing.keys().map(|k| (k.as_str(), ())).collect();
        for (key, write) in &writes {
            match write {
                AttrValueWrite::Delete => {
                    final_keys.remove(key.as_str());
                }
                AttrValueWrite::Set(_) => {
                    final_keys.insert(key.as_str(), ());
                }
            }
        }

        let mut missing: Vec<String> = defs
            .iter()
            .filter(|d| d.is_required_in_post && !final_keys.contains_key(d.key.as_str()))
            .map(|d| d.key.clone())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(AttributeError::MissingRequiredAttributes(missing));
        }
    }

    Ok(writes)
}

fn coerce_value(
    def: &AttributeDefinition,
    key: &str,
    raw: &str,
) -> Result<AttrValue, AttributeError> {
    let attr_type: AttributeType = def
        .attr_type
        .parse()
        .map_err(|_| AttributeError::UnknownAttribute(key.to_string()))?;

    match attr_type {
        AttributeType::Int => raw
            .trim()
            .parse::<i64>()
            .map(AttrValue::Int)
            .map_err(|_| AttributeError::InvalidInteger(key.to_string())),
        AttributeType::Decimal => raw
            .trim()
            .parse::<Decimal>()
            .map(AttrValue::Decimal)
            .map_err(|_| AttributeError::InvalidDecimal(key.to_string())),
        AttributeType::Bool => parse_bool_token(raw)
            .map(AttrValue::Bool)
            .ok_or_else(|| AttributeError::InvalidBoolean(key.to_string())),
        AttributeType::Enum => {
            let trimmed = raw.trim();
            if def.choices().iter().any(|c| c == trimmed) {
                Ok(AttrValue::Enum(trimmed.to_string()))
            } else {
                Err(AttributeError::InvalidEnumChoice(key.to_string()))
            }
        }
        AttributeType::Text => Ok(AttrValue::Text(raw.to_string())),
    }
}

/// Listing quality gate applied when the final status is published.
///
/// Image handling itself is an external collaborator; the caller passes the
/// stored image count. The thresholds come in as explicit configuration.
pub fn validate_publish_quality(
    title: &str,
    description: &str,
    image_count: u32,
    quality: &PublishQuality,
) -> Result<(), AttributeError> {
    if title.trim().chars().count() < quality.min_title_len {
        return Err(AttributeError::TitleTooShort {
            min: quality.min_title_len,
        });
    }
    if description.trim().chars().count() < quality.min_description_len {
        return Err(AttributeError::DescriptionTooShort {
            min: quality.min_description_len,
        });
    }
    if image_count < quality.min_images {
        return Err(AttributeError::NotEnoughImages {
            min: quality.min_images,
        });
    }
    Ok(())
}

/// Build the validator's `existing` map from stored rows.
pub fn existing_value_map(
    defs: &[AttributeDefinition],
    rows: &[AttributeValue],
) -> HashMap<String, AttrValue> {
    let key_by_definition: HashMap<_, _> = defs.iter().map(|d| (d.id, d.key.as_str())).collect();

    let mut out = HashMap::new();
    for row in rows {
        let Some(key) = key_by_definition.get(&row.definition_id) else {
            continue;
        };
        if let Some(value) = row.value() {
            out.insert(key.to_string(), value);
        }
    }
    out
}

/// Persist a validated write set for one listing.
///
/// Runs inside a single transaction so a listing write is serialized against
/// itself; each set is a unique-constraint upsert, never a global lock.
pub async fn apply_attribute_writes(
    listing_id: ListingId,
    defs: &[AttributeDefinition],
    writes: &BTreeMap<String, AttrValueWrite>,
    pool: &PgPool,
) -> Result<()> {
    let defs_by_key: HashMap<&str, &AttributeDefinition> =
        defs.iter().map(|d| (d.key.as_str(), d)).collect();

    let mut tx = pool.begin().await?;
    for (key, write) in writes {
        // Validation already rejected unknown keys.
        let Some(def) = defs_by_key.get(key.as_str()) else {
            continue;
        };
        AttributeValue::upsert(listing_id, def, write, &mut *tx).await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Full pipeline for a listing write: resolve the effective schema, validate
/// the payload against stored state, then upsert.
pub async fn upsert_listing_attributes(
    listing: &Listing,
    incoming: &HashMap<String, Option<String>>,
    final_status: ListingStatus,
    pool: &PgPool,
) -> Result<()> {
    let tree = CategoryTree::load(pool).await?;
    let defs = effective_definitions(listing.category_id, &tree, pool).await?;

    let rows = AttributeValue::for_listing(listing.id, pool).await?;
    let existing = existing_value_map(&defs, &rows);

    let writes = validate_attributes(&defs, incoming, &existing, final_status)?;
    apply_attribute_writes(listing.id, &defs, &writes, pool).await
}
