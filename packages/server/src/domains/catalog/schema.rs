//! Effective attribute schema resolution.
//!
//! The effective schema of a category is the inheritance-resolved, ordered
//! list of attribute definitions visible when posting or filtering under it:
//! definitions from the whole ancestor chain, with a child definition
//! overriding a parent definition sharing the same key.

use std::collections::HashMap;

use anyhow::Result;
use sqlx::PgPool;

use crate::common::CategoryId;

use super::models::attribute_definition::AttributeDefinition;
use super::tree::CategoryTree;

/// Resolve the effective definitions from an already-fetched definition set.
///
/// `ancestor_ids` is leaf-to-root (self first), as returned by
/// [`CategoryTree::ancestor_ids_including_self`]. Definitions attached to
/// categories outside the ancestor set sort last and lose every collision.
///
/// Returned definitions are in display order `(sort_order, key)` and contain
/// exactly one definition per key; for a key defined on several ancestors the
/// survivor is the one attached to the nearest ancestor.
pub fn resolve_effective_definitions(
    ancestor_ids: &[CategoryId],
    mut defs: Vec<AttributeDefinition>,
) -> Vec<AttributeDefinition> {
    if ancestor_ids.is_empty() {
        return Vec::new();
    }

    // Root-first precedence: root = 0, the category itself last.
    let pos: HashMap<CategoryId, usize> = ancestor_ids
        .iter()
        .rev()
        .enumerate()
        .map(|(idx, &cid)| (cid, idx))
        .collect();

    let precedence = |d: &AttributeDefinition| pos.get(&d.category_id).copied().unwrap_or(usize::MAX);
    defs.sort_by(|a, b| {
        (precedence(a), a.sort_order, a.key.as_str())
            .cmp(&(precedence(b), b.sort_order, b.key.as_str()))
    });

    // Insert in sorted order so a later (closer to leaf) definition
    // overwrites an earlier one sharing the same key.
    let mut by_key: HashMap<String, AttributeDefinition> = HashMap::new();
    for d in defs {
        by_key.insert(d.key.clone(), d);
    }

    let mut out: Vec<AttributeDefinition> = by_key.into_values().collect();
    out.sort_by(|a, b| {
        (a.sort_order, a.key.as_str()).cmp(&(b.sort_order, b.key.as_str()))
    });
    out
}

/// Compute the effective definitions of a category.
///
/// This is the category-attributes read surface: walk the ancestor chain,
/// fetch the ancestor set's definitions, and fold child-over-parent.
pub async fn effective_definitions(
    category_id: CategoryId,
    tree: &CategoryTree,
    pool: &PgPool,
) -> Result<Vec<AttributeDefinition>> {
    let ancestors = tree.ancestor_ids_including_self(category_id)?;
    let defs = AttributeDefinition::for_categories(&ancestors, pool).await?;
    Ok(resolve_effective_definitions(&ancestors, defs))
}
