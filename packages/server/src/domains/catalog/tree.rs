//! In-memory category tree walks.
//!
//! The category set is small and admin-managed, so discovery loads it once
//! per request and performs ancestor/subtree walks over an adjacency index
//! instead of issuing recursive queries. Walks carry an explicit visited set;
//! a repeated id on the ancestor path is reported as a data-integrity error
//! rather than silently truncating the walk.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::Result;
use sqlx::PgPool;
use thiserror::Error;

use crate::common::CategoryId;

use super::models::category::Category;

/// Category tree integrity errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryTreeError {
    #[error("Category cycle detected at {0}")]
    CycleDetected(CategoryId),
}

/// Adjacency index over the category table: `id -> parent_id` plus the
/// reverse `parent_id -> children` edges for subtree expansion.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    parent: HashMap<CategoryId, Option<CategoryId>>,
    children: HashMap<CategoryId, Vec<CategoryId>>,
}

impl CategoryTree {
    /// Build the tree from already-fetched category records.
    pub fn from_categories(categories: &[Category]) -> Self {
        Self::from_edges(categories.iter().map(|c| (c.id, c.parent_id)))
    }

    /// Build the tree from `(id, parent_id)` edges.
    pub fn from_edges(edges: impl IntoIterator<Item = (CategoryId, Option<CategoryId>)>) -> Self {
        let mut tree = Self::default();
        for (id, parent_id) in edges {
            tree.parent.insert(id, parent_id);
            if let Some(parent_id) = parent_id {
                tree.children.entry(parent_id).or_default().push(id);
            }
        }
        tree
    }

    /// Load the tree from the database.
    pub async fn load(pool: &PgPool) -> Result<Self> {
        let categories = Category::load_all(pool).await?;
        Ok(Self::from_categories(&categories))
    }

    /// Whether the category exists in the tree.
    pub fn contains(&self, id: CategoryId) -> bool {
        self.parent.contains_key(&id)
    }

    /// Walk `self -> parent -> grandparent -> ...`, returning ids in
    /// leaf-to-root order, self first.
    ///
    /// A category is its own first ancestor. No maximum depth is enforced;
    /// a revisited id means the parent relation has a cycle and is returned
    /// as [`CategoryTreeError::CycleDetected`].
    pub fn ancestor_ids_including_self(
        &self,
        id: CategoryId,
    ) -> Result<Vec<CategoryId>, CategoryTreeError> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();

        let mut current = Some(id);
        while let Some(cid) = current {
            if !seen.insert(cid) {
                return Err(CategoryTreeError::CycleDetected(cid));
            }
            out.push(cid);
            current = self.parent.get(&cid).copied().flatten();
        }

        Ok(out)
    }

    /// Expand a category to itself plus all transitive descendants.
    ///
    /// Breadth-first frontier expansion over the `parent_id` edges: a
    /// category included at step N contributes its direct children at step
    /// N+1. The visited set makes termination explicit even on malformed
    /// edges.
    pub fn subtree_ids(&self, root: CategoryId) -> Vec<CategoryId> {
        let mut out = vec![root];
        let mut seen: HashSet<CategoryId> = HashSet::from([root]);
        let mut frontier = VecDeque::from([root]);

        while let Some(cid) = frontier.pop_front() {
            for &child in self.children.get(&cid).map(Vec::as_slice).unwrap_or(&[]) {
                if seen.insert(child) {
                    out.push(child);
                    frontier.push_back(child);
                }
            }
        }

        out
    }
}
