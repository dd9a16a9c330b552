pub mod models;
pub mod schema;
pub mod tree;

// Re-export models (domain models)
pub use models::attribute_definition::{AttributeDefinition, AttributeType};
pub use models::category::Category;

// Re-export the tree and schema resolution entry points
pub use schema::{effective_definitions, resolve_effective_definitions};
pub use tree::{CategoryTree, CategoryTreeError};
