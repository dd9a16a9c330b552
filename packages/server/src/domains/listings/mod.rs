pub mod attributes;
pub mod models;
pub mod visibility;

// Re-export models (domain models)
pub use models::attribute_value::{AttrValue, AttrValueWrite, AttributeValue};
pub use models::favorite::ListingFavorite;
pub use models::listing::{Listing, ListingStatus, ModerationStatus};

// Re-export the validation pipeline and visibility policy
pub use attributes::{
    apply_attribute_writes, upsert_listing_attributes, validate_attributes,
    validate_publish_quality, AttributeError,
};
pub use visibility::{is_public, is_visible_to, Actor};
