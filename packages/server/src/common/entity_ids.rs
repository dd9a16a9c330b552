//! Typed ID definitions for all domain entities.

// Re-export the core Id type and version marker
pub use super::id::{Id, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Category entities.
pub struct Category;

/// Marker type for CategoryAttributeDefinition entities.
pub struct AttributeDefinition;

/// Marker type for ListingAttributeValue entities.
pub struct AttributeValue;

/// Marker type for Listing entities.
pub struct Listing;

/// Marker type for Member entities (sellers and buyers).
pub struct Member;

/// Marker type for Governorate entities.
pub struct Governorate;

/// Marker type for City entities.
pub struct City;

/// Marker type for Neighborhood entities.
pub struct Neighborhood;

/// Marker type for ListingFavorite entities.
pub struct Favorite;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Category entities.
pub type CategoryId = Id<Category>;

/// Typed ID for CategoryAttributeDefinition entities.
pub type DefinitionId = Id<AttributeDefinition>;

/// Typed ID for ListingAttributeValue entities.
pub type AttributeValueId = Id<AttributeValue>;

/// Typed ID for Listing entities.
pub type ListingId = Id<Listing>;

/// Typed ID for Member entities.
pub type MemberId = Id<Member>;

/// Typed ID for Governorate entities.
pub type GovernorateId = Id<Governorate>;

/// Typed ID for City entities.
pub type CityId = Id<City>;

/// Typed ID for Neighborhood entities.
pub type NeighborhoodId = Id<Neighborhood>;

/// Typed ID for ListingFavorite entities.
pub type FavoriteId = Id<Favorite>;
