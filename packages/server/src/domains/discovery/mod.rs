pub mod filters;
pub mod query;
pub mod ranking;
pub mod views;

// Re-export the filter engine and read surfaces
pub use filters::{AttrPredicate, AttributeFilter, FilterError, ListingFilter, ListingQueryParams};
pub use query::search_listings;
pub use ranking::tokenize_search;
pub use views::{facets, new_in_city, similar, trending, FacetBucket, Facets};
