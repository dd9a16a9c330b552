//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;

use server_core::common::{CategoryId, CityId, GovernorateId, MemberId};
use server_core::domains::catalog::{AttributeDefinition, AttributeType, Category};
use server_core::domains::listings::{Listing, ListingStatus};

/// Create a root category with a unique slug
pub async fn create_test_category(pool: &PgPool) -> Result<Category> {
    Category::create(
        None,
        "عقارات".to_string(),
        "Real Estate".to_string(),
        format!("real-estate-{}", CategoryId::new()),
        pool,
    )
    .await
}

/// Create an attribute definition on a category.
///
/// Enum definitions get the choices {sale, rent}.
pub async fn create_test_definition(
    category_id: CategoryId,
    key: &str,
    attr_type: AttributeType,
    pool: &PgPool,
) -> Result<AttributeDefinition> {
    let choices = match attr_type {
        AttributeType::Enum => Some(vec!["sale".to_string(), "rent".to_string()]),
        _ => None,
    };

    AttributeDefinition::create(
        category_id,
        key.to_string(),
        key.to_string(),
        key.to_string(),
        attr_type,
        None,  // unit
        choices,
        false, // is_required_in_post
        true,  // is_filterable
        0,     // sort_order
        pool,
    )
    .await
}

/// Create a draft listing under a category
pub async fn create_test_listing(category_id: CategoryId, pool: &PgPool) -> Result<Listing> {
    Listing::create(
        MemberId::new(),
        "iPhone 12 like new".to_string(),
        "Lightly used, box included".to_string(),
        Some(Decimal::from(150)),
        "SYP".to_string(),
        category_id,
        GovernorateId::new(),
        CityId::new(),
        None, // neighborhood_id
        ListingStatus::Draft,
        pool,
    )
    .await
}
