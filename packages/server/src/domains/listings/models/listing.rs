use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{CategoryId, CityId, GovernorateId, ListingId, MemberId, NeighborhoodId};

/// Listing - a classified ad posted by a seller
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: ListingId,
    pub seller_id: MemberId,

    // Content
    pub title: String,
    pub description: String,
    pub price: Option<Decimal>,
    pub currency: String,

    // Placement
    pub category_id: CategoryId,
    pub governorate_id: GovernorateId,
    pub city_id: CityId,
    pub neighborhood_id: Option<NeighborhoodId>,

    // Lifecycle
    pub status: String,            // 'draft', 'published', 'archived'
    pub moderation_status: String, // 'pending', 'approved', 'rejected'
    pub is_flagged: bool,
    pub is_removed: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Enums for type-safe status handling
// =============================================================================

/// Listing status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    Published,
    Archived,
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Draft => write!(f, "draft"),
            ListingStatus::Published => write!(f, "published"),
            ListingStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(ListingStatus::Draft),
            "published" => Ok(ListingStatus::Published),
            "archived" => Ok(ListingStatus::Archived),
            _ => Err(anyhow::anyhow!("Invalid listing status: {}", s)),
        }
    }
}

/// Moderation status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModerationStatus::Pending => write!(f, "pending"),
            ModerationStatus::Approved => write!(f, "approved"),
            ModerationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ModerationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid moderation status: {}", s)),
        }
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Listing {
    /// Find listing by ID
    pub async fn find_by_id(id: ListingId, pool: &PgPool) -> Result<Self> {
        let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(listing)
    }

    /// Find listing by ID, returning None if not found
    pub async fn find_by_id_optional(id: ListingId, pool: &PgPool) -> Result<Option<Self>> {
        let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(listing)
    }

    /// Create a new listing (drafts start pending moderation)
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        seller_id: MemberId,
        title: String,
        description: String,
        price: Option<Decimal>,
        currency: String,
        category_id: CategoryId,
        governorate_id: GovernorateId,
        city_id: CityId,
        neighborhood_id: Option<NeighborhoodId>,
        status: ListingStatus,
        pool: &PgPool,
    ) -> Result<Self> {
        let listing = sqlx::query_as::<_, Listing>(
            r#"
            INSERT INTO listings (
                id,
                seller_id,
                title,
                description,
                price,
                currency,
                category_id,
                governorate_id,
                city_id,
                neighborhood_id,
                status,
                moderation_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(ListingId::new())
        .bind(seller_id)
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(currency)
        .bind(category_id)
        .bind(governorate_id)
        .bind(city_id)
        .bind(neighborhood_id)
        .bind(status.to_string())
        .bind(ModerationStatus::Pending.to_string())
        .fetch_one(pool)
        .await?;
        Ok(listing)
    }

    /// Update listing status
    pub async fn update_status(id: ListingId, status: ListingStatus, pool: &PgPool) -> Result<Self> {
        let listing = sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(status.to_string())
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(listing)
    }

    /// Update moderation status
    pub async fn update_moderation_status(
        id: ListingId,
        moderation_status: ModerationStatus,
        pool: &PgPool,
    ) -> Result<Self> {
        let listing = sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings
            SET moderation_status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(moderation_status.to_string())
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(listing)
    }
}
