use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{FavoriteId, ListingId, MemberId};

/// ListingFavorite - a member bookmarking a listing
///
/// Favorite volume over the trailing week drives the trending surface.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ListingFavorite {
    pub id: FavoriteId,
    pub listing_id: ListingId,
    pub member_id: MemberId,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl ListingFavorite {
    /// Favorite a listing. Duplicate favorites are a no-op.
    pub async fn create(
        listing_id: ListingId,
        member_id: MemberId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let favorite = sqlx::query_as::<_, ListingFavorite>(
            r#"
            INSERT INTO listing_favorites (id, listing_id, member_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (listing_id, member_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(FavoriteId::new())
        .bind(listing_id)
        .bind(member_id)
        .fetch_optional(pool)
        .await?;
        Ok(favorite)
    }

    /// Remove a favorite (idempotent)
    pub async fn delete(listing_id: ListingId, member_id: MemberId, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "DELETE FROM listing_favorites WHERE listing_id = $1 AND member_id = $2",
        )
        .bind(listing_id)
        .bind(member_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Listings favorited by a member, most recent first
    pub async fn listing_ids_for_member(
        member_id: MemberId,
        pool: &PgPool,
    ) -> Result<Vec<ListingId>> {
        let rows: Vec<(ListingId,)> = sqlx::query_as(
            "SELECT listing_id FROM listing_favorites
             WHERE member_id = $1
             ORDER BY created_at DESC",
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
