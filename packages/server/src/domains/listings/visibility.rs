//! Listing visibility policy.
//!
//! One predicate decides which actors may see which listings, and every
//! discovery surface (list, facets, trending, new-in-city, similar,
//! favorites) renders the exact same predicate through
//! [`push_visibility_sql`]. Divergence here is the single largest
//! correctness risk in the system, so nothing else is allowed to restate
//! these rules.

use sqlx::{Postgres, QueryBuilder};

use crate::common::MemberId;

use super::models::listing::{Listing, ListingStatus, ModerationStatus};

/// The requesting actor, as supplied by the (external) auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Member(MemberId),
    Staff,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        matches!(self, Actor::Staff)
    }
}

/// A listing is public when it is published, approved, and not removed.
pub fn is_public(listing: &Listing) -> bool {
    listing.status == ListingStatus::Published.to_string()
        && listing.moderation_status == ModerationStatus::Approved.to_string()
        && !listing.is_removed
}

/// Detail-level visibility: staff see everything, sellers always see their
/// own listings, everyone else sees only public listings.
pub fn is_visible_to(listing: &Listing, actor: &Actor) -> bool {
    match actor {
        Actor::Staff => true,
        Actor::Member(member_id) => is_public(listing) || listing.seller_id == *member_id,
        Actor::Anonymous => is_public(listing),
    }
}

/// Render the visibility predicate as the leading WHERE condition of a
/// listing query.
///
/// `include_removed` only has effect for staff, and only on list surfaces:
/// removed listings are hidden by default and staff opt in explicitly.
pub fn push_visibility_sql(
    qb: &mut QueryBuilder<'_, Postgres>,
    actor: &Actor,
    include_removed: bool,
) {
    match actor {
        Actor::Staff => {
            qb.push("TRUE");
        }
        Actor::Member(member_id) => {
            qb.push("((status = 'published' AND moderation_status = 'approved') OR seller_id = ");
            qb.push_bind(*member_id);
            qb.push(")");
        }
        Actor::Anonymous => {
            qb.push("(status = 'published' AND moderation_status = 'approved')");
        }
    }

    if !(include_removed && actor.is_staff()) {
        qb.push(" AND is_removed = FALSE");
    }
}
