//! Discovery read surfaces: facets, trending, new-in-city, similar.
//!
//! Every surface renders the same visibility predicate as the listing
//! search; trending and similar additionally pin the public (anonymous)
//! view because they feed unauthenticated browse screens.

use anyhow::Result;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::common::{CategoryId, CityId, GovernorateId};
use crate::domains::listings::models::listing::Listing;
use crate::domains::listings::visibility::{push_visibility_sql, Actor};

use super::filters::{FilterError, ListingFilter, ListingQueryParams};
use super::query::{build_filter, push_filter_sql};

/// Row cap shared by the trending, new-in-city, and similar strips
pub const VIEW_LIMIT: i64 = 12;

const CATEGORY_FACET_LIMIT: i64 = 30;
const GOVERNORATE_FACET_LIMIT: i64 = 30;
const CITY_FACET_LIMIT: i64 = 50;

/// One facet bucket: a dimension value and its listing count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FacetBucket<I> {
    pub id: I,
    pub count: i64,
}

/// Facet counts over the current result set
#[derive(Debug, Clone, Default, Serialize)]
pub struct Facets {
    pub categories: Vec<FacetBucket<CategoryId>>,
    pub governorates: Vec<FacetBucket<GovernorateId>>,
    pub cities: Vec<FacetBucket<CityId>>,
}

fn facet_query<'a>(
    column: &str,
    limit: i64,
    actor: &Actor,
    include_removed: bool,
    filter: &ListingFilter,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {column} AS id, COUNT(*) AS count FROM listings WHERE "
    ));
    push_visibility_sql(&mut qb, actor, include_removed);
    push_filter_sql(&mut qb, filter);
    qb.push(format!(
        " GROUP BY {column} ORDER BY COUNT(*) DESC, {column} LIMIT "
    ));
    qb.push_bind(limit);
    qb
}

/// Facet counts for the same parameter set as the listing search.
///
/// Search terms participate (facets describe what the user would see);
/// relevance ranking does not, since it cannot change the member set.
pub async fn facets(
    params: &ListingQueryParams,
    actor: &Actor,
    pool: &PgPool,
) -> Result<Facets, FilterError> {
    let filter = build_filter(params, actor.is_staff(), pool).await?;
    let include_removed = params.include_removed();

    let categories = facet_query(
        "category_id",
        CATEGORY_FACET_LIMIT,
        actor,
        include_removed,
        &filter,
    )
    .build_query_as()
    .fetch_all(pool)
    .await?;

    let governorates = facet_query(
        "governorate_id",
        GOVERNORATE_FACET_LIMIT,
        actor,
        include_removed,
        &filter,
    )
    .build_query_as()
    .fetch_all(pool)
    .await?;

    let cities = facet_query("city_id", CITY_FACET_LIMIT, actor, include_removed, &filter)
        .build_query_as()
        .fetch_all(pool)
        .await?;

    Ok(Facets {
        categories,
        governorates,
        cities,
    })
}

fn trending_query<'a>(city_id: Option<CityId>) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT * FROM listings WHERE ");
    push_visibility_sql(&mut qb, &Actor::Anonymous, false);
    if let Some(city_id) = city_id {
        qb.push(" AND city_id = ");
        qb.push_bind(city_id);
    }
    qb.push(
        " ORDER BY (SELECT COUNT(*) FROM listing_favorites f \
         WHERE f.listing_id = listings.id \
         AND f.created_at >= NOW() - INTERVAL '7 days') DESC, \
         created_at DESC LIMIT ",
    );
    qb.push_bind(VIEW_LIMIT);
    qb
}

/// Public listings ordered by favorite volume over the trailing week,
/// newest first among ties, optionally scoped to one city.
pub async fn trending(city_id: Option<CityId>, pool: &PgPool) -> Result<Vec<Listing>> {
    let listings = trending_query(city_id)
        .build_query_as()
        .fetch_all(pool)
        .await?;
    Ok(listings)
}

/// Newest public listings in a city. The city is mandatory here, unlike
/// the search surface where it is one filter among many.
pub async fn new_in_city(
    city_id: Option<CityId>,
    pool: &PgPool,
) -> Result<Vec<Listing>, FilterError> {
    let city_id = city_id.ok_or(FilterError::MissingRequiredParameter("city"))?;

    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT * FROM listings WHERE ");
    push_visibility_sql(&mut qb, &Actor::Anonymous, false);
    qb.push(" AND city_id = ");
    qb.push_bind(city_id);
    qb.push(" ORDER BY created_at DESC LIMIT ");
    qb.push_bind(VIEW_LIMIT);

    let listings = qb.build_query_as().fetch_all(pool).await?;
    Ok(listings)
}

fn similar_query<'a>(listing: &Listing) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT * FROM listings WHERE ");
    push_visibility_sql(&mut qb, &Actor::Anonymous, false);
    qb.push(" AND id <> ");
    qb.push_bind(listing.id);
    qb.push(" AND category_id = ");
    qb.push_bind(listing.category_id);
    qb.push(" AND city_id = ");
    qb.push_bind(listing.city_id);
    qb.push(" ORDER BY created_at DESC LIMIT ");
    qb.push_bind(VIEW_LIMIT);
    qb
}

/// Public listings in the same category and city as the given listing,
/// newest first, excluding the listing itself.
pub async fn similar(listing: &Listing, pool: &PgPool) -> Result<Vec<Listing>> {
    let listings = similar_query(listing)
        .build_query_as()
        .fetch_all(pool)
        .await?;
    Ok(listings)
}
