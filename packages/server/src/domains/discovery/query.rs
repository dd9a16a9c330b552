//! Listing search execution.
//!
//! Renders a [`ListingFilter`] on top of the visibility predicate into one
//! dynamic SQL query, applies the ordering whitelist, and runs the optional
//! in-memory relevance ranking pass over a bounded recency window.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domains::catalog::schema::effective_definitions;
use crate::domains::catalog::tree::CategoryTree;
use crate::domains::listings::models::listing::Listing;
use crate::domains::listings::visibility::{push_visibility_sql, Actor};

use super::filters::{AttrPredicate, FilterError, ListingFilter, ListingQueryParams};
use super::ranking::{rank_by_relevance, tokenize_search};

/// Recency window over which relevance ranking is applied
pub const RANK_WINDOW: i64 = 500;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

/// Resolve page bounds: limit defaults to 50 and clamps to 1..=100,
/// offset floors at 0.
pub fn page_bounds(params: &ListingQueryParams) -> (i64, i64) {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// Map a requested ordering onto the whitelist. Unknown values fall back
/// to the default, newest first.
fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering.map(str::trim) {
        Some("created_at") => "created_at ASC",
        Some("-created_at") => "created_at DESC",
        Some("price") => "price ASC",
        Some("-price") => "price DESC",
        _ => "created_at DESC",
    }
}

/// The query to rank by, when ranking applies: a search query is present,
/// no explicit ordering was requested, and tokenization yields at least one
/// scorable token. A query whose tokens are all too short falls through to
/// the default ordering untouched.
fn ranking_query(params: &ListingQueryParams) -> Option<&str> {
    if params.has_explicit_ordering() {
        return None;
    }
    params
        .search_query()
        .filter(|query| !tokenize_search(query).is_empty())
}

/// Escape LIKE metacharacters so user input matches literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Append the typed filter as AND conditions onto an open WHERE clause.
pub fn push_filter_sql(qb: &mut QueryBuilder<'_, Postgres>, filter: &ListingFilter) {
    if let Some(status) = &filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status.clone());
    }
    if let Some(moderation_status) = &filter.moderation_status {
        qb.push(" AND moderation_status = ");
        qb.push_bind(moderation_status.clone());
    }
    if let Some(seller) = filter.seller {
        qb.push(" AND seller_id = ");
        qb.push_bind(seller);
    }
    if let Some(governorate) = filter.governorate {
        qb.push(" AND governorate_id = ");
        qb.push_bind(governorate);
    }
    if let Some(city) = filter.city {
        qb.push(" AND city_id = ");
        qb.push_bind(city);
    }
    if let Some(neighborhood) = filter.neighborhood {
        qb.push(" AND neighborhood_id = ");
        qb.push_bind(neighborhood);
    }
    if let Some(category_ids) = &filter.category_ids {
        qb.push(" AND category_id = ANY(");
        qb.push_bind(category_ids.clone());
        qb.push(")");
    }
    if let Some(price_min) = filter.price_min {
        qb.push(" AND price >= ");
        qb.push_bind(price_min);
    }
    if let Some(price_max) = filter.price_max {
        qb.push(" AND price <= ");
        qb.push_bind(price_max);
    }
    if let Some(is_flagged) = filter.is_flagged {
        qb.push(" AND is_flagged = ");
        qb.push_bind(is_flagged);
    }
    if let Some(is_removed) = filter.is_removed {
        qb.push(" AND is_removed = ");
        qb.push_bind(is_removed);
    }

    // Every search term must match the title or the description.
    for term in &filter.search_terms {
        let pattern = like_pattern(term);
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR description ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    for attr in &filter.attr_filters {
        qb.push(
            " AND EXISTS (SELECT 1 FROM listing_attribute_values av \
             WHERE av.listing_id = listings.id AND av.definition_id = ",
        );
        qb.push_bind(attr.definition_id);
        match &attr.predicate {
            AttrPredicate::IntCmp { op, value } => {
                qb.push(format!(" AND av.int_value {} ", op.as_sql()));
                qb.push_bind(*value);
            }
            AttrPredicate::DecimalCmp { op, value } => {
                qb.push(format!(" AND av.decimal_value {} ", op.as_sql()));
                qb.push_bind(*value);
            }
            AttrPredicate::BoolEq(value) => {
                qb.push(" AND av.bool_value = ");
                qb.push_bind(*value);
            }
            AttrPredicate::EnumEq(value) => {
                qb.push(" AND av.enum_value = ");
                qb.push_bind(value.clone());
            }
            AttrPredicate::EnumIn(values) => {
                qb.push(" AND av.enum_value = ANY(");
                qb.push_bind(values.clone());
                qb.push(")");
            }
            AttrPredicate::TextEq(value) => {
                qb.push(" AND av.text_value = ");
                qb.push_bind(value.clone());
            }
            AttrPredicate::TextContains(value) => {
                qb.push(" AND av.text_value ILIKE ");
                qb.push_bind(like_pattern(value));
            }
        }
        qb.push(")");
    }
}

/// Resolve the request context and build the typed filter.
///
/// The category tree and effective schema are only loaded when the request
/// actually needs them.
pub(crate) async fn build_filter(
    params: &ListingQueryParams,
    staff: bool,
    pool: &PgPool,
) -> Result<ListingFilter, FilterError> {
    let mut subtree_ids = None;
    let mut effective_defs = Vec::new();

    if let Some(category_id) = params.category {
        let tree = CategoryTree::load(pool).await?;
        subtree_ids = Some(tree.subtree_ids(category_id));
        if !params.attrs.is_empty() {
            effective_defs = effective_definitions(category_id, &tree, pool).await?;
        }
    }

    ListingFilter::build(params, subtree_ids, &effective_defs, staff)
}

/// Run the listing search: visibility, filters, ordering, pagination, and
/// the relevance ranking pass when a search query is present without an
/// explicit ordering.
pub async fn search_listings(
    params: &ListingQueryParams,
    actor: &Actor,
    pool: &PgPool,
) -> Result<Vec<Listing>, FilterError> {
    let filter = build_filter(params, actor.is_staff(), pool).await?;
    let (limit, offset) = page_bounds(params);

    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT * FROM listings WHERE ");
    push_visibility_sql(&mut qb, actor, params.include_removed());
    push_filter_sql(&mut qb, &filter);

    if let Some(query) = ranking_query(params) {
        // Rank a bounded recency window in memory, then page the ranked list.
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(RANK_WINDOW);

        let mut window: Vec<Listing> = qb.build_query_as().fetch_all(pool).await?;
        rank_by_relevance(&mut window, query);

        let start = (offset as usize).min(window.len());
        let end = (start + limit as usize).min(window.len());
        return Ok(window[start..end].to_vec());
    }

    qb.push(" ORDER BY ");
    qb.push(order_clause(params.ordering.as_deref()));
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let listings = qb.build_query_as().fetch_all(pool).await?;
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::common::{CategoryId, CityId, DefinitionId, MemberId};
    use crate::domains::discovery::filters::{AttributeFilter, CmpOp};

    fn sql_for(filter: &ListingFilter) -> String {
        let mut qb = QueryBuilder::new("SELECT * FROM listings WHERE ");
        push_visibility_sql(&mut qb, &Actor::Anonymous, false);
        push_filter_sql(&mut qb, filter);
        qb.sql().to_string()
    }

    #[test]
    fn test_page_bounds_defaults_and_clamps() {
        let mut params = ListingQueryParams::default();
        assert_eq!(page_bounds(&params), (50, 0));

        params.limit = Some(1000);
        params.offset = Some(-3);
        assert_eq!(page_bounds(&params), (100, 0));

        params.limit = Some(0);
        params.offset = Some(20);
        assert_eq!(page_bounds(&params), (1, 20));
    }

    #[test]
    fn test_order_clause_whitelist() {
        assert_eq!(order_clause(None), "created_at DESC");
        assert_eq!(order_clause(Some("created_at")), "created_at ASC");
        assert_eq!(order_clause(Some("-created_at")), "created_at DESC");
        assert_eq!(order_clause(Some("price")), "price ASC");
        assert_eq!(order_clause(Some("-price")), "price DESC");
        // Unknown orderings are ignored.
        assert_eq!(order_clause(Some("title")), "created_at DESC");
        assert_eq!(order_clause(Some("-seller_id")), "created_at DESC");
    }

    #[test]
    fn test_ranking_gate_requires_scorable_tokens() {
        let params = |search: Option<&str>, ordering: Option<&str>| ListingQueryParams {
            search: search.map(str::to_string),
            ordering: ordering.map(str::to_string),
            ..Default::default()
        };

        assert_eq!(
            ranking_query(&params(Some("iPhone 12"), None)),
            Some("iPhone 12")
        );

        // Every token shorter than two characters: default ordering applies.
        assert_eq!(ranking_query(&params(Some("a"), None)), None);
        assert_eq!(ranking_query(&params(Some("a b c"), None)), None);

        // Blank or absent search never ranks.
        assert_eq!(ranking_query(&params(Some("   "), None)), None);
        assert_eq!(ranking_query(&params(None, None)), None);

        // Any explicit ordering disables ranking.
        assert_eq!(ranking_query(&params(Some("iPhone 12"), Some("price"))), None);
        assert_eq!(
            ranking_query(&params(Some("iPhone 12"), Some("-created_at"))),
            None
        );
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off\\now"), "%50\\%\\_off\\\\now%");
        assert_eq!(like_pattern("sofa"), "%sofa%");
    }

    #[test]
    fn test_exact_filters_render_as_and_conditions() {
        let filter = ListingFilter {
            status: Some("published".to_string()),
            seller: Some(MemberId::new()),
            city: Some(CityId::new()),
            ..Default::default()
        };
        let sql = sql_for(&filter);
        assert!(sql.contains(" AND status = "));
        assert!(sql.contains(" AND seller_id = "));
        assert!(sql.contains(" AND city_id = "));
        assert!(!sql.contains(" AND governorate_id = "));
    }

    #[test]
    fn test_category_filter_uses_subtree_array() {
        let filter = ListingFilter {
            category_ids: Some(vec![CategoryId::new(), CategoryId::new()]),
            ..Default::default()
        };
        assert!(sql_for(&filter).contains(" AND category_id = ANY("));
    }

    #[test]
    fn test_price_bounds_render() {
        let filter = ListingFilter {
            price_min: Some(Decimal::from(100)),
            price_max: Some(Decimal::from(500)),
            ..Default::default()
        };
        let sql = sql_for(&filter);
        assert!(sql.contains(" AND price >= "));
        assert!(sql.contains(" AND price <= "));
    }

    #[test]
    fn test_search_terms_restrict_title_or_description() {
        let filter = ListingFilter {
            search_terms: vec!["iPhone".to_string(), "12".to_string()],
            ..Default::default()
        };
        let sql = sql_for(&filter);
        assert_eq!(sql.matches("title ILIKE").count(), 2);
        assert_eq!(sql.matches("OR description ILIKE").count(), 2);
    }

    #[test]
    fn test_attr_filter_renders_exists_subquery() {
        let filter = ListingFilter {
            attr_filters: vec![AttributeFilter {
                definition_id: DefinitionId::new(),
                predicate: AttrPredicate::IntCmp {
                    op: CmpOp::Gte,
                    value: 2,
                },
            }],
            ..Default::default()
        };
        let sql = sql_for(&filter);
        assert!(sql.contains("EXISTS (SELECT 1 FROM listing_attribute_values av"));
        assert!(sql.contains("av.listing_id = listings.id"));
        assert!(sql.contains("av.int_value >= "));
    }

    #[test]
    fn test_attr_predicates_target_their_slot() {
        let pred_sql = |predicate: AttrPredicate| {
            sql_for(&ListingFilter {
                attr_filters: vec![AttributeFilter {
                    definition_id: DefinitionId::new(),
                    predicate,
                }],
                ..Default::default()
            })
        };

        assert!(pred_sql(AttrPredicate::DecimalCmp {
            op: CmpOp::Lt,
            value: Decimal::from(10),
        })
        .contains("av.decimal_value < "));
        assert!(pred_sql(AttrPredicate::BoolEq(true)).contains("av.bool_value = "));
        assert!(pred_sql(AttrPredicate::EnumEq("rent".to_string())).contains("av.enum_value = "));
        assert!(pred_sql(AttrPredicate::EnumIn(vec!["a".to_string()]))
            .contains("av.enum_value = ANY("));
        assert!(pred_sql(AttrPredicate::TextEq("x".to_string())).contains("av.text_value = "));
        assert!(
            pred_sql(AttrPredicate::TextContains("x".to_string())).contains("av.text_value ILIKE ")
        );
    }

    #[test]
    fn test_is_flagged_and_is_removed_render() {
        let filter = ListingFilter {
            is_flagged: Some(true),
            is_removed: Some(false),
            ..Default::default()
        };
        let sql = sql_for(&filter);
        assert!(sql.contains(" AND is_flagged = "));
        assert!(sql.contains(" AND is_removed = "));
    }
}
