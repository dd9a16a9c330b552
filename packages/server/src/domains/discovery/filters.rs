//! Listing query-filter engine.
//!
//! A flat set of named request parameters is parsed into a typed
//! [`ListingFilter`]; all supplied filters compose as a logical AND, layered
//! on top of the visibility policy. Attribute filters resolve against the
//! category's effective schema and enforce a per-type operator whitelist.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::common::{CategoryId, CityId, DefinitionId, GovernorateId, MemberId, NeighborhoodId};
use crate::domains::catalog::models::attribute_definition::{AttributeDefinition, AttributeType};
use crate::domains::catalog::tree::CategoryTreeError;
use crate::domains::listings::attributes::parse_bool_token;

/// Client-input failures while building a filter.
///
/// All are detected during filter construction, before any listing query
/// runs; the whole filter either builds or the request is rejected.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown attribute filter: {0}")]
    UnknownAttribute(String),

    #[error("Attribute is not filterable: {0}")]
    NotFilterable(String),

    #[error("Unsupported operator for {key}: {op}")]
    UnsupportedOperator { key: String, op: String },

    #[error("Invalid integer for {0}")]
    InvalidInteger(String),

    #[error("Invalid decimal for {0}")]
    InvalidDecimal(String),

    #[error("Invalid boolean for {0}")]
    InvalidBoolean(String),

    #[error("Invalid list for {0}")]
    InvalidList(String),

    #[error("{0} cannot be negative")]
    InvalidPriceRange(&'static str),

    #[error("attr_* filters require category to be set")]
    AttributeFilterRequiresCategory,

    #[error("{0} is required")]
    MissingRequiredParameter(&'static str),

    #[error(transparent)]
    CategoryTree(#[from] CategoryTreeError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Flat request parameters for the listing discovery surfaces.
///
/// Identifier parameters arrive already parsed (request decoding is an
/// external collaborator); value parameters stay raw strings because their
/// interpretation is this engine's job.
#[derive(Debug, Clone, Default)]
pub struct ListingQueryParams {
    pub status: Option<String>,
    pub moderation_status: Option<String>,
    pub seller: Option<MemberId>,
    pub category: Option<CategoryId>,
    pub governorate: Option<GovernorateId>,
    pub city: Option<CityId>,
    pub neighborhood: Option<NeighborhoodId>,

    pub price_min: Option<String>,
    pub price_max: Option<String>,
    /// Aliases accepted for the price bounds
    pub price_gte: Option<String>,
    pub price_lte: Option<String>,

    pub is_flagged: Option<String>,
    /// Staff-only, effective only together with `include_removed`
    pub is_removed: Option<String>,
    pub include_removed: Option<String>,

    /// Raw `attr_*` parameters as (name, value), e.g. `("attr_bedrooms__gte", "2")`
    pub attrs: Vec<(String, String)>,

    pub search: Option<String>,
    pub ordering: Option<String>,

    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListingQueryParams {
    pub fn include_removed(&self) -> bool {
        self.include_removed
            .as_deref()
            .map(|raw| matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    /// Non-blank search query, if any
    pub fn search_query(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Whether an explicit ordering was supplied (disables relevance ranking)
    pub fn has_explicit_ordering(&self) -> bool {
        self.ordering
            .as_deref()
            .map(str::trim)
            .is_some_and(|s| !s.is_empty())
    }
}

/// Comparison operators for numeric attribute filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gte,
    Lte,
    Gt,
    Lt,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Gte => ">=",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
        }
    }

    fn parse(op: &str) -> Option<Self> {
        match op {
            "eq" => Some(CmpOp::Eq),
            "gte" => Some(CmpOp::Gte),
            "lte" => Some(CmpOp::Lte),
            "gt" => Some(CmpOp::Gt),
            "lt" => Some(CmpOp::Lt),
            _ => None,
        }
    }
}

/// A typed predicate over one attribute definition's stored value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrPredicate {
    IntCmp { op: CmpOp, value: i64 },
    DecimalCmp { op: CmpOp, value: Decimal },
    BoolEq(bool),
    EnumEq(String),
    EnumIn(Vec<String>),
    TextEq(String),
    TextContains(String),
}

/// One attribute filter: an existence condition against the EAV table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub definition_id: DefinitionId,
    pub predicate: AttrPredicate,
}

/// The fully-typed composite filter, ready for SQL rendering
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub status: Option<String>,
    pub moderation_status: Option<String>,
    pub seller: Option<MemberId>,
    pub governorate: Option<GovernorateId>,
    pub city: Option<CityId>,
    pub neighborhood: Option<NeighborhoodId>,

    /// Subtree-expanded category set (the requested category + descendants)
    pub category_ids: Option<Vec<CategoryId>>,

    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,

    pub is_flagged: Option<bool>,
    /// Staff-only explicit removed filter
    pub is_removed: Option<bool>,

    /// Each term must match title or description (case-insensitive)
    pub search_terms: Vec<String>,

    pub attr_filters: Vec<AttributeFilter>,
}

impl ListingFilter {
    /// Build the typed filter from parsed parameters.
    ///
    /// `subtree_ids` is the expanded category set when a category parameter
    /// was supplied; `effective_defs` is that category's effective schema
    /// (only consulted when `attr_*` parameters are present). `staff`
    /// gates the explicit `is_removed` filter.
    pub fn build(
        params: &ListingQueryParams,
        subtree_ids: Option<Vec<CategoryId>>,
        effective_defs: &[AttributeDefinition],
        staff: bool,
    ) -> Result<Self, FilterError> {
        let mut filter = ListingFilter {
            status: non_blank(&params.status),
            moderation_status: non_blank(&params.moderation_status),
            seller: params.seller,
            governorate: params.governorate,
            city: params.city,
            neighborhood: params.neighborhood,
            category_ids: subtree_ids,
            ..Default::default()
        };

        filter.price_min = parse_price(
            params.price_min.as_deref().or(params.price_gte.as_deref()),
            "price_min",
        )?;
        filter.price_max = parse_price(
            params.price_max.as_deref().or(params.price_lte.as_deref()),
            "price_max",
        )?;

        // Tri-state: unrecognized tokens are ignored, not errors.
        filter.is_flagged = params.is_flagged.as_deref().and_then(tri_state);
        if staff && params.include_removed() {
            filter.is_removed = params.is_removed.as_deref().and_then(tri_state);
        }

        if let Some(query) = params.search_query() {
            filter.search_terms = query.split_whitespace().map(str::to_string).collect();
        }

        if !params.attrs.is_empty() {
            if params.category.is_none() {
                return Err(FilterError::AttributeFilterRequiresCategory);
            }
            let defs_by_key: HashMap<&str, &AttributeDefinition> =
                effective_defs.iter().map(|d| (d.key.as_str(), d)).collect();

            for (name, value) in &params.attrs {
                filter
                    .attr_filters
                    .push(parse_attr_filter(name, value, &defs_by_key)?);
            }
        }

        Ok(filter)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_price(raw: Option<&str>, param: &'static str) -> Result<Option<Decimal>, FilterError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let value: Decimal = raw
        .parse()
        .map_err(|_| FilterError::InvalidDecimal(param.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FilterError::InvalidPriceRange(param));
    }
    Ok(Some(value))
}

fn tri_state(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_attr_filter(
    name: &str,
    value: &str,
    defs_by_key: &HashMap<&str, &AttributeDefinition>,
) -> Result<AttributeFilter, FilterError> {
    let base = name.strip_prefix("attr_").unwrap_or(name);
    let (key, op) = match base.split_once("__") {
        Some((key, op)) => (key, op),
        None => (base, "eq"),
    };

    let def = defs_by_key
        .get(key)
        .ok_or_else(|| FilterError::UnknownAttribute(key.to_string()))?;
    if !def.is_filterable {
        return Err(FilterError::NotFilterable(key.to_string()));
    }

    let unsupported = || FilterError::UnsupportedOperator {
        key: key.to_string(),
        op: op.to_string(),
    };

    let attr_type: AttributeType = def.attr_type().map_err(FilterError::Internal)?;
    let predicate = match attr_type {
        AttributeType::Int => {
            let cmp = CmpOp::parse(op).ok_or_else(unsupported)?;
            let parsed: i64 = value
                .trim()
                .parse()
                .map_err(|_| FilterError::InvalidInteger(key.to_string()))?;
            AttrPredicate::IntCmp {
                op: cmp,
                value: parsed,
            }
        }
        AttributeType::Decimal => {
            let cmp = CmpOp::parse(op).ok_or_else(unsupported)?;
            let parsed: Decimal = value
                .trim()
                .parse()
                .map_err(|_| FilterError::InvalidDecimal(key.to_string()))?;
            AttrPredicate::DecimalCmp {
                op: cmp,
                value: parsed,
            }
        }
        AttributeType::Bool => {
            if op != "eq" {
                return Err(unsupported());
            }
            let parsed = parse_bool_token(value)
                .ok_or_else(|| FilterError::InvalidBoolean(key.to_string()))?;
            AttrPredicate::BoolEq(parsed)
        }
        AttributeType::Enum => match op {
            "eq" => AttrPredicate::EnumEq(value.to_string()),
            "in" => {
                let items: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if items.is_empty() {
                    return Err(FilterError::InvalidList(key.to_string()));
                }
                AttrPredicate::EnumIn(items)
            }
            _ => return Err(unsupported()),
        },
        AttributeType::Text => match op {
            "eq" => AttrPredicate::TextEq(value.to_string()),
            "icontains" => AttrPredicate::TextContains(value.to_string()),
            _ => return Err(unsupported()),
        },
    };

    Ok(AttributeFilter {
        definition_id: def.id,
        predicate,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn def(key: &str, attr_type: AttributeType, filterable: bool) -> AttributeDefinition {
        AttributeDefinition {
            id: DefinitionId::new(),
            category_id: CategoryId::new(),
            key: key.to_string(),
            label_ar: key.to_string(),
            label_en: key.to_string(),
            attr_type: attr_type.to_string(),
            unit: None,
            choices: match attr_type {
                AttributeType::Enum => Some(sqlx::types::Json(vec![
                    "sale".to_string(),
                    "rent".to_string(),
                ])),
                _ => None,
            },
            is_required_in_post: false,
            is_filterable: filterable,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn params_with_attr(name: &str, value: &str) -> ListingQueryParams {
        ListingQueryParams {
            category: Some(CategoryId::new()),
            attrs: vec![(name.to_string(), value.to_string())],
            ..Default::default()
        }
    }

    #[test]
    fn test_attr_filter_requires_category() {
        let params = ListingQueryParams {
            attrs: vec![("attr_bedrooms__gte".to_string(), "2".to_string())],
            ..Default::default()
        };
        let err = ListingFilter::build(&params, None, &[], false).unwrap_err();
        assert!(matches!(err, FilterError::AttributeFilterRequiresCategory));
    }

    #[test]
    fn test_int_attr_filter_with_operator() {
        let defs = vec![def("bedrooms", AttributeType::Int, true)];
        let params = params_with_attr("attr_bedrooms__gte", "2");
        let filter = ListingFilter::build(&params, None, &defs, false).unwrap();

        assert_eq!(filter.attr_filters.len(), 1);
        assert_eq!(
            filter.attr_filters[0].predicate,
            AttrPredicate::IntCmp {
                op: CmpOp::Gte,
                value: 2
            }
        );
    }

    #[test]
    fn test_missing_operator_defaults_to_eq() {
        let defs = vec![def("bedrooms", AttributeType::Int, true)];
        let params = params_with_attr("attr_bedrooms", "3");
        let filter = ListingFilter::build(&params, None, &defs, false).unwrap();
        assert_eq!(
            filter.attr_filters[0].predicate,
            AttrPredicate::IntCmp {
                op: CmpOp::Eq,
                value: 3
            }
        );
    }

    #[test]
    fn test_unknown_attribute_and_not_filterable() {
        let defs = vec![def("serial", AttributeType::Text, false)];

        let err = ListingFilter::build(&params_with_attr("attr_color", "red"), None, &defs, false)
            .unwrap_err();
        assert!(matches!(err, FilterError::UnknownAttribute(key) if key == "color"));

        let err = ListingFilter::build(&params_with_attr("attr_serial", "x1"), None, &defs, false)
            .unwrap_err();
        assert!(matches!(err, FilterError::NotFilterable(key) if key == "serial"));
    }

    #[test]
    fn test_operator_whitelist_per_type() {
        let defs = vec![
            def("bedrooms", AttributeType::Int, true),
            def("furnished", AttributeType::Bool, true),
            def("deal_type", AttributeType::Enum, true),
            def("notes", AttributeType::Text, true),
        ];

        let err =
            ListingFilter::build(&params_with_attr("attr_bedrooms__in", "1,2"), None, &defs, false)
                .unwrap_err();
        assert!(
            matches!(err, FilterError::UnsupportedOperator { ref key, ref op } if key == "bedrooms" && op == "in")
        );

        let err = ListingFilter::build(
            &params_with_attr("attr_furnished__gte", "1"),
            None,
            &defs,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));

        let err = ListingFilter::build(
            &params_with_attr("attr_deal_type__icontains", "sal"),
            None,
            &defs,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));

        let err = ListingFilter::build(
            &params_with_attr("attr_notes__gt", "x"),
            None,
            &defs,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));
    }

    #[test]
    fn test_enum_in_parses_and_rejects_empty_list() {
        let defs = vec![def("deal_type", AttributeType::Enum, true)];

        let filter = ListingFilter::build(
            &params_with_attr("attr_deal_type__in", " sale , rent ,,"),
            None,
            &defs,
            false,
        )
        .unwrap();
        assert_eq!(
            filter.attr_filters[0].predicate,
            AttrPredicate::EnumIn(vec!["sale".to_string(), "rent".to_string()])
        );

        let err = ListingFilter::build(
            &params_with_attr("attr_deal_type__in", " , ,"),
            None,
            &defs,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidList(key) if key == "deal_type"));
    }

    #[test]
    fn test_invalid_operands() {
        let defs = vec![
            def("bedrooms", AttributeType::Int, true),
            def("area", AttributeType::Decimal, true),
            def("furnished", AttributeType::Bool, true),
        ];

        let err = ListingFilter::build(
            &params_with_attr("attr_bedrooms__gte", "two"),
            None,
            &defs,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidInteger(key) if key == "bedrooms"));

        let err = ListingFilter::build(
            &params_with_attr("attr_area__lte", "12,5"),
            None,
            &defs,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidDecimal(key) if key == "area"));

        let err = ListingFilter::build(
            &params_with_attr("attr_furnished", "maybe"),
            None,
            &defs,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidBoolean(key) if key == "furnished"));
    }

    #[test]
    fn test_price_range_aliases_and_validation() {
        let params = ListingQueryParams {
            price_gte: Some("100".to_string()),
            price_lte: Some("250.50".to_string()),
            ..Default::default()
        };
        let filter = ListingFilter::build(&params, None, &[], false).unwrap();
        assert_eq!(filter.price_min, Some("100".parse().unwrap()));
        assert_eq!(filter.price_max, Some("250.50".parse().unwrap()));

        // price_min takes precedence over its alias
        let params = ListingQueryParams {
            price_min: Some("10".to_string()),
            price_gte: Some("20".to_string()),
            ..Default::default()
        };
        let filter = ListingFilter::build(&params, None, &[], false).unwrap();
        assert_eq!(filter.price_min, Some("10".parse().unwrap()));

        let params = ListingQueryParams {
            price_min: Some("-5".to_string()),
            ..Default::default()
        };
        let err = ListingFilter::build(&params, None, &[], false).unwrap_err();
        assert!(matches!(err, FilterError::InvalidPriceRange("price_min")));

        let params = ListingQueryParams {
            price_max: Some("abc".to_string()),
            ..Default::default()
        };
        let err = ListingFilter::build(&params, None, &[], false).unwrap_err();
        assert!(matches!(err, FilterError::InvalidDecimal(key) if key == "price_max"));
    }

    #[test]
    fn test_is_flagged_tri_state() {
        let build = |raw: Option<&str>| {
            let params = ListingQueryParams {
                is_flagged: raw.map(str::to_string),
                ..Default::default()
            };
            ListingFilter::build(&params, None, &[], false).unwrap().is_flagged
        };

        assert_eq!(build(None), None);
        assert_eq!(build(Some("1")), Some(true));
        assert_eq!(build(Some("no")), Some(false));
        // Unrecognized tokens are ignored, not errors.
        assert_eq!(build(Some("banana")), None);
    }

    #[test]
    fn test_is_removed_filter_is_staff_only() {
        let params = ListingQueryParams {
            include_removed: Some("1".to_string()),
            is_removed: Some("true".to_string()),
            ..Default::default()
        };

        let staff = ListingFilter::build(&params, None, &[], true).unwrap();
        assert_eq!(staff.is_removed, Some(true));

        let non_staff = ListingFilter::build(&params, None, &[], false).unwrap();
        assert_eq!(non_staff.is_removed, None);
    }

    #[test]
    fn test_search_terms_split_on_whitespace() {
        let params = ListingQueryParams {
            search: Some("  iPhone 12  ".to_string()),
            ..Default::default()
        };
        let filter = ListingFilter::build(&params, None, &[], false).unwrap();
        assert_eq!(filter.search_terms, vec!["iPhone", "12"]);
    }

    #[test]
    fn test_multiple_attr_filters_compose() {
        let defs = vec![
            def("bedrooms", AttributeType::Int, true),
            def("deal_type", AttributeType::Enum, true),
        ];
        let params = ListingQueryParams {
            category: Some(CategoryId::new()),
            attrs: vec![
                ("attr_bedrooms__gte".to_string(), "2".to_string()),
                ("attr_deal_type".to_string(), "rent".to_string()),
            ],
            ..Default::default()
        };
        let filter = ListingFilter::build(&params, None, &defs, false).unwrap();
        assert_eq!(filter.attr_filters.len(), 2);
    }
}
