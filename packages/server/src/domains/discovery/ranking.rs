//! Relevance ranking for text search.
//!
//! Ranking is additive keyword scoring over title and description, applied
//! in memory to a bounded recency window. It only runs when a search query
//! is present and the caller did not ask for an explicit ordering.

use lazy_static::lazy_static;
use regex::Regex;

use crate::domains::listings::models::listing::Listing;

/// Maximum number of search tokens considered for scoring
pub const MAX_SEARCH_TOKENS: usize = 10;

/// Whole-phrase match in the title
const SCORE_TITLE_PHRASE: i64 = 8;
/// Whole-phrase match in the description
const SCORE_DESCRIPTION_PHRASE: i64 = 3;
/// Per-token match in the title
const SCORE_TITLE_TOKEN: i64 = 3;
/// Per-token match in the description
const SCORE_DESCRIPTION_TOKEN: i64 = 1;

lazy_static! {
    // Runs of Latin alphanumerics/underscore or Arabic letters
    static ref TOKEN_RE: Regex = Regex::new(r"[0-9A-Za-z_\u{0600}-\u{06FF}]+").unwrap();
}

/// Extract scoring tokens from a raw search query.
///
/// Tokens shorter than two characters are dropped, duplicates are removed
/// case-insensitively keeping the first occurrence, and at most
/// [`MAX_SEARCH_TOKENS`] tokens survive.
pub fn tokenize_search(query: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut tokens: Vec<String> = Vec::new();

    for m in TOKEN_RE.find_iter(query.trim()) {
        let token = m.as_str();
        if token.chars().count() < 2 {
            continue;
        }
        let lowered = token.to_lowercase();
        if seen.contains(&lowered) {
            continue;
        }
        seen.push(lowered);
        tokens.push(token.to_string());
        if tokens.len() == MAX_SEARCH_TOKENS {
            break;
        }
    }

    tokens
}

/// Additive keyword score for one listing against a query.
///
/// All comparisons are case-insensitive substring containment; the phrase
/// bonus uses the whole trimmed query, tokens contribute independently.
pub fn relevance_score(listing: &Listing, query: &str, tokens: &[String]) -> i64 {
    let title = listing.title.to_lowercase();
    let description = listing.description.to_lowercase();
    let phrase = query.trim().to_lowercase();

    let mut score = 0;
    if !phrase.is_empty() {
        if title.contains(&phrase) {
            score += SCORE_TITLE_PHRASE;
        }
        if description.contains(&phrase) {
            score += SCORE_DESCRIPTION_PHRASE;
        }
    }
    for token in tokens {
        let token = token.to_lowercase();
        if title.contains(&token) {
            score += SCORE_TITLE_TOKEN;
        }
        if description.contains(&token) {
            score += SCORE_DESCRIPTION_TOKEN;
        }
    }
    score
}

/// Order listings by relevance, newest first among equal scores
pub fn rank_by_relevance(listings: &mut Vec<Listing>, query: &str) {
    let tokens = tokenize_search(query);
    listings.sort_by(|a, b| {
        let score_a = relevance_score(a, query, &tokens);
        let score_b = relevance_score(b, query, &tokens);
        score_b
            .cmp(&score_a)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
