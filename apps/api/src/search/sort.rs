use std::cmp::Reverse;

use serde::Serialize;

use crate::search::listing::Listing;
use crate::search::salary::first_number;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Relevance,
    /// Most recently posted first.
    Newest,
    /// Highest salary first.
    Salary,
    /// Soonest expiry first.
    Expiring,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(SortKey::Relevance),
            "newest" => Some(SortKey::Newest),
            "salary" => Some(SortKey::Salary),
            "expiring" => Some(SortKey::Expiring),
            _ => None,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            SortKey::Relevance => "relevance",
            SortKey::Newest => "newest",
            SortKey::Salary => "salary",
            SortKey::Expiring => "expiring",
        }
    }
}

/// Returns a new, stably sorted copy of `listings`.
///
/// Listings whose sort field is missing or unparseable (no salary number, no
/// expiry date) always go last. Relevance without a query keeps input order.
pub fn sort_listings(listings: &[Listing], key: SortKey, query: &str) -> Vec<Listing> {
    let mut sorted = listings.to_vec();

    match key {
        SortKey::Relevance => {
            let query = query.trim().to_lowercase();
            if !query.is_empty() {
                sorted.sort_by_cached_key(|listing| relevance_rank(listing, &query));
            }
        }
        SortKey::Newest => sorted.sort_by_key(|listing| Reverse(listing.created_at)),
        SortKey::Salary => sorted.sort_by_cached_key(|listing| {
            let salary = listing.salary.as_deref().and_then(first_number);
            (salary.is_none(), Reverse(salary))
        }),
        SortKey::Expiring => {
            sorted.sort_by_key(|listing| (listing.expires_at.is_none(), listing.expires_at))
        }
    }

    sorted
}

/// Lower ranks sort first. Each position is `false` when the listing matches
/// that tier, so an exact title match beats a partial one, which beats a skill
/// match, then industry, then company or location.
fn relevance_rank(listing: &Listing, query: &str) -> [bool; 5] {
    let title = listing.title.to_lowercase();
    let skill = listing
        .skills_required
        .iter()
        .any(|skill| skill.to_lowercase().contains(query));
    let industry = listing
        .industry
        .as_deref()
        .is_some_and(|industry| industry.to_lowercase().contains(query));
    let elsewhere = listing.organization.to_lowercase().contains(query)
        || listing.location.to_lowercase().contains(query);

    [
        title != query,
        !title.contains(query),
        !skill,
        !industry,
        !elsewhere,
    ]
}
