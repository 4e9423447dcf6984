use tracing::debug;

use crate::search::criteria::FilterCriteria;
use crate::search::listing::Listing;

/// Returns the listings matching the free-text query and every non-empty
/// criteria category, in input order. Never reorders or mutates the input.
pub fn apply_filters(listings: &[Listing], query: &str, criteria: &FilterCriteria) -> Vec<Listing> {
    let query = query.trim().to_lowercase();

    let filtered: Vec<Listing> = listings
        .iter()
        .filter(|listing| matches_query(listing, &query))
        .filter(|listing| matches_industry(listing, &criteria.industries))
        .filter(|listing| matches_experience(listing, criteria))
        .filter(|listing| matches_location(listing, &criteria.locations))
        .filter(|listing| {
            criteria
                .salary
                .map_or(true, |bracket| bracket.matches(listing.salary.as_deref()))
        })
        .cloned()
        .collect();

    debug!(
        "Filtered {} listings down to {} (query '{query}')",
        listings.len(),
        filtered.len()
    );
    filtered
}

/// Leading whole number of an experience text: "3-5 years" → 3, "5+ years" → 5.
pub fn leading_years(text: &str) -> Option<u32> {
    let head = text.split('-').next().unwrap_or_default().trim_start();
    let digits: String = head.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn matches_query(listing: &Listing, query: &str) -> bool {
    query.is_empty()
        || listing.title.to_lowercase().contains(query)
        || listing.organization.to_lowercase().contains(query)
        || listing.location.to_lowercase().contains(query)
}

fn matches_industry(listing: &Listing, industries: &[String]) -> bool {
    if industries.is_empty() {
        return true;
    }
    let Some(industry) = listing.industry.as_deref().map(str::to_lowercase) else {
        return false;
    };
    industries
        .iter()
        .any(|wanted| wanted.to_lowercase() == industry)
}

fn matches_experience(listing: &Listing, criteria: &FilterCriteria) -> bool {
    if criteria.experience.is_empty() {
        return true;
    }
    match leading_years(&listing.experience) {
        Some(years) => criteria.experience.iter().any(|level| level.matches(years)),
        None => false,
    }
}

fn matches_location(listing: &Listing, locations: &[String]) -> bool {
    if locations.is_empty() {
        return true;
    }
    let location = listing.location.to_lowercase();
    let remote = location.contains("remote");

    locations.iter().any(|wanted| match wanted.to_lowercase().as_str() {
        "remote" => remote,
        "on-site" => !remote,
        place => location.contains(place),
    })
}
