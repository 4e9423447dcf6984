use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::search::listing::Listing;
use crate::search::query_string::from_query_string;
use crate::search::state::SearchState;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub total: usize,
    pub results: Vec<Listing>,
    /// Canonical form of the request's search parameters, for shareable links.
    pub query_string: String,
}

/// GET /api/v1/jobs/search
///
/// Accepts `q, industry, exp, salary, location, sort`; list parameters repeat.
/// Unknown or malformed parameters are ignored.
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<SearchResponse>, AppError> {
    let params = from_query_string(raw.as_deref().unwrap_or_default());
    let listings = state.listings.all_listings().await?;

    let mut search = SearchState::new(Arc::new(listings));
    search.set_query(&params.query);
    search.set_criteria(params.criteria);
    search.set_sort(params.sort);

    let results = search.results().to_vec();
    Ok(Json(SearchResponse {
        total: results.len(),
        results,
        query_string: search.query_string(),
    }))
}
