use std::sync::Arc;

use crate::search::criteria::FilterCriteria;
use crate::search::filter::apply_filters;
use crate::search::listing::Listing;
use crate::search::query_string::{to_query_string, SearchParams};
use crate::search::sort::{sort_listings, SortKey};

/// A search over a fixed listing collection.
///
/// Results are always recomputed from the full collection, never from the
/// previous result, so undoing a change restores exactly what was there before.
/// Recomputation is deferred until results are read.
pub struct SearchState {
    all: Arc<Vec<Listing>>,
    params: SearchParams,
    results: Option<Vec<Listing>>,
}

impl SearchState {
    pub fn new(all: Arc<Vec<Listing>>) -> Self {
        Self {
            all,
            params: SearchParams::default(),
            results: None,
        }
    }

    pub fn set_query(&mut self, query: &str) {
        self.params.query = query.trim().to_string();
        self.results = None;
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.params = SearchParams {
            criteria,
            ..self.params.clone()
        }
        .normalized();
        self.results = None;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.params.sort = sort;
        self.results = None;
    }

    pub fn results(&mut self) -> &[Listing] {
        let params = &self.params;
        let all = &self.all;
        self.results.get_or_insert_with(|| {
            let filtered = apply_filters(all, &params.query, &params.criteria);
            sort_listings(&filtered, params.sort, &params.query)
        })
    }

    pub fn query_string(&self) -> String {
        to_query_string(&self.params)
    }
}
