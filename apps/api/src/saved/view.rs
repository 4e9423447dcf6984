//! Filters for the saved-jobs page: title search, posting date order, and
//! applied/not-applied status. Mirrors the search pipeline on a smaller scale.

use std::cmp::Reverse;

use crate::saved::store::SavedListing;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateOrder {
    #[default]
    Newest,
    Oldest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// Saved but not applied to yet.
    New,
    Applied,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedJobsView {
    pub query: String,
    pub date: DateOrder,
    pub status: StatusFilter,
}

impl SavedJobsView {
    /// Builds a view from raw request parameters. Unknown values fall back to
    /// the defaults.
    pub fn from_params(query: Option<&str>, date: Option<&str>, status: Option<&str>) -> Self {
        let date = match date.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => DateOrder::Oldest,
            _ => DateOrder::Newest,
        };
        let status = match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("new") => StatusFilter::New,
            Some("applied") => StatusFilter::Applied,
            _ => StatusFilter::All,
        };
        Self {
            query: query.unwrap_or_default().trim().to_string(),
            date,
            status,
        }
    }

    /// Matching saved jobs ordered by posting date.
    pub fn apply(&self, saved: &[SavedListing]) -> Vec<SavedListing> {
        let query = self.query.to_lowercase();
        let mut visible: Vec<SavedListing> = saved
            .iter()
            .filter(|item| item.listing.title.to_lowercase().contains(&query))
            .filter(|item| match self.status {
                StatusFilter::All => true,
                StatusFilter::New => !item.applied,
                StatusFilter::Applied => item.applied,
            })
            .cloned()
            .collect();

        match self.date {
            DateOrder::Newest => visible.sort_by_key(|item| Reverse(item.listing.created_at)),
            DateOrder::Oldest => visible.sort_by_key(|item| item.listing.created_at),
        }
        visible
    }

    /// `query`, `date`, `status`, each only when not the default.
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        if !self.query.is_empty() {
            pairs.push(("query", self.query.as_str()));
        }
        if self.date == DateOrder::Oldest {
            pairs.push(("date", "oldest"));
        }
        match self.status {
            StatusFilter::All => {}
            StatusFilter::New => pairs.push(("status", "new")),
            StatusFilter::Applied => pairs.push(("status", "applied")),
        }
        serde_urlencoded::to_string(&pairs).unwrap_or_default()
    }
}
