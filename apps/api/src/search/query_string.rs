//! Shareable search links.
//!
//! Search state is written to the URL as `q, industry, exp, salary, location, sort`
//! in that order, lists as repeated keys, defaults omitted. Reading is lenient:
//! unknown keys and unparseable values are dropped rather than rejected.

use tracing::debug;

use crate::search::criteria::{ExperienceLevel, FilterCriteria};
use crate::search::salary::SalaryBracket;
use crate::search::sort::SortKey;

/// Everything a search link can carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub criteria: FilterCriteria,
    pub sort: SortKey,
}

impl SearchParams {
    /// Trimmed copy with blank and repeated list values removed.
    pub fn normalized(&self) -> Self {
        let criteria = &self.criteria;
        let mut experience = Vec::new();
        for level in &criteria.experience {
            if !experience.contains(level) {
                experience.push(*level);
            }
        }

        Self {
            query: self.query.trim().to_string(),
            criteria: FilterCriteria {
                industries: distinct(criteria.industries.iter().map(String::as_str)),
                experience,
                salary: criteria.salary,
                locations: distinct(criteria.locations.iter().map(String::as_str)),
            },
            sort: self.sort,
        }
    }
}

/// Serializes the non-default parts of `params`. Equal inputs always give
/// byte-identical output.
pub fn to_query_string(params: &SearchParams) -> String {
    let params = params.normalized();
    let mut pairs: Vec<(&str, String)> = Vec::new();

    if !params.query.is_empty() {
        pairs.push(("q", params.query.clone()));
    }
    for industry in &params.criteria.industries {
        pairs.push(("industry", industry.clone()));
    }
    for level in &params.criteria.experience {
        pairs.push(("exp", level.as_param().to_string()));
    }
    if let Some(salary) = params.criteria.salary {
        pairs.push(("salary", salary.to_string()));
    }
    for location in &params.criteria.locations {
        pairs.push(("location", location.clone()));
    }
    if params.sort != SortKey::Relevance {
        pairs.push(("sort", params.sort.as_param().to_string()));
    }

    serde_urlencoded::to_string(&pairs).unwrap_or_default()
}

/// Reads a query string (with or without the leading `?`). Never fails.
pub fn from_query_string(raw: &str) -> SearchParams {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let pairs: Vec<(String, String)> = match serde_urlencoded::from_str(raw) {
        Ok(pairs) => pairs,
        Err(e) => {
            debug!("Ignoring malformed search query string: {e}");
            return SearchParams::default();
        }
    };

    let mut params = SearchParams::default();
    for (key, value) in pairs {
        let value = value.trim();
        match key.as_str() {
            "q" => params.query = value.to_string(),
            "industry" => params.criteria.industries.push(value.to_string()),
            "exp" => match ExperienceLevel::parse(value) {
                Some(level) => params.criteria.experience.push(level),
                None => debug!("Ignoring unknown experience level '{value}'"),
            },
            "salary" => {
                params.criteria.salary = SalaryBracket::parse(value);
                if params.criteria.salary.is_none() && !value.is_empty() {
                    debug!("Ignoring malformed salary bracket '{value}'");
                }
            }
            "location" => params.criteria.locations.push(value.to_string()),
            "sort" => params.sort = SortKey::parse(value).unwrap_or_default(),
            other => debug!("Ignoring unknown search parameter '{other}'"),
        }
    }

    params.normalized()
}

/// Non-blank values in first-seen order, compared case-insensitively.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut kept = Vec::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        let folded = value.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            kept.push(value.to_string());
        }
    }
    kept
}
