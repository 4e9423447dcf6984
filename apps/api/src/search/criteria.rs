use serde::Serialize;

use crate::search::salary::SalaryBracket;

/// Experience brackets offered by the search filters, matched against the
/// leading number of a listing's experience text ("3-5 years" → 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExperienceLevel {
    /// "0-2 years"
    Entry,
    /// "3-5 years"
    Mid,
    /// "5+ years"
    Senior,
}

impl ExperienceLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "0-2 years" => Some(ExperienceLevel::Entry),
            "3-5 years" => Some(ExperienceLevel::Mid),
            "5+ years" => Some(ExperienceLevel::Senior),
            _ => None,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "0-2 years",
            ExperienceLevel::Mid => "3-5 years",
            ExperienceLevel::Senior => "5+ years",
        }
    }

    pub fn matches(&self, years: u32) -> bool {
        match self {
            ExperienceLevel::Entry => years < 3,
            ExperienceLevel::Mid => (3..=5).contains(&years),
            ExperienceLevel::Senior => years > 5,
        }
    }
}

/// Active filter selections. Categories combine with AND, values inside a
/// category with OR; an empty category matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub industries: Vec<String>,
    pub experience: Vec<ExperienceLevel>,
    pub salary: Option<SalaryBracket>,
    /// "remote", "on-site", or a place name.
    pub locations: Vec<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.industries.is_empty()
            && self.experience.is_empty()
            && self.salary.is_none()
            && self.locations.is_empty()
    }
}
