//! Salary handling for free-text salary fields.
//!
//! Listing salaries are whatever the poster typed ("$50,000 - $70,000",
//! "$90,000+", "Negotiable"). Both the salary filter and the salary sort use the
//! first number found in the text; anything without a number is unparseable.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

static NUMBER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn number_pattern() -> &'static Regex {
    NUMBER_PATTERN.get_or_init(|| Regex::new(r"\d+(?:,\d{3})*").expect("salary pattern is valid"))
}

/// First number in a salary text, thousands separators removed.
pub fn first_number(text: &str) -> Option<u64> {
    let found = number_pattern().find(text)?;
    found.as_str().replace(',', "").parse().ok()
}

/// A salary range selected in the search filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalaryBracket {
    /// `"50000-100000"`, bounds inclusive.
    Between { min: u64, max: u64 },
    /// `"150000+"`
    AtLeast(u64),
    /// A bare `"50000"`.
    AtMost(u64),
}

impl SalaryBracket {
    /// Parses a bracket parameter. Anything malformed yields `None` (no filter).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(min) = raw.strip_suffix('+') {
            return min.trim().parse().ok().map(SalaryBracket::AtLeast);
        }
        match raw.split_once('-') {
            Some((min, max)) => {
                let min: u64 = min.trim().parse().ok()?;
                let max: u64 = max.trim().parse().ok()?;
                (min <= max).then_some(SalaryBracket::Between { min, max })
            }
            None => raw.parse().ok().map(SalaryBracket::AtMost),
        }
    }

    pub fn contains(&self, salary: u64) -> bool {
        match *self {
            SalaryBracket::Between { min, max } => (min..=max).contains(&salary),
            SalaryBracket::AtLeast(min) => salary >= min,
            SalaryBracket::AtMost(max) => salary <= max,
        }
    }

    /// Whether a listing's salary text falls in the bracket. Text without a
    /// number never matches.
    pub fn matches(&self, salary_text: Option<&str>) -> bool {
        salary_text
            .and_then(first_number)
            .is_some_and(|salary| self.contains(salary))
    }
}

/// Same form `parse` accepts, so a bracket survives a query-string round trip.
impl fmt::Display for SalaryBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SalaryBracket::Between { min, max } => write!(f, "{min}-{max}"),
            SalaryBracket::AtLeast(min) => write!(f, "{min}+"),
            SalaryBracket::AtMost(max) => write!(f, "{max}"),
        }
    }
}
