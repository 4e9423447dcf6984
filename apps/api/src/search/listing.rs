use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobListingRow;

/// A job posting as the search pipeline sees it. Never mutated by filtering or sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    /// Company name from the joined company row, else the posting's own text.
    pub organization: String,
    pub location: String,
    /// Free text, e.g. "$50,000 - $70,000" or "$90,000+".
    pub salary: Option<String>,
    pub job_type: String,
    pub industry: Option<String>,
    pub skills_required: Vec<String>,
    /// Free text, e.g. "3-5 years".
    pub experience: String,
    pub available: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<JobListingRow> for Listing {
    fn from(row: JobListingRow) -> Self {
        let organization = row
            .company_display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(row.company_name);

        Self {
            id: row.id,
            title: row.job_title,
            organization,
            location: row.location,
            salary: row.salary,
            job_type: row.job_type,
            industry: row.industry,
            skills_required: row.skills_required.unwrap_or_default(),
            experience: row.experiences,
            available: row.available,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}
