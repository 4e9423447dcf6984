use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A job posting left-joined with its company, as selected by the listing source.
/// Enum columns are cast to text in the query.
#[derive(Debug, Clone, FromRow)]
pub struct JobListingRow {
    pub id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub company_display_name: Option<String>,
    pub location: String,
    pub salary: Option<String>,
    pub job_type: String,
    pub industry: Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub experiences: String,
    pub available: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Column list shared by every query that produces a `JobListingRow`.
pub const JOB_LISTING_COLUMNS: &str = r#"
    j.id, j.job_title, j.company_name, c.name AS company_display_name,
    j.location, j.salary, j.job_type::text AS job_type, j.industry,
    j.skills_required, j.experiences, j.available::text AS available,
    j.created_at, j.expires_at
"#;
