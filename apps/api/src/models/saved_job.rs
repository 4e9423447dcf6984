use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::models::job::JobListingRow;

#[derive(Debug, Clone, FromRow)]
pub struct SavedJobRow {
    #[sqlx(flatten)]
    pub listing: JobListingRow,
    pub saved_at: DateTime<Utc>,
    /// True when the same user has an application for this posting.
    pub applied: bool,
}
