use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted resume. The JSON columns are kept loose and mapped back into a
/// typed draft by `ResumeDraft::from_record`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_url: Option<String>,
    pub general_info: Value,
    pub personal_info: Value,
    pub work_experiences: Value,
    pub education: Value,
    pub skills: Vec<String>,
    pub summary: String,
    pub color: Option<String>,
    pub border: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
