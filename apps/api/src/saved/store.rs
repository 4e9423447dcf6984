use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::cache::{cached_json, revalidate_tag, user_tag, TagCache};
use crate::errors::StoreError;
use crate::models::job::JOB_LISTING_COLUMNS;
use crate::models::saved_job::SavedJobRow;
use crate::search::listing::Listing;

/// Cache tag for one user's saved jobs.
pub const SAVED_JOBS_TAG: &str = "saved_job";

/// A listing on a user's saved list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub saved_at: DateTime<Utc>,
    /// The user has applied to this posting.
    pub applied: bool,
}

impl From<SavedJobRow> for SavedListing {
    fn from(row: SavedJobRow) -> Self {
        Self {
            listing: row.listing.into(),
            saved_at: row.saved_at,
            applied: row.applied,
        }
    }
}

#[async_trait]
pub trait SavedJobStore: Send + Sync {
    /// Most recently saved first.
    async fn list_saved(&self, user_id: Uuid) -> Result<Vec<SavedListing>, StoreError>;

    async fn is_saved(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, StoreError>;

    /// Idempotent. Fails with `NotFound` when the posting does not exist.
    async fn save(&self, user_id: Uuid, job_id: Uuid) -> Result<(), StoreError>;

    /// Idempotent.
    async fn remove(&self, user_id: Uuid, job_id: Uuid) -> Result<(), StoreError>;
}

pub struct PgSavedJobStore {
    db: PgPool,
}

impl PgSavedJobStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SavedJobStore for PgSavedJobStore {
    async fn list_saved(&self, user_id: Uuid) -> Result<Vec<SavedListing>, StoreError> {
        let query = format!(
            "SELECT {JOB_LISTING_COLUMNS},
                    s.created_at AS saved_at,
                    EXISTS (
                        SELECT 1 FROM applications a
                        WHERE a.user_id = s.user_id AND a.job_id = j.id
                    ) AS applied
             FROM saved_jobs s
             JOIN job_posting j ON j.id = s.job_id
             LEFT JOIN company c ON c.id = j.company_id
             WHERE s.user_id = $1
             ORDER BY s.created_at DESC"
        );
        let rows: Vec<SavedJobRow> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(SavedListing::from).collect())
    }

    async fn is_saved(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, StoreError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM saved_jobs WHERE user_id = $1 AND job_id = $2)",
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_one(&self.db)
        .await?)
    }

    async fn save(&self, user_id: Uuid, job_id: Uuid) -> Result<(), StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM job_posting WHERE id = $1)")
                .bind(job_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(StoreError::NotFound(format!("Job {job_id}")));
        }

        sqlx::query(
            "INSERT INTO saved_jobs (user_id, job_id) VALUES ($1, $2)
             ON CONFLICT (user_id, job_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(job_id)
        .execute(&self.db)
        .await?;

        info!("User {user_id} saved job {job_id}");
        Ok(())
    }

    async fn remove(&self, user_id: Uuid, job_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM saved_jobs WHERE user_id = $1 AND job_id = $2")
            .bind(user_id)
            .bind(job_id)
            .execute(&self.db)
            .await?;

        info!("User {user_id} removed saved job {job_id}");
        Ok(())
    }
}

/// Caches each user's saved list under `user:<id>-saved_job` and drops that
/// tag whenever the user saves or removes a job.
pub struct CachedSavedJobStore {
    inner: Arc<dyn SavedJobStore>,
    cache: Arc<dyn TagCache>,
    ttl: Duration,
}

impl CachedSavedJobStore {
    pub fn new(inner: Arc<dyn SavedJobStore>, cache: Arc<dyn TagCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl SavedJobStore for CachedSavedJobStore {
    async fn list_saved(&self, user_id: Uuid) -> Result<Vec<SavedListing>, StoreError> {
        cached_json(
            self.cache.as_ref(),
            &user_tag(user_id, SAVED_JOBS_TAG),
            self.ttl,
            || self.inner.list_saved(user_id),
        )
        .await
    }

    async fn is_saved(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, StoreError> {
        self.inner.is_saved(user_id, job_id).await
    }

    async fn save(&self, user_id: Uuid, job_id: Uuid) -> Result<(), StoreError> {
        self.inner.save(user_id, job_id).await?;
        revalidate_tag(self.cache.as_ref(), &user_tag(user_id, SAVED_JOBS_TAG)).await;
        Ok(())
    }

    async fn remove(&self, user_id: Uuid, job_id: Uuid) -> Result<(), StoreError> {
        self.inner.remove(user_id, job_id).await?;
        revalidate_tag(self.cache.as_ref(), &user_tag(user_id, SAVED_JOBS_TAG)).await;
        Ok(())
    }
}
