//! Where the search pipeline gets its listings from.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::cache::{cached_json, global_tag, TagCache};
use crate::errors::StoreError;
use crate::models::job::{JobListingRow, JOB_LISTING_COLUMNS};
use crate::search::listing::Listing;

/// Cache tag for the full listing collection.
pub const LISTINGS_TAG: &str = "job";

#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Every listing visible to searchers, newest first.
    async fn all_listings(&self) -> Result<Vec<Listing>, StoreError>;
}

pub struct PgListingSource {
    db: PgPool,
}

impl PgListingSource {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ListingSource for PgListingSource {
    async fn all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        let query = format!(
            "SELECT {JOB_LISTING_COLUMNS}
             FROM job_posting j
             LEFT JOIN company c ON c.id = j.company_id
             ORDER BY j.created_at DESC, j.id"
        );
        let rows: Vec<JobListingRow> = sqlx::query_as(&query).fetch_all(&self.db).await?;
        info!("Loaded {} job listings", rows.len());
        Ok(rows.into_iter().map(Listing::from).collect())
    }
}

/// Serves the listing collection from the tag cache, loading it from `inner`
/// on a miss.
pub struct CachedListingSource {
    inner: Arc<dyn ListingSource>,
    cache: Arc<dyn TagCache>,
    ttl: Duration,
}

impl CachedListingSource {
    pub fn new(inner: Arc<dyn ListingSource>, cache: Arc<dyn TagCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl ListingSource for CachedListingSource {
    async fn all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        cached_json(
            self.cache.as_ref(),
            &global_tag(LISTINGS_TAG),
            self.ttl,
            || self.inner.all_listings(),
        )
        .await
    }
}
