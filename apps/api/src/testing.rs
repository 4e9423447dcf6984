//! In-memory collaborators and fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::cache::{CacheError, TagCache};
use crate::errors::StoreError;
use crate::models::resume::ResumeRow;
use crate::resume::draft::Photo;
use crate::resume::session::{DraftRegistry, SessionTimings};
use crate::resume::store::{ResumeStore, SaveRequest};
use crate::saved::store::{SavedJobStore, SavedListing};
use crate::search::listing::Listing;
use crate::search::source::ListingSource;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Listings
// ────────────────────────────────────────────────────────────────────────────

pub struct ListingBuilder(Listing);

/// A listing with neutral defaults; override only what the test is about.
pub fn listing(title: &str) -> ListingBuilder {
    ListingBuilder(Listing {
        id: Uuid::new_v4(),
        title: title.to_string(),
        organization: "Acme".to_string(),
        location: "Siem Reap".to_string(),
        salary: None,
        job_type: "full-time".to_string(),
        industry: None,
        skills_required: Vec::new(),
        experience: "Not specified".to_string(),
        available: Some("open".to_string()),
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        expires_at: None,
    })
}

impl ListingBuilder {
    pub fn organization(mut self, value: &str) -> Self {
        self.0.organization = value.to_string();
        self
    }

    pub fn location(mut self, value: &str) -> Self {
        self.0.location = value.to_string();
        self
    }

    pub fn industry(mut self, value: &str) -> Self {
        self.0.industry = Some(value.to_string());
        self
    }

    pub fn experience(mut self, value: &str) -> Self {
        self.0.experience = value.to_string();
        self
    }

    pub fn salary(mut self, value: &str) -> Self {
        self.0.salary = Some(value.to_string());
        self
    }

    pub fn skills(mut self, values: &[&str]) -> Self {
        self.0.skills_required = values.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.0.created_at = at;
        self
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.0.expires_at = Some(at);
        self
    }

    pub fn build(self) -> Listing {
        self.0
    }
}

pub struct MemoryListingSource {
    listings: Vec<Listing>,
    loads: AtomicUsize,
}

impl MemoryListingSource {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for MemoryListingSource {
    async fn all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.listings.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cache
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryTagCache {
    entries: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryTagCache {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(redis::RedisError::from((redis::ErrorKind::IoError, "connection refused")).into());
        }
        Ok(())
    }
}

#[async_trait]
impl TagCache for MemoryTagCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn revalidate(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resumes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryResumeStore {
    rows: Mutex<HashMap<Uuid, ResumeRow>>,
    saves: Mutex<Vec<SaveRequest>>,
    latency: Duration,
    failing: AtomicBool,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MemoryResumeStore {
    /// Every `upsert` takes `latency` of (tokio) time.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every save request received, failed ones included.
    pub fn saves(&self) -> Vec<SaveRequest> {
        self.saves.lock().unwrap().clone()
    }

    pub fn max_concurrent_saves(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn insert(&self, row: ResumeRow) {
        self.rows.lock().unwrap().insert(row.id, row);
    }

    fn find(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Resume {id}")))
    }
}

pub fn resume_row(user_id: Uuid, title: &str) -> ResumeRow {
    ResumeRow {
        id: Uuid::new_v4(),
        user_id,
        photo_url: None,
        general_info: json!({ "title": title }),
        personal_info: json!({ "first_name": "Sophea" }),
        work_experiences: json!([]),
        education: json!([]),
        skills: vec!["Excel".to_string()],
        summary: String::new(),
        color: None,
        border: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn upsert(&self, request: SaveRequest) -> Result<ResumeRow, StoreError> {
        self.saves.lock().unwrap().push(request.clone());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("resume store is down".to_string()));
        }

        let existing = match request.record_id {
            Some(id) => {
                let row = self.find(id)?;
                if row.user_id != request.user_id {
                    return Err(StoreError::NotFound(format!("Resume {id}")));
                }
                Some(row)
            }
            None => None,
        };

        let draft = request.draft.normalized();
        let old_photo = existing.as_ref().and_then(|row| row.photo_url.clone());
        let photo_url = match &draft.photo {
            Some(Photo::Pending(attachment)) => Some(format!("memory://photos/{}", attachment.file_name)),
            Some(Photo::Removed) => None,
            Some(Photo::Stored { .. }) | None => old_photo,
        };

        let row = ResumeRow {
            id: existing.as_ref().map_or_else(Uuid::new_v4, |row| row.id),
            user_id: request.user_id,
            photo_url,
            general_info: json!({ "title": draft.title, "description": draft.description }),
            personal_info: json!({
                "first_name": draft.first_name,
                "last_name": draft.last_name,
                "job_title": draft.job_title,
                "city": draft.city,
                "country": draft.country,
                "phone": draft.phone,
                "email": draft.email,
            }),
            work_experiences: json!(draft.work_experience),
            education: json!(draft.education),
            skills: draft.skills.clone(),
            summary: draft.summary.clone().unwrap_or_default(),
            color: draft.color_hex.clone(),
            border: draft.border_style.clone(),
            created_at: existing.as_ref().map_or_else(Utc::now, |row| row.created_at),
            updated_at: Utc::now(),
        };
        self.insert(row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        self.find(id)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResumeRow>, StoreError> {
        let mut rows: Vec<ResumeRow> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn duplicate(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        let copy = ResumeRow {
            id: Uuid::new_v4(),
            ..self.find(id)?
        };
        self.insert(copy.clone());
        Ok(copy)
    }

    async fn rename(&self, id: Uuid, title: &str) -> Result<ResumeRow, StoreError> {
        let mut row = self.find(id)?;
        row.general_info["title"] = json!(title);
        self.insert(row.clone());
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        self.rows
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Resume {id}")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Saved jobs
// ────────────────────────────────────────────────────────────────────────────

pub struct MemorySavedJobStore {
    jobs: Vec<Listing>,
    /// (user, job, applied), most recently saved last.
    saved: Mutex<Vec<(Uuid, Uuid, bool)>>,
    failing_writes: AtomicBool,
    list_calls: AtomicUsize,
}

impl MemorySavedJobStore {
    pub fn new(jobs: Vec<Listing>) -> Self {
        Self {
            jobs,
            saved: Mutex::new(Vec::new()),
            failing_writes: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saved jobs store is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SavedJobStore for MemorySavedJobStore {
    async fn list_saved(&self, user_id: Uuid) -> Result<Vec<SavedListing>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let saved = self.saved.lock().unwrap();
        Ok(saved
            .iter()
            .rev()
            .filter(|(user, _, _)| *user == user_id)
            .filter_map(|(_, job, applied)| {
                let listing = self.jobs.iter().find(|l| l.id == *job)?.clone();
                Some(SavedListing {
                    listing,
                    saved_at: Utc::now(),
                    applied: *applied,
                })
            })
            .collect())
    }

    async fn is_saved(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .saved
            .lock()
            .unwrap()
            .iter()
            .any(|(user, job, _)| *user == user_id && *job == job_id))
    }

    async fn save(&self, user_id: Uuid, job_id: Uuid) -> Result<(), StoreError> {
        self.check_writes()?;
        if !self.jobs.iter().any(|l| l.id == job_id) {
            return Err(StoreError::NotFound(format!("Job {job_id}")));
        }
        let mut saved = self.saved.lock().unwrap();
        if !saved.iter().any(|(u, j, _)| *u == user_id && *j == job_id) {
            saved.push((user_id, job_id, false));
        }
        Ok(())
    }

    async fn remove(&self, user_id: Uuid, job_id: Uuid) -> Result<(), StoreError> {
        self.check_writes()?;
        self.saved
            .lock()
            .unwrap()
            .retain(|(u, j, _)| !(*u == user_id && *j == job_id));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// App state
// ────────────────────────────────────────────────────────────────────────────

pub struct TestApp {
    pub state: AppState,
    pub resumes: Arc<MemoryResumeStore>,
    pub saved_jobs: Arc<MemorySavedJobStore>,
}

/// State wired to in-memory stores over `listings`, with a short debounce.
pub fn test_app(listings: Vec<Listing>) -> TestApp {
    let resumes = Arc::new(MemoryResumeStore::default());
    let saved_jobs = Arc::new(MemorySavedJobStore::new(listings.clone()));
    let state = AppState {
        resumes: resumes.clone(),
        listings: Arc::new(MemoryListingSource::new(listings)),
        saved_jobs: saved_jobs.clone(),
        drafts: DraftRegistry::default(),
        draft_timings: SessionTimings {
            debounce: Duration::from_millis(1500),
            idle_timeout: Duration::from_secs(30 * 60),
        },
    };
    TestApp {
        state,
        resumes,
        saved_jobs,
    }
}
