use std::sync::Arc;

use crate::resume::session::{DraftRegistry, SessionTimings};
use crate::resume::store::ResumeStore;
use crate::saved::store::SavedJobStore;
use crate::search::source::ListingSource;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once in `main`; collaborators are trait objects so tests can swap them.
#[derive(Clone)]
pub struct AppState {
    pub resumes: Arc<dyn ResumeStore>,
    pub listings: Arc<dyn ListingSource>,
    pub saved_jobs: Arc<dyn SavedJobStore>,
    /// Open resume draft sessions.
    pub drafts: DraftRegistry,
    pub draft_timings: SessionTimings,
}
