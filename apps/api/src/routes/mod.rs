pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::resume::draft::MAX_PHOTO_BYTES;
use crate::resume::handlers as resume;
use crate::saved::handlers as saved;
use crate::search::handlers as search;
use crate::state::AppState;

/// Room for multipart framing around the largest accepted photo.
const PHOTO_UPLOAD_LIMIT: usize = MAX_PHOTO_BYTES as usize + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume drafts (autosave sessions)
        .route("/api/v1/drafts", post(resume::handle_open_draft))
        .route(
            "/api/v1/drafts/:session_id",
            get(resume::handle_get_draft)
                .patch(resume::handle_edit_draft)
                .delete(resume::handle_close_draft),
        )
        .route(
            "/api/v1/drafts/:session_id/photo",
            post(resume::handle_upload_photo).layer(DefaultBodyLimit::max(PHOTO_UPLOAD_LIMIT)),
        )
        // Stored resumes
        .route("/api/v1/resumes", get(resume::handle_list_resumes))
        .route(
            "/api/v1/resumes/:id",
            get(resume::handle_get_resume).delete(resume::handle_delete_resume),
        )
        .route(
            "/api/v1/resumes/:id/duplicate",
            post(resume::handle_duplicate_resume),
        )
        .route("/api/v1/resumes/:id/title", patch(resume::handle_rename_resume))
        // Job search
        .route("/api/v1/jobs/search", get(search::handle_search_jobs))
        // Saved jobs
        .route("/api/v1/saved-jobs", get(saved::handle_list_saved_jobs))
        .route(
            "/api/v1/saved-jobs/:job_id/toggle",
            put(saved::handle_toggle_saved_job),
        )
        .with_state(state)
}
