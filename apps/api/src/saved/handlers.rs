use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::saved::optimistic::OptimisticState;
use crate::saved::store::SavedListing;
use crate::saved::toggle::toggle_saved;
use crate::saved::view::SavedJobsView;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SavedJobsParams {
    pub user_id: Uuid,
    pub query: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct SavedJobsResponse {
    pub total: usize,
    pub results: Vec<SavedListing>,
    pub query_string: String,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub job_id: Uuid,
    /// Whether the job is on the saved list after the toggle settled.
    pub saved: bool,
    #[serde(flatten)]
    pub outcome: OptimisticState,
}

/// GET /api/v1/saved-jobs
pub async fn handle_list_saved_jobs(
    State(state): State<AppState>,
    Query(params): Query<SavedJobsParams>,
) -> Result<Json<SavedJobsResponse>, AppError> {
    let view = SavedJobsView::from_params(
        params.query.as_deref(),
        params.date.as_deref(),
        params.status.as_deref(),
    );
    let saved = state.saved_jobs.list_saved(params.user_id).await?;
    let results = view.apply(&saved);

    Ok(Json(SavedJobsResponse {
        total: results.len(),
        results,
        query_string: view.to_query_string(),
    }))
}

/// PUT /api/v1/saved-jobs/:job_id/toggle
///
/// Always 200 once the current state could be read; a failed write is
/// reported as `rolled_back` with the previous value.
pub async fn handle_toggle_saved_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    let update = toggle_saved(state.saved_jobs.as_ref(), req.user_id, job_id).await?;
    Ok(Json(ToggleResponse {
        job_id,
        saved: *update.visible(),
        outcome: update.state().clone(),
    }))
}
