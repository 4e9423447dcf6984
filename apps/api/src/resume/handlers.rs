use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::resume::draft::{Attachment, Photo, ResumeDraft, ResumePatch};
use crate::resume::engine::DraftView;
use crate::resume::session::spawn_session;
use crate::state::AppState;

/// Longest resume title accepted by the rename endpoint.
const MAX_TITLE_CHARS: usize = 100;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct OpenDraftRequest {
    pub user_id: Uuid,
    /// Continue editing an existing resume instead of starting from scratch.
    pub resume_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct OpenDraftResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub view: DraftView,
}

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub draft: ResumeDraft,
}

impl From<ResumeRow> for ResumeResponse {
    fn from(row: ResumeRow) -> Self {
        Self {
            draft: ResumeDraft::from_record(&row),
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Draft sessions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/drafts
pub async fn handle_open_draft(
    State(state): State<AppState>,
    Json(req): Json<OpenDraftRequest>,
) -> Result<(StatusCode, Json<OpenDraftResponse>), AppError> {
    let initial = match req.resume_id {
        Some(id) => {
            let row = state.resumes.get(id).await?;
            if row.user_id != req.user_id {
                return Err(AppError::NotFound(format!("Resume {id}")));
            }
            ResumeDraft::from_record(&row)
        }
        None => ResumeDraft::empty(),
    };

    let handle = spawn_session(
        req.user_id,
        initial,
        req.resume_id,
        state.draft_timings,
        state.resumes.clone(),
    );
    let session_id = handle.session_id();
    let view = handle.view().await?;
    state.drafts.insert(handle).await;

    Ok((
        StatusCode::CREATED,
        Json(OpenDraftResponse { session_id, view }),
    ))
}

/// GET /api/v1/drafts/:session_id
pub async fn handle_get_draft(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let handle = state.drafts.get(session_id).await?;
    Ok(Json(handle.view().await?))
}

/// PATCH /api/v1/drafts/:session_id
pub async fn handle_edit_draft(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(patch): Json<ResumePatch>,
) -> Result<Json<DraftView>, AppError> {
    let handle = state.drafts.get(session_id).await?;
    handle.edit(patch).await?;
    Ok(Json(handle.view().await?))
}

/// POST /api/v1/drafts/:session_id/photo
///
/// Multipart form with a single `photo` file field. The photo becomes part of
/// the draft like any other edit and is uploaded with the next save.
pub async fn handle_upload_photo(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<DraftView>, AppError> {
    let handle = state.drafts.get(session_id).await?;

    let mut attachment = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("photo") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("photo").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read photo: {e}")))?;
        attachment = Some(Attachment {
            file_name,
            content_type,
            size: data.len() as u64,
            data,
        });
    }

    let attachment =
        attachment.ok_or_else(|| AppError::Validation("Missing 'photo' field".to_string()))?;
    info!(
        "Draft {session_id} received photo '{}' ({} bytes, {})",
        attachment.file_name, attachment.size, attachment.content_type
    );

    handle.edit(ResumePatch::photo(Photo::Pending(attachment))).await?;
    Ok(Json(handle.view().await?))
}

/// DELETE /api/v1/drafts/:session_id
pub async fn handle_close_draft(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let handle = state.drafts.remove(session_id).await?;
    Ok(Json(handle.close().await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Stored resumes
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ResumeResponse>>, AppError> {
    let rows = state.resumes.list_for_user(params.user_id).await?;
    Ok(Json(rows.into_iter().map(ResumeResponse::from).collect()))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeResponse>, AppError> {
    Ok(Json(state.resumes.get(id).await?.into()))
}

/// POST /api/v1/resumes/:id/duplicate
pub async fn handle_duplicate_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ResumeResponse>), AppError> {
    let copy = state.resumes.duplicate(id).await?;
    info!("Duplicated resume {id} as {}", copy.id);
    Ok((StatusCode::CREATED, Json(copy.into())))
}

/// PATCH /api/v1/resumes/:id/title
pub async fn handle_rename_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<ResumeResponse>, AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(Json(state.resumes.rename(id, title).await?.into()))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.resumes.delete(id).await?;
    info!("Deleted resume {id}");
    Ok(StatusCode::NO_CONTENT)
}
