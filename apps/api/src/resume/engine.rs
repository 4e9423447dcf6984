//! Decides when a resume draft gets saved.
//!
//! Pure state machine with no timers or I/O of its own: the caller passes the
//! current `Instant` in and performs the store call the engine asks for.
//! `session.rs` drives it from a tokio task.
//!
//! States: `Idle → Editing → PendingSave → Saving → (Idle | Error)`.
//! - An edit always lands in `Editing` and clears `Error`.
//! - `schedule_save` turns `Editing` into `PendingSave` (deadline = last edit + debounce),
//!   or back to `Idle` when the edit left nothing to save.
//! - At most one save is in flight. Edits made meanwhile are picked up by the
//!   next quiet period once the save settles.
//! - A failed save parks the engine in `Error` until the next edit; there is no retry.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::resume::ResumeRow;
use crate::resume::draft::{ResumeDraft, ResumePatch};
use crate::resume::store::SaveRequest;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Editing,
    PendingSave,
    Saving,
    Error { message: String },
}

/// What observers of a draft see after every change.
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    pub snapshot: ResumeDraft,
    pub status: SaveStatus,
    pub record_id: Option<Uuid>,
    pub has_unsaved_changes: bool,
}

pub struct DraftEngine {
    user_id: Uuid,
    current: ResumeDraft,
    /// Last snapshot the store acknowledged.
    baseline: ResumeDraft,
    record_id: Option<Uuid>,
    status: SaveStatus,
    debounce: Duration,
    last_edit: Option<Instant>,
    deadline: Option<Instant>,
    /// Snapshot sent with the save that is currently in flight.
    in_flight: Option<ResumeDraft>,
}

impl DraftEngine {
    /// Starts from a loaded (or empty) draft, which counts as already persisted.
    pub fn new(
        user_id: Uuid,
        initial: ResumeDraft,
        record_id: Option<Uuid>,
        debounce: Duration,
    ) -> Self {
        Self {
            user_id,
            baseline: initial.clone(),
            current: initial,
            record_id,
            status: SaveStatus::Idle,
            debounce,
            last_edit: None,
            deadline: None,
            in_flight: None,
        }
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn record_id(&self) -> Option<Uuid> {
        self.record_id
    }

    pub fn snapshot(&self) -> &ResumeDraft {
        &self.current
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// When the pending save should fire. `None` while saving, idle or errored.
    pub fn deadline(&self) -> Option<Instant> {
        match self.status {
            SaveStatus::PendingSave => self.deadline,
            _ => None,
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.current.fingerprint() != self.baseline.fingerprint()
    }

    pub fn view(&self) -> DraftView {
        DraftView {
            snapshot: self.current.clone(),
            status: self.status.clone(),
            record_id: self.record_id,
            has_unsaved_changes: self.has_unsaved_changes(),
        }
    }

    pub fn on_edit(&mut self, patch: ResumePatch, now: Instant) {
        self.current.apply(patch);
        self.last_edit = Some(now);
        if let SaveStatus::Error { message } = &self.status {
            debug!("Edit clears previous save error: {message}");
        }
        if !self.is_saving() {
            self.status = SaveStatus::Editing;
        }
    }

    /// Arms (or re-arms) the quiet-period timer after an edit or a finished save.
    pub fn schedule_save(&mut self) {
        if self.is_saving() || matches!(self.status, SaveStatus::Error { .. }) {
            return;
        }
        if !self.has_unsaved_changes() {
            self.status = SaveStatus::Idle;
            self.deadline = None;
            return;
        }
        self.deadline = self.last_edit.map(|at| at + self.debounce);
        self.status = SaveStatus::PendingSave;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Hands out the next save if one is allowed right now, moving to `Saving`.
    /// Ignores the deadline, so callers check `is_due` first unless flushing.
    pub fn take_save_request(&mut self) -> Option<SaveRequest> {
        if self.is_saving() || matches!(self.status, SaveStatus::Error { .. }) {
            return None;
        }
        if !self.has_unsaved_changes() {
            self.status = SaveStatus::Idle;
            self.deadline = None;
            return None;
        }

        let mut draft = self.current.clone();
        if draft.photo_fingerprint() == self.baseline.photo_fingerprint() {
            draft.photo = None;
        }

        self.in_flight = Some(self.current.clone());
        self.deadline = None;
        self.status = SaveStatus::Saving;

        Some(SaveRequest {
            record_id: self.record_id,
            user_id: self.user_id,
            draft,
        })
    }

    /// Applies the outcome of the in-flight save.
    pub fn complete_save(&mut self, result: Result<ResumeRow, StoreError>) {
        let Some(sent) = self.in_flight.take() else {
            warn!("Save result arrived with no save in flight; ignoring");
            return;
        };

        match result {
            Ok(record) => {
                match self.record_id {
                    Some(known) if known != record.id => {
                        warn!(
                            "Store answered with resume {} for draft bound to {known}; keeping {known}",
                            record.id
                        );
                    }
                    Some(_) => {}
                    None => {
                        info!("Draft bound to new resume {}", record.id);
                        self.record_id = Some(record.id);
                    }
                }
                self.baseline = sent;
                self.status = SaveStatus::Editing;
                self.schedule_save();
            }
            Err(e) => {
                error!("Autosave failed for resume {:?}: {e}", self.record_id);
                self.status = SaveStatus::Error {
                    message: e.to_string(),
                };
                self.deadline = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::draft::{Attachment, Photo};
    use bytes::Bytes;
    use chrono::Utc;
    use serde_json::json;

    const DEBOUNCE: Duration = Duration::from_millis(1500);

    fn engine() -> DraftEngine {
        DraftEngine::new(Uuid::new_v4(), ResumeDraft::empty(), None, DEBOUNCE)
    }

    fn edit_city(city: &str) -> ResumePatch {
        ResumePatch {
            city: Some(city.to_string()),
            ..ResumePatch::default()
        }
    }

    fn record(id: Uuid) -> ResumeRow {
        ResumeRow {
            id,
            user_id: Uuid::new_v4(),
            photo_url: None,
            general_info: json!({}),
            personal_info: json!({}),
            work_experiences: json!([]),
            education: json!([]),
            skills: vec![],
            summary: String::new(),
            color: None,
            border: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn png(size: u64) -> Photo {
        Photo::Pending(Attachment {
            file_name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            size,
            data: Bytes::from(vec![7u8; size as usize]),
        })
    }

    #[test]
    fn test_fresh_engine_is_idle_and_clean() {
        let engine = engine();
        assert_eq!(engine.status(), &SaveStatus::Idle);
        assert!(!engine.has_unsaved_changes());
        assert!(engine.deadline().is_none());
    }

    #[test]
    fn test_edit_arms_deadline_after_quiet_period() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.on_edit(edit_city("Phnom Penh"), t0);
        assert_eq!(engine.status(), &SaveStatus::Editing);
        engine.schedule_save();
        assert_eq!(engine.status(), &SaveStatus::PendingSave);
        assert_eq!(engine.deadline(), Some(t0 + DEBOUNCE));
        assert!(!engine.is_due(t0 + Duration::from_millis(1499)));
        assert!(engine.is_due(t0 + DEBOUNCE));
    }

    #[test]
    fn test_later_edit_pushes_deadline_back() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.on_edit(edit_city("A"), t0);
        engine.schedule_save();
        let t1 = t0 + Duration::from_millis(1000);
        engine.on_edit(edit_city("B"), t1);
        engine.schedule_save();
        assert_eq!(engine.deadline(), Some(t1 + DEBOUNCE));
        assert!(!engine.is_due(t0 + DEBOUNCE));
    }

    #[test]
    fn test_edit_reverting_to_baseline_goes_idle() {
        let t0 = Instant::now();
        let mut reverted = engine();
        reverted.on_edit(
            ResumePatch {
                color_hex: Some("#000000".to_string()),
                ..ResumePatch::default()
            },
            t0,
        );
        reverted.schedule_save();
        assert_eq!(reverted.status(), &SaveStatus::Idle);
        assert!(reverted.deadline().is_none());
    }

    #[test]
    fn test_successful_save_clears_unsaved_and_binds_id() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.on_edit(edit_city("Kampot"), t0);
        engine.schedule_save();

        let request = engine.take_save_request().expect("save should be allowed");
        assert_eq!(request.record_id, None);
        assert_eq!(request.draft.city.as_deref(), Some("Kampot"));
        assert_eq!(engine.status(), &SaveStatus::Saving);

        let id = Uuid::new_v4();
        engine.complete_save(Ok(record(id)));
        assert_eq!(engine.record_id(), Some(id));
        assert!(!engine.has_unsaved_changes());
        assert_eq!(engine.status(), &SaveStatus::Idle);
    }

    #[test]
    fn test_no_second_save_while_one_is_in_flight() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.on_edit(edit_city("A"), t0);
        engine.schedule_save();
        assert!(engine.take_save_request().is_some());

        engine.on_edit(edit_city("B"), t0 + Duration::from_millis(10));
        engine.schedule_save();
        assert_eq!(engine.status(), &SaveStatus::Saving);
        assert!(engine.deadline().is_none());
        assert!(engine.take_save_request().is_none());
    }

    #[test]
    fn test_edits_during_save_are_saved_next() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.on_edit(edit_city("A"), t0);
        engine.schedule_save();
        engine.take_save_request();

        let t1 = t0 + Duration::from_millis(100);
        engine.on_edit(edit_city("B"), t1);
        let id = Uuid::new_v4();
        engine.complete_save(Ok(record(id)));

        assert!(engine.has_unsaved_changes());
        assert_eq!(engine.status(), &SaveStatus::PendingSave);
        assert_eq!(engine.deadline(), Some(t1 + DEBOUNCE));

        let request = engine.take_save_request().expect("second save");
        assert_eq!(request.record_id, Some(id));
        assert_eq!(request.draft.city.as_deref(), Some("B"));
    }

    #[test]
    fn test_record_id_is_stable_once_assigned() {
        let first = Uuid::new_v4();
        let mut engine = DraftEngine::new(Uuid::new_v4(), ResumeDraft::empty(), Some(first), DEBOUNCE);
        engine.on_edit(edit_city("A"), Instant::now());
        engine.schedule_save();
        let request = engine.take_save_request().unwrap();
        assert_eq!(request.record_id, Some(first));
        engine.complete_save(Ok(record(Uuid::new_v4())));
        assert_eq!(engine.record_id(), Some(first));
    }

    #[test]
    fn test_failed_save_blocks_until_next_edit() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.on_edit(edit_city("A"), t0);
        engine.schedule_save();
        engine.take_save_request();
        engine.complete_save(Err(StoreError::Unavailable("connection reset".to_string())));

        assert!(matches!(engine.status(), SaveStatus::Error { .. }));
        assert!(engine.has_unsaved_changes());
        assert!(engine.deadline().is_none());
        engine.schedule_save();
        assert!(engine.take_save_request().is_none());
        assert_eq!(engine.snapshot().city.as_deref(), Some("A"));

        let t1 = t0 + Duration::from_secs(5);
        engine.on_edit(edit_city("AB"), t1);
        assert_eq!(engine.status(), &SaveStatus::Editing);
        engine.schedule_save();
        assert_eq!(engine.deadline(), Some(t1 + DEBOUNCE));
        assert!(engine.take_save_request().is_some());
    }

    #[test]
    fn test_unchanged_photo_is_omitted_from_save() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.on_edit(ResumePatch::photo(png(16)), t0);
        engine.schedule_save();
        let first = engine.take_save_request().unwrap();
        assert!(matches!(first.draft.photo, Some(Photo::Pending(_))));
        engine.complete_save(Ok(record(Uuid::new_v4())));

        engine.on_edit(edit_city("Battambang"), t0 + Duration::from_secs(3));
        engine.schedule_save();
        let second = engine.take_save_request().unwrap();
        assert!(second.draft.photo.is_none());
        // the draft itself still holds the photo
        assert!(engine.snapshot().photo.is_some());
    }

    #[test]
    fn test_removed_photo_is_sent() {
        let mut engine = engine();
        engine.on_edit(ResumePatch::photo(Photo::Removed), Instant::now());
        engine.schedule_save();
        let request = engine.take_save_request().unwrap();
        assert_eq!(request.draft.photo, Some(Photo::Removed));
    }

    #[test]
    fn test_view_reports_state() {
        let mut engine = engine();
        engine.on_edit(edit_city("A"), Instant::now());
        engine.schedule_save();
        let view = engine.view();
        assert!(view.has_unsaved_changes);
        assert_eq!(view.status, SaveStatus::PendingSave);
        assert_eq!(view.snapshot.city.as_deref(), Some("A"));
    }
}
