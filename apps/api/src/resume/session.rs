//! One tokio task per open draft drives its `DraftEngine`.
//!
//! The task is the single writer of the engine. It waits on incoming commands,
//! the debounce deadline, the save currently in flight, and an idle timer that
//! closes sessions nobody talks to any more. Every state change is published
//! on a `watch` channel.

use std::collections::HashMap;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{AppError, StoreError};
use crate::models::resume::ResumeRow;
use crate::resume::draft::{ResumeDraft, ResumePatch};
use crate::resume::engine::{DraftEngine, DraftView};
use crate::resume::store::{ResumeStore, SaveRequest};

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Quiet period after the last edit before an autosave.
    pub debounce: Duration,
    /// A session without commands for this long flushes and closes itself.
    pub idle_timeout: Duration,
}

#[derive(Debug, Error)]
#[error("Draft session {0} is closed")]
pub struct SessionClosed(pub Uuid);

impl From<SessionClosed> for AppError {
    fn from(err: SessionClosed) -> Self {
        AppError::NotFound(err.to_string())
    }
}

enum Command {
    Edit(ResumePatch),
    View(oneshot::Sender<DraftView>),
    Close(oneshot::Sender<DraftView>),
}

/// Cheap, cloneable handle to a running draft session.
#[derive(Clone)]
pub struct DraftHandle {
    session_id: Uuid,
    commands: mpsc::Sender<Command>,
    views: watch::Receiver<DraftView>,
}

impl DraftHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn edit(&self, patch: ResumePatch) -> Result<(), SessionClosed> {
        self.commands
            .send(Command::Edit(patch))
            .await
            .map_err(|_| SessionClosed(self.session_id))
    }

    /// Current view, answered after every command sent before it.
    pub async fn view(&self) -> Result<DraftView, SessionClosed> {
        self.request(Command::View).await
    }

    /// Waits for any in-flight save, flushes unsaved changes once, and stops the task.
    pub async fn close(&self) -> Result<DraftView, SessionClosed> {
        self.request(Command::Close).await
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftView> {
        self.views.clone()
    }

    /// Resolves once the session task has stopped, for whatever reason.
    pub async fn closed(&self) {
        self.commands.closed().await
    }

    async fn request(
        &self,
        command: fn(oneshot::Sender<DraftView>) -> Command,
    ) -> Result<DraftView, SessionClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionClosed(self.session_id))?;
        response.await.map_err(|_| SessionClosed(self.session_id))
    }
}

/// Starts a session task for a draft and returns its handle.
pub fn spawn_session(
    user_id: Uuid,
    initial: ResumeDraft,
    record_id: Option<Uuid>,
    timings: SessionTimings,
    store: Arc<dyn ResumeStore>,
) -> DraftHandle {
    let session_id = Uuid::new_v4();
    let engine = DraftEngine::new(user_id, initial, record_id, timings.debounce);
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (views_tx, views_rx) = watch::channel(engine.view());

    tokio::spawn(run_session(
        session_id,
        engine,
        store,
        commands_rx,
        views_tx,
        timings.idle_timeout,
    ));
    info!("Opened draft session {session_id} for user {user_id} (resume {record_id:?})");

    DraftHandle {
        session_id,
        commands: commands_tx,
        views: views_rx,
    }
}

type SaveTask = JoinHandle<Result<ResumeRow, StoreError>>;

async fn run_session(
    session_id: Uuid,
    mut engine: DraftEngine,
    store: Arc<dyn ResumeStore>,
    mut commands: mpsc::Receiver<Command>,
    views: watch::Sender<DraftView>,
    idle_timeout: Duration,
) {
    let mut in_flight: Option<SaveTask> = None;
    let mut last_command = Instant::now();

    loop {
        tokio::select! {
            command = commands.recv() => {
                last_command = Instant::now();
                match command {
                    Some(Command::Edit(patch)) => {
                        engine.on_edit(patch, Instant::now());
                        engine.schedule_save();
                    }
                    Some(Command::View(reply)) => {
                        let _ = reply.send(engine.view());
                        continue;
                    }
                    Some(Command::Close(reply)) => {
                        flush(&mut engine, &store, in_flight.take()).await;
                        views.send_replace(engine.view());
                        let _ = reply.send(engine.view());
                        break;
                    }
                    None => {
                        debug!("All handles for draft session {session_id} dropped");
                        flush(&mut engine, &store, in_flight.take()).await;
                        break;
                    }
                }
            }
            _ = sleep_until(last_command + idle_timeout) => {
                info!("Draft session {session_id} idle for {idle_timeout:?}; closing");
                flush(&mut engine, &store, in_flight.take()).await;
                views.send_replace(engine.view());
                break;
            }
            _ = wait_until(engine.deadline()) => {
                if let Some(request) = engine.take_save_request() {
                    debug!("Draft session {session_id} quiet period elapsed; saving");
                    in_flight = Some(spawn_save(&store, request));
                }
            }
            result = settle(&mut in_flight) => {
                in_flight = None;
                engine.complete_save(result);
            }
        }

        views.send_replace(engine.view());
    }

    info!("Closed draft session {session_id}");
}

fn spawn_save(store: &Arc<dyn ResumeStore>, request: SaveRequest) -> SaveTask {
    let store = Arc::clone(store);
    tokio::spawn(async move { store.upsert(request).await })
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn settle(in_flight: &mut Option<SaveTask>) -> Result<ResumeRow, StoreError> {
    match in_flight.as_mut() {
        Some(task) => join_save(task).await,
        None => pending().await,
    }
}

async fn join_save(task: &mut SaveTask) -> Result<ResumeRow, StoreError> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Unavailable(format!("save task failed: {e}"))),
    }
}

async fn flush(engine: &mut DraftEngine, store: &Arc<dyn ResumeStore>, in_flight: Option<SaveTask>) {
    if let Some(mut task) = in_flight {
        engine.complete_save(join_save(&mut task).await);
    }
    if let Some(request) = engine.take_save_request() {
        let result = store.upsert(request).await;
        engine.complete_save(result);
    }
    if engine.has_unsaved_changes() {
        warn!("Draft closed with unsaved changes: {:?}", engine.status());
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// Open draft sessions by session id. Lives in `AppState`.
///
/// A session leaves the registry as soon as its task stops, whether it was
/// closed explicitly or timed out.
#[derive(Clone, Default)]
pub struct DraftRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, DraftHandle>>>,
}

impl DraftRegistry {
    pub async fn insert(&self, handle: DraftHandle) {
        let session_id = handle.session_id();
        let watcher = handle.clone();
        self.sessions.write().await.insert(session_id, handle);

        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            watcher.closed().await;
            if sessions.write().await.remove(&session_id).is_some() {
                debug!("Removed stopped draft session {session_id}");
            }
        });
    }

    pub async fn get(&self, session_id: Uuid) -> Result<DraftHandle, SessionClosed> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(SessionClosed(session_id))
    }

    pub async fn remove(&self, session_id: Uuid) -> Result<DraftHandle, SessionClosed> {
        self.sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or(SessionClosed(session_id))
    }
}
