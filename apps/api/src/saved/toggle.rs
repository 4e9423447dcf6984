use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::saved::optimistic::{OptimisticState, OptimisticUpdate};
use crate::saved::store::SavedJobStore;

/// Flips whether `job_id` is on the user's saved list.
///
/// The flipped value is applied optimistically, then confirmed or rolled back
/// depending on the write. Only a failure to read the current state is an
/// error; a failed write comes back as a rolled-back update.
pub async fn toggle_saved(
    store: &dyn SavedJobStore,
    user_id: Uuid,
    job_id: Uuid,
) -> Result<OptimisticUpdate<bool>, StoreError> {
    let was_saved = store.is_saved(user_id, job_id).await?;
    let update = OptimisticUpdate::apply(was_saved, !was_saved);

    let outcome = if was_saved {
        store.remove(user_id, job_id).await
    } else {
        store.save(user_id, job_id).await
    };

    let update = update.settle(outcome);
    match update.state() {
        OptimisticState::RolledBack { reason } => {
            warn!("Rolled back saved-job toggle of {job_id} for user {user_id}: {reason}")
        }
        _ => info!(
            "User {user_id} {} job {job_id}",
            if *update.visible() { "saved" } else { "unsaved" }
        ),
    }
    Ok(update)
}
