//! Optimistic updates with an explicit rollback path.
//!
//! An update is shown as applied before the write finishes, then either
//! confirmed or rolled back to the previous value. There is no other way out
//! of `AppliedOptimistically`, and both outcomes are final.

use std::fmt::Display;

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OptimisticState {
    AppliedOptimistically,
    Confirmed,
    RolledBack { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimisticUpdate<T> {
    previous: T,
    proposed: T,
    state: OptimisticState,
}

impl<T> OptimisticUpdate<T> {
    pub fn apply(previous: T, proposed: T) -> Self {
        Self {
            previous,
            proposed,
            state: OptimisticState::AppliedOptimistically,
        }
    }

    /// The value a reader should see right now.
    pub fn visible(&self) -> &T {
        match self.state {
            OptimisticState::RolledBack { .. } => &self.previous,
            _ => &self.proposed,
        }
    }

    pub fn state(&self) -> &OptimisticState {
        &self.state
    }

    pub fn confirm(mut self) -> Self {
        if self.state == OptimisticState::AppliedOptimistically {
            self.state = OptimisticState::Confirmed;
        } else {
            warn!("Ignoring confirm of an already settled update: {:?}", self.state);
        }
        self
    }

    pub fn roll_back(mut self, reason: impl Into<String>) -> Self {
        if self.state == OptimisticState::AppliedOptimistically {
            self.state = OptimisticState::RolledBack {
                reason: reason.into(),
            };
        } else {
            warn!("Ignoring rollback of an already settled update: {:?}", self.state);
        }
        self
    }

    /// Confirms on `Ok`, rolls back with the error text on `Err`.
    pub fn settle<E: Display>(self, outcome: Result<(), E>) -> Self {
        match outcome {
            Ok(()) => self.confirm(),
            Err(e) => self.roll_back(e.to_string()),
        }
    }
}
