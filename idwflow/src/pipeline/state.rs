//! Run state tracking.

use crate::core::RunState;
use tracing::{debug, warn};
use uuid::Uuid;

/// Tracks the [`RunState`] of one run and logs every transition.
#[derive(Debug, Clone)]
pub struct RunTracker {
    state: RunState,
    history: Vec<RunState>,
    run_id: Option<Uuid>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    /// Starts in [`RunState::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            history: vec![RunState::Idle],
            run_id: None,
        }
    }

    /// Attaches the run identifier once the request is known.
    pub fn set_run_id(&mut self, run_id: Uuid) {
        self.run_id = Some(run_id);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state visited, in order.
    #[must_use]
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Moves to `next`.
    ///
    /// Returns false, and logs a warning, if the transition is illegal; the
    /// state is updated regardless.
    pub fn advance(&mut self, next: RunState) -> bool {
        let legal = self.state.can_transition_to(next);
        if legal {
            debug!(run_id = ?self.run_id, from = %self.state, to = %next, "Run state transition");
        } else {
            warn!(run_id = ?self.run_id, from = %self.state, to = %next, "Illegal run state transition");
        }
        self.state = next;
        self.history.push(next);
        legal
    }
}
