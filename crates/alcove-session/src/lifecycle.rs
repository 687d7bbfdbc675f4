//! The session's UI lifecycle
//!
//! A small monotonic-ish state machine owned by the session's UI actor.
//! Consumers that must not run while the UI is backgrounded gate on
//! [`LifecycleState::is_at_least_started`].

use tokio::sync::watch;

use alcove_core::prelude::*;

/// UI lifecycle states, ordered by how "alive" the UI is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Initialized,
    Created,
    Started,
    Resumed,
    /// Terminal; no transition leaves this state
    Destroyed,
}

impl LifecycleState {
    /// Whether lifecycle-gated consumers (the selection pipeline) may run.
    pub fn is_at_least_started(&self) -> bool {
        matches!(self, LifecycleState::Started | LifecycleState::Resumed)
    }
}

/// Owner side of the lifecycle stream.
///
/// All transitions happen on the session's UI actor; everyone else holds a
/// receiver.
pub struct UiLifecycle {
    state_tx: watch::Sender<LifecycleState>,
}

impl UiLifecycle {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Initialized);
        Self { state_tx }
    }

    pub fn current(&self) -> LifecycleState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// `Initialized -> Created`. The view hierarchy exists but is not shown.
    pub fn create(&self) {
        self.transition(LifecycleState::Created);
    }

    /// The session became visible.
    pub fn resume(&self) {
        self.transition(LifecycleState::Resumed);
    }

    /// The session was hidden: drop below `Started` so gated consumers pause.
    pub fn stop_to_created(&self) {
        self.transition(LifecycleState::Created);
    }

    /// Terminal teardown. Idempotent.
    pub fn destroy(&self) {
        self.transition(LifecycleState::Destroyed);
    }

    fn transition(&self, next: LifecycleState) {
        self.state_tx.send_if_modified(|state| {
            if *state == LifecycleState::Destroyed || *state == next {
                return false;
            }
            trace!("lifecycle transition: {:?} -> {:?}", state, next);
            *state = next;
            true
        });
    }
}

impl Default for UiLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
