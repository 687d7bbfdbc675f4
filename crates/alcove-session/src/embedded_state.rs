//! Ephemeral presentation state
//!
//! Distinct from the semantic picker configuration: this is the small bundle
//! of "how the embedded UI currently presents" bits (expanded/collapsed,
//! theme, recompose signal) consumed as a continuous stream by the UI layer.

use tokio::sync::watch;

use alcove_core::{DisplayId, HostToken};

/// Where in the host the session is mounted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBinding {
    pub token: HostToken,
    pub display: DisplayId,
}

/// Ephemeral presentation state for one embedded session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedState {
    pub expanded: bool,
    pub dark_theme: bool,
    /// Flipped to force a recompose; consumers react to any change
    pub recompose_toggle: bool,
    pub host: Option<HostBinding>,
}

/// Owner of the embedded-state stream. Mutated by explicit setters only.
pub struct EmbeddedStateManager {
    state_tx: watch::Sender<EmbeddedState>,
}

impl EmbeddedStateManager {
    pub fn new(dark_theme: bool) -> Self {
        let (state_tx, _) = watch::channel(EmbeddedState {
            dark_theme,
            ..EmbeddedState::default()
        });
        Self { state_tx }
    }

    pub fn current(&self) -> EmbeddedState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EmbeddedState> {
        self.state_tx.subscribe()
    }

    pub fn set_expanded(&self, expanded: bool) {
        self.state_tx.send_modify(|state| state.expanded = expanded);
    }

    pub fn set_dark_theme(&self, dark_theme: bool) {
        self.state_tx
            .send_modify(|state| state.dark_theme = dark_theme);
    }

    /// Force a recompose by flipping the toggle.
    pub fn trigger_recompose(&self) {
        self.state_tx
            .send_modify(|state| state.recompose_toggle = !state.recompose_toggle);
    }

    pub fn bind_host(&self, binding: HostBinding) {
        self.state_tx.send_modify(|state| state.host = Some(binding));
    }
}
