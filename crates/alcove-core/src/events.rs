//! Domain event definitions
//!
//! Two surfaces live here: the in-process [`Event`] bus payloads features and
//! the core exchange, and the outbound [`ClientEvent`] notifications a session
//! sends to its remote client.

use serde::{Deserialize, Serialize};

use crate::types::MediaUri;

/// Discriminant for [`Event`], used by the feature producer/consumer contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SelectionConfirmed,
    ShowSnackbar,
    BrowseToAlbum,
    BannerDismissed,
}

/// A typed in-process event, dispatched on the session's event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum Event {
    /// The user confirmed the current selection
    SelectionConfirmed { item_count: usize },

    /// A feature (or the core) wants a transient snackbar shown
    ShowSnackbar { message: String },

    /// Navigate the main grid into an album
    BrowseToAlbum { album_id: String },

    /// The user dismissed a banner
    BannerDismissed { banner_id: String },
}

impl Event {
    /// The discriminant used for contract validation.
    pub fn kind(&self) -> EventType {
        match self {
            Event::SelectionConfirmed { .. } => EventType::SelectionConfirmed,
            Event::ShowSnackbar { .. } => EventType::ShowSnackbar,
            Event::BrowseToAlbum { .. } => EventType::BrowseToAlbum,
            Event::BannerDismissed { .. } => EventType::BannerDismissed,
        }
    }
}

/// Why a session reported an error to its client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorKind {
    /// A method was invoked after the session closed
    SessionClosed,
    Internal(String),
}

/// Outbound notification to the remote client.
///
/// Batched variants are never sent with an empty batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "notification")]
pub enum ClientEvent {
    UriPermissionGranted { uris: Vec<MediaUri> },
    UriPermissionRevoked { uris: Vec<MediaUri> },
    SelectionComplete,
    SessionError { kind: SessionErrorKind },
}
