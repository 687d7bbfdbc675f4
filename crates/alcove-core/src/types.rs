//! Domain types shared across the Alcove crates

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a session
pub type SessionId = u64;

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique session ID
pub fn next_session_id() -> SessionId {
    SESSION_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Opaque identifier for a single pickable media item.
///
/// The runtime never interprets the contents; the host's storage layer mints
/// these and the grant collaborator consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaUri(String);

impl MediaUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaUri {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MediaUri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A requested mime-type filter, e.g. `image/*` or `video/mp4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeTypeFilter(String);

impl MimeTypeFilter {
    pub fn new(filter: impl Into<String>) -> Self {
        Self(filter.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this filter is on the supported allow-list.
    ///
    /// Supported: the `image/*` and `video/*` wildcards, plus any concrete
    /// `image/<sub>` or `video/<sub>` subtype. Everything else (audio,
    /// documents, a bare `*/*`) is unsupported and gets dropped during
    /// sanitization.
    pub fn is_supported(&self) -> bool {
        match self.0.split_once('/') {
            Some((top, sub)) => matches!(top, "image" | "video") && !sub.is_empty(),
            None => false,
        }
    }

    /// Whether this filter only matches video content.
    pub fn is_video(&self) -> bool {
        self.0.starts_with("video/")
    }
}

impl fmt::Display for MimeTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MimeTypeFilter {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of the host display a session renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub u32);

/// Opaque token locating the host surface a session composites into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostToken(pub String);

/// Outcome of a single permission grant or revoke call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantDecision {
    Granted,
    Denied,
}

/// Night-mode bits reported by the host configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightMode {
    Yes,
    No,
    Undefined,
}

/// Explicit theme request carried by host feature info.
///
/// `System` means "not overridden": the session follows the host's night-mode
/// bits for the lifetime of the connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeOverride {
    #[default]
    System,
    Light,
    Dark,
}
