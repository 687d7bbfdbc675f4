//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    /// A caller-supplied configuration extra failed validation. Raised
    /// synchronously, before any mutation, naming the invalid field.
    #[error("illegal configuration extra '{field}': {reason}")]
    IllegalConfigurationExtra { field: &'static str, reason: String },

    #[error("flag file error: {message}")]
    FlagFile { message: String },

    #[error("flag file parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ─────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────
    /// Method invoked on a closed session. Used internally; the remote peer
    /// sees a `SessionError` client event instead of this error.
    #[error("session is closed")]
    SessionClosed,

    #[error("failed to create presentation surface: {reason}")]
    SurfaceCreation { reason: String },

    /// The UI executor for a session has already shut down
    #[error("UI executor is gone")]
    ExecutorGone,

    // ─────────────────────────────────────────────────────────────
    // Collaborator Errors
    // ─────────────────────────────────────────────────────────────
    #[error("media provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn illegal_extra(field: &'static str, reason: impl Into<String>) -> Self {
        Self::IllegalConfigurationExtra {
            field,
            reason: reason.into(),
        }
    }

    pub fn flag_file(message: impl Into<String>) -> Self {
        Self::FlagFile {
            message: message.into(),
        }
    }

    pub fn surface_creation(reason: impl Into<String>) -> Self {
        Self::SurfaceCreation {
            reason: reason.into(),
        }
    }

    pub fn provider_unavailable(reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::IllegalConfigurationExtra { .. }
                | Error::SessionClosed
                | Error::ProviderUnavailable { .. }
                | Error::FlagFile { .. }
                | Error::TomlParse(_)
        )
    }

    /// Check if this error should tear the session down
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::SurfaceCreation { .. } | Error::ExecutorGone | Error::ChannelClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::illegal_extra("selection_limit", "must be in [1, 100], got 0");
        assert_eq!(
            err.to_string(),
            "illegal configuration extra 'selection_limit': must be in [1, 100], got 0"
        );

        let err = Error::SessionClosed;
        assert_eq!(err.to_string(), "session is closed");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::illegal_extra("field", "reason").is_recoverable());
        assert!(Error::SessionClosed.is_recoverable());
        assert!(Error::provider_unavailable("offline").is_recoverable());
        assert!(!Error::ExecutorGone.is_recoverable());
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::surface_creation("zero-sized buffer").is_fatal());
        assert!(Error::ExecutorGone.is_fatal());
        assert!(!Error::SessionClosed.is_fatal());
    }
}
