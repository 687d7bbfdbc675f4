//! # alcove-core - Core Domain Types
//!
//! Foundation crate for the Alcove embedded picker runtime. Provides domain
//! types, the configuration snapshot and its validation rules, event
//! definitions, error handling, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, toml, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`MediaUri`] - Opaque identifier for a pickable media item
//! - [`SessionId`] / [`next_session_id()`] - Unique per-connection session ids
//! - [`GrantDecision`] - Outcome of a permission grant/revoke call
//! - [`NightMode`], [`ThemeOverride`] - Host theming inputs
//!
//! ### Configuration (`configuration`)
//! - [`Configuration`] - The immutable, versioned configuration snapshot
//! - [`PickerAction`], [`RuntimeEnv`], [`StartDestination`] - Snapshot fields
//! - [`DeviceFlags`] - Resolved device feature flags embedded in the snapshot
//!
//! ### Events (`events`)
//! - [`Event`] / [`EventType`] - Typed in-process event bus payloads
//! - [`ClientEvent`] - Outbound notifications to the remote client
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use alcove_core::prelude::*;
//! ```

pub mod configuration;
pub mod error;
pub mod events;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all Alcove crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use configuration::{
    sanitize_mime_types, validate_ordered_selection, validate_selection_limit, CallerInfo,
    Configuration, DeviceFlags, HostConfiguration, PickerAction, RuntimeEnv, StartDestination,
    SELECTION_LIMIT_MAX,
};
pub use error::{Error, Result};
pub use events::{ClientEvent, Event, EventType, SessionErrorKind};
pub use types::{
    next_session_id, DisplayId, GrantDecision, HostToken, MediaUri, MimeTypeFilter, NightMode,
    SessionId, ThemeOverride,
};
