//! The immutable configuration snapshot and its validation rules

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{MediaUri, MimeTypeFilter, NightMode, SessionId};

/// Upper bound for the selection limit (inclusive)
pub const SELECTION_LIMIT_MAX: usize = 100;

/// The action a caller requested when opening the picker.
///
/// `PickMedia` is the multi-pick action; only it permits ordered selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerAction {
    #[default]
    PickMedia,
    GetContent,
}

/// Which runtime the picker is serving
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEnv {
    #[default]
    Standalone,
    Embedded,
}

/// Launch-tab hint supplied by the caller.
///
/// Only `"photos"` and `"albums"` parse; any other declared value falls back
/// to `Default` rather than failing. Permissive by contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartDestination {
    #[default]
    Default,
    PhotoGrid,
    Albums,
}

impl StartDestination {
    /// Parse a caller-declared launch tab, falling back to `Default`.
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "photos" => Self::PhotoGrid,
            "albums" => Self::Albums,
            _ => Self::Default,
        }
    }
}

/// Identity of the calling package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerInfo {
    pub package: String,
    pub uid: u32,
    #[serde(default)]
    pub label: Option<String>,
}

/// Resolved device feature flags embedded in every configuration snapshot.
///
/// Resolved by reading a flag source with typed defaults at manager
/// construction and re-resolved (debounced) on flag-change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFlags {
    pub cloud_media_enabled: bool,
    pub album_grid_enabled: bool,
    pub ordered_selection_enabled: bool,
    pub expressive_theme_enabled: bool,
}

impl Default for DeviceFlags {
    fn default() -> Self {
        Self {
            cloud_media_enabled: false,
            album_grid_enabled: true,
            ordered_selection_enabled: true,
            expressive_theme_enabled: false,
        }
    }
}

/// Configuration delta pushed by the host while a session is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfiguration {
    pub night_mode: NightMode,
}

/// The immutable, versioned configuration snapshot.
///
/// Replaced wholesale on every mutation -- never patched in place -- so every
/// subscriber observes a consistent view. `version` increases by one on each
/// publication; subscribers never observe an older snapshot after a newer one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub action: PickerAction,
    pub runtime: RuntimeEnv,
    /// Accepted mime-type filters; empty means unset (everything accepted)
    pub mime_types: Vec<MimeTypeFilter>,
    /// Invariant: `1..=SELECTION_LIMIT_MAX`
    pub selection_limit: usize,
    pub pick_images_in_order: bool,
    pub pre_selected: Vec<MediaUri>,
    pub start_destination: StartDestination,
    pub caller: Option<CallerInfo>,
    pub session_id: SessionId,
    pub flags: DeviceFlags,
    pub version: u64,
}

impl Configuration {
    /// Initial snapshot for a new session: defaults everywhere, flags as
    /// resolved by the caller.
    pub fn initial(runtime: RuntimeEnv, session_id: SessionId, flags: DeviceFlags) -> Self {
        Self {
            action: PickerAction::default(),
            runtime,
            mime_types: Vec::new(),
            selection_limit: 1,
            pick_images_in_order: false,
            pre_selected: Vec::new(),
            start_destination: StartDestination::default(),
            caller: None,
            session_id,
            flags,
            version: 1,
        }
    }

    /// Whether every declared mime filter is video-only (and at least one is
    /// declared). Used by feature enablement checks.
    pub fn is_video_only(&self) -> bool {
        !self.mime_types.is_empty() && self.mime_types.iter().all(MimeTypeFilter::is_video)
    }
}

// ─────────────────────────────────────────────────────────────────
// Validation helpers shared by intent-parameter and host-feature-info
// ingestion
// ─────────────────────────────────────────────────────────────────

/// Validate a caller-supplied selection limit against `[1, SELECTION_LIMIT_MAX]`.
pub fn validate_selection_limit(limit: usize) -> Result<usize> {
    if (1..=SELECTION_LIMIT_MAX).contains(&limit) {
        Ok(limit)
    } else {
        Err(Error::illegal_extra(
            "selection_limit",
            format!("must be in [1, {SELECTION_LIMIT_MAX}], got {limit}"),
        ))
    }
}

/// Ordered selection is only legal for the multi-pick action.
pub fn validate_ordered_selection(action: PickerAction, ordered: bool) -> Result<()> {
    if ordered && action != PickerAction::PickMedia {
        return Err(Error::illegal_extra(
            "pick_images_in_order",
            format!("not supported for action {action:?}"),
        ));
    }
    Ok(())
}

/// Drop unsupported mime filters, keeping the caller's order.
///
/// Unsupported entries are silently dropped rather than rejected; if nothing
/// survives, the returned list is empty, which downstream treats as "mime
/// types unset" rather than an error.
pub fn sanitize_mime_types(requested: &[String]) -> Vec<MimeTypeFilter> {
    requested
        .iter()
        .map(|raw| MimeTypeFilter::new(raw.clone()))
        .filter(|filter| {
            let supported = filter.is_supported();
            if !supported {
                tracing::debug!("dropping unsupported mime filter: {}", filter);
            }
            supported
        })
        .collect()
}
