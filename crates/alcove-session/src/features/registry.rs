//! The built-in feature registry
//!
//! Registration order is fixed; it is the tie-break for equal composition
//! priorities, so reordering entries is a behavior change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alcove_core::{Configuration, EventType, PickerAction};

use super::{Feature, FeatureDescriptor, FeatureToken, Location, Priority};
use crate::prefetch::{PrefetchKey, PrefetchResults};

/// Event types the core (non-feature machinery) produces: grant-failure
/// snackbar notices.
pub const CORE_PRODUCES: &[EventType] = &[EventType::ShowSnackbar];

/// Event types the core consumes: `SelectionConfirmed` drives the client's
/// selection-complete callback, `BrowseToAlbum` is core navigation plumbing.
pub const CORE_CONSUMES: &[EventType] = &[EventType::SelectionConfirmed, EventType::BrowseToAlbum];

/// Shared shape of the built-in feature instances: they only track the last
/// configuration version they saw.
struct TrackingFeature {
    token: FeatureToken,
    last_seen_version: AtomicU64,
}

impl TrackingFeature {
    fn build(token: FeatureToken) -> Arc<dyn Feature> {
        Arc::new(Self {
            token,
            last_seen_version: AtomicU64::new(0),
        })
    }
}

impl Feature for TrackingFeature {
    fn token(&self) -> FeatureToken {
        self.token
    }

    fn on_configuration_changed(&self, config: &Configuration) {
        self.last_seen_version.store(config.version, Ordering::SeqCst);
    }
}

/// The registry of built-in features, in registration order.
pub fn built_in_registry() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            token: FeatureToken::PhotoGrid,
            is_enabled: |_, _| true,
            placements: vec![
                (Location::MainGrid, Priority(10)),
                (Location::NavigationBar, Priority(5)),
            ],
            build: || TrackingFeature::build(FeatureToken::PhotoGrid),
            produces: &[EventType::SelectionConfirmed],
            consumes: &[],
        },
        FeatureDescriptor {
            token: FeatureToken::Albums,
            is_enabled: albums_enabled,
            placements: vec![(Location::NavigationBar, Priority(10))],
            build: || TrackingFeature::build(FeatureToken::Albums),
            produces: &[EventType::BrowseToAlbum],
            consumes: &[],
        },
        FeatureDescriptor {
            token: FeatureToken::CloudMedia,
            is_enabled: cloud_media_enabled,
            placements: vec![(Location::Banner, Priority(10))],
            build: || TrackingFeature::build(FeatureToken::CloudMedia),
            produces: &[EventType::ShowSnackbar, EventType::BannerDismissed],
            consumes: &[],
        },
        FeatureDescriptor {
            token: FeatureToken::SelectionBar,
            is_enabled: |config, _| config.selection_limit > 1,
            placements: vec![(Location::SelectionBar, Priority(10))],
            build: || TrackingFeature::build(FeatureToken::SelectionBar),
            produces: &[EventType::SelectionConfirmed],
            consumes: &[],
        },
        FeatureDescriptor {
            token: FeatureToken::Snackbar,
            is_enabled: |_, _| true,
            placements: vec![(Location::Snackbar, Priority(10))],
            build: || TrackingFeature::build(FeatureToken::Snackbar),
            produces: &[],
            consumes: &[EventType::ShowSnackbar],
        },
        FeatureDescriptor {
            token: FeatureToken::Preview,
            is_enabled: |_, _| true,
            placements: vec![(Location::Dialog, Priority(10))],
            build: || TrackingFeature::build(FeatureToken::Preview),
            produces: &[],
            consumes: &[],
        },
    ]
}

/// Albums hide for video-only GetContent requests, and require the album
/// grid flag.
fn albums_enabled(config: &Configuration, _prefetch: &PrefetchResults) -> bool {
    if !config.flags.album_grid_enabled {
        return false;
    }
    !(config.action == PickerAction::GetContent && config.is_video_only())
}

fn cloud_media_enabled(config: &Configuration, prefetch: &PrefetchResults) -> bool {
    config.flags.cloud_media_enabled
        && prefetch
            .get_bool(PrefetchKey::CloudMediaAvailable)
            .unwrap_or(false)
}
