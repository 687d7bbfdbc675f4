//! The configuration manager
//!
//! Owns the one authoritative [`Configuration`] snapshot for a session and
//! reduces two independent change sources into it: explicit calls
//! (`set_intent_parameters`, `set_caller`, `set_host_feature_info`) and the
//! device-flag change stream. Every publication replaces the snapshot
//! wholesale and bumps its version; validation always happens before any
//! mutation, so a failed call leaves the snapshot byte-for-byte untouched.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use alcove_core::prelude::*;
use alcove_core::{
    sanitize_mime_types, validate_ordered_selection, validate_selection_limit, Configuration,
    MediaUri, PickerAction, RuntimeEnv, SessionId, StartDestination, ThemeOverride,
};

use crate::flags::{resolve_flags, FlagSource};

/// Quiet period for coalescing device-flag change notifications
pub const FLAG_DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// Intent-equivalent structured parameters supplied by the caller.
///
/// `None` fields leave the corresponding snapshot field as it was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickerIntentParams {
    pub action: PickerAction,
    #[serde(default)]
    pub mime_types: Option<Vec<String>>,
    #[serde(default)]
    pub selection_limit: Option<usize>,
    #[serde(default)]
    pub pick_images_in_order: Option<bool>,
    #[serde(default)]
    pub pre_selected: Option<Vec<MediaUri>>,
    #[serde(default)]
    pub launch_tab: Option<String>,
}

/// Host-supplied descriptor of the embedded picker's behavior.
///
/// Carries the same knobs as the intent parameters plus an explicit theme
/// request. Only legal under the embedded runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostFeatureInfo {
    #[serde(default)]
    pub mime_types: Option<Vec<String>>,
    #[serde(default)]
    pub selection_limit: Option<usize>,
    #[serde(default)]
    pub ordered_selection: Option<bool>,
    #[serde(default)]
    pub pre_selected: Option<Vec<MediaUri>>,
    #[serde(default)]
    pub theme: ThemeOverride,
}

/// Owner of the configuration snapshot stream.
pub struct ConfigurationManager {
    config_tx: watch::Sender<Configuration>,
    /// Serializes every publication -- explicit setters and the flag
    /// listener alike -- so candidate building and publication are atomic
    /// with respect to each other. Subscribers still read lock-free.
    mutation: Arc<Mutex<()>>,
    flag_task: Option<JoinHandle<()>>,
    stop_tx: watch::Sender<bool>,
}

impl ConfigurationManager {
    /// Build the initial snapshot (flags resolved from `flag_source`,
    /// defaults everywhere else) and start the flag listener.
    pub fn new(
        runtime: RuntimeEnv,
        session_id: SessionId,
        flag_source: Arc<dyn FlagSource>,
    ) -> Self {
        let flags = resolve_flags(flag_source.as_ref());
        let (config_tx, _) = watch::channel(Configuration::initial(runtime, session_id, flags));
        let (stop_tx, stop_rx) = watch::channel(false);
        let mutation = Arc::new(Mutex::new(()));

        let flag_task = tokio::spawn(listen_for_flag_changes(
            flag_source,
            config_tx.clone(),
            mutation.clone(),
            stop_rx,
        ));

        Self {
            config_tx,
            mutation,
            flag_task: Some(flag_task),
            stop_tx,
        }
    }

    /// The current snapshot (a copy).
    pub fn current(&self) -> Configuration {
        self.config_tx.borrow().clone()
    }

    /// Subscribe to the snapshot stream. The current snapshot is the
    /// channel's initial value, so late subscribers are never stale.
    pub fn subscribe(&self) -> watch::Receiver<Configuration> {
        self.config_tx.subscribe()
    }

    /// Validate and merge caller intent parameters.
    ///
    /// Fails without mutating when the selection limit is out of range or
    /// ordered selection is requested for an action that forbids it. An
    /// unknown launch tab falls back to the default destination; unsupported
    /// mime filters are dropped, and if none survive the mime types stay
    /// unset.
    pub fn set_intent_parameters(&self, params: PickerIntentParams) -> Result<()> {
        let _guard = self.mutation.lock().unwrap();
        let mut candidate = self.config_tx.borrow().clone();

        candidate.action = params.action;

        if let Some(limit) = params.selection_limit {
            candidate.selection_limit = validate_selection_limit(limit)?;
        }

        if let Some(ordered) = params.pick_images_in_order {
            validate_ordered_selection(params.action, ordered)?;
            candidate.pick_images_in_order = ordered;
        }

        if let Some(requested) = &params.mime_types {
            let sanitized = sanitize_mime_types(requested);
            if !sanitized.is_empty() {
                candidate.mime_types = sanitized;
            }
        }

        if let Some(pre_selected) = params.pre_selected {
            candidate.pre_selected = pre_selected;
        }

        if let Some(tab) = &params.launch_tab {
            candidate.start_destination = StartDestination::parse_lenient(tab);
        }

        self.publish(candidate);
        Ok(())
    }

    /// Record the calling package's identity. Always mutates; the only
    /// validation is a non-empty package name.
    pub fn set_caller(&self, package: &str, uid: u32, label: Option<String>) -> Result<()> {
        if package.is_empty() {
            return Err(Error::illegal_extra("caller_package", "must not be empty"));
        }
        let _guard = self.mutation.lock().unwrap();
        let mut candidate = self.config_tx.borrow().clone();
        candidate.caller = Some(alcove_core::CallerInfo {
            package: package.to_string(),
            uid,
            label,
        });
        self.publish(candidate);
        Ok(())
    }

    /// Apply the host-supplied feature descriptor. Only legal under the
    /// embedded runtime; applies the same validation rules as
    /// `set_intent_parameters`. The embedded runtime behaves as the
    /// multi-pick action for the ordered-selection rule.
    pub fn set_host_feature_info(&self, info: HostFeatureInfo) -> Result<()> {
        let _guard = self.mutation.lock().unwrap();
        let mut candidate = self.config_tx.borrow().clone();

        if candidate.runtime != RuntimeEnv::Embedded {
            return Err(Error::illegal_extra(
                "host_feature_info",
                "only supported under the embedded runtime",
            ));
        }

        if let Some(limit) = info.selection_limit {
            candidate.selection_limit = validate_selection_limit(limit)?;
        }

        if let Some(ordered) = info.ordered_selection {
            validate_ordered_selection(PickerAction::PickMedia, ordered)?;
            candidate.pick_images_in_order = ordered;
        }

        if let Some(requested) = &info.mime_types {
            let sanitized = sanitize_mime_types(requested);
            if !sanitized.is_empty() {
                candidate.mime_types = sanitized;
            }
        }

        if let Some(pre_selected) = info.pre_selected {
            candidate.pre_selected = pre_selected;
        }

        self.publish(candidate);
        Ok(())
    }

    /// Stop the flag listener. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.stop_tx.send(true);
    }

    fn publish(&self, mut candidate: Configuration) {
        candidate.version += 1;
        self.config_tx.send_replace(candidate);
    }
}

impl Drop for ConfigurationManager {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(task) = self.flag_task.take() {
            task.abort();
        }
    }
}

/// Flag listener: coalesce change bursts with a quiet-period debounce, then
/// re-resolve and publish only when the resolved flags actually differ.
///
/// Publication happens under the manager's mutation guard: a setter's
/// clone-then-replace read-modify-write must never interleave with the flag
/// re-resolve, or one of the two publications would overwrite the other and
/// reuse its version.
async fn listen_for_flag_changes(
    flag_source: Arc<dyn FlagSource>,
    config_tx: watch::Sender<Configuration>,
    mutation: Arc<Mutex<()>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut generation_rx = flag_source.subscribe();
    let mut deadline: Option<tokio::time::Instant> = None;

    loop {
        let sleep_until = deadline.unwrap_or_else(|| {
            // Far enough out to never fire while the timer is unarmed
            tokio::time::Instant::now() + Duration::from_secs(3600)
        });

        tokio::select! {
            result = stop_rx.changed() => {
                if result.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            result = generation_rx.changed() => {
                if result.is_err() {
                    break;
                }
                generation_rx.borrow_and_update();
                deadline = Some(tokio::time::Instant::now() + FLAG_DEBOUNCE_WINDOW);
            }
            _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                deadline = None;
                let _guard = mutation.lock().unwrap();
                let flags = resolve_flags(flag_source.as_ref());
                config_tx.send_if_modified(|config| {
                    if config.flags == flags {
                        return false;
                    }
                    debug!("device flags changed: {:?}", flags);
                    config.flags = flags;
                    config.version += 1;
                    true
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{StaticFlagSource, FLAG_ALBUM_GRID, FLAG_CLOUD_MEDIA};

    fn manager() -> (ConfigurationManager, Arc<StaticFlagSource>) {
        let source = Arc::new(StaticFlagSource::new());
        let manager = ConfigurationManager::new(RuntimeEnv::Embedded, 1, source.clone());
        (manager, source)
    }

    #[tokio::test]
    async fn test_invalid_limit_leaves_snapshot_untouched() {
        let (manager, _) = manager();
        let before = manager.current();

        let err = manager
            .set_intent_parameters(PickerIntentParams {
                selection_limit: Some(0),
                mime_types: Some(vec!["image/*".to_string()]),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalConfigurationExtra {
                field: "selection_limit",
                ..
            }
        ));
        assert_eq!(manager.current(), before);

        let err = manager
            .set_intent_parameters(PickerIntentParams {
                selection_limit: Some(alcove_core::SELECTION_LIMIT_MAX + 1),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::IllegalConfigurationExtra { .. }));
        assert_eq!(manager.current(), before);
    }

    #[tokio::test]
    async fn test_ordered_selection_forbidden_for_get_content() {
        let (manager, _) = manager();
        let before = manager.current();

        let err = manager
            .set_intent_parameters(PickerIntentParams {
                action: PickerAction::GetContent,
                pick_images_in_order: Some(true),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalConfigurationExtra {
                field: "pick_images_in_order",
                ..
            }
        ));
        assert_eq!(manager.current(), before);
    }

    #[tokio::test]
    async fn test_unknown_launch_tab_falls_back() {
        let (manager, _) = manager();
        manager
            .set_intent_parameters(PickerIntentParams {
                launch_tab: Some("documents".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            manager.current().start_destination,
            StartDestination::Default
        );

        manager
            .set_intent_parameters(PickerIntentParams {
                launch_tab: Some("albums".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            manager.current().start_destination,
            StartDestination::Albums
        );
    }

    #[tokio::test]
    async fn test_unsupported_mime_types_dropped_empty_left_unset() {
        let (manager, _) = manager();

        manager
            .set_intent_parameters(PickerIntentParams {
                mime_types: Some(vec!["audio/mp3".to_string(), "text/plain".to_string()]),
                ..Default::default()
            })
            .unwrap();
        assert!(manager.current().mime_types.is_empty());

        manager
            .set_intent_parameters(PickerIntentParams {
                mime_types: Some(vec!["audio/mp3".to_string(), "image/png".to_string()]),
                ..Default::default()
            })
            .unwrap();
        let mime_types = manager.current().mime_types;
        assert_eq!(mime_types.len(), 1);
        assert_eq!(mime_types[0].as_str(), "image/png");
    }

    #[tokio::test]
    async fn test_set_caller() {
        let (manager, _) = manager();
        assert!(manager.set_caller("", 1000, None).is_err());

        manager
            .set_caller("com.example.gallery", 1000, Some("Gallery".to_string()))
            .unwrap();
        let caller = manager.current().caller.unwrap();
        assert_eq!(caller.package, "com.example.gallery");
        assert_eq!(caller.uid, 1000);
    }

    #[tokio::test]
    async fn test_host_feature_info_requires_embedded_runtime() {
        let source = Arc::new(StaticFlagSource::new());
        let manager = ConfigurationManager::new(RuntimeEnv::Standalone, 1, source);

        let err = manager
            .set_host_feature_info(HostFeatureInfo::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalConfigurationExtra {
                field: "host_feature_info",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_host_feature_info_allows_ordered_selection() {
        let (manager, _) = manager();
        manager
            .set_host_feature_info(HostFeatureInfo {
                selection_limit: Some(5),
                ordered_selection: Some(true),
                ..Default::default()
            })
            .unwrap();
        let config = manager.current();
        assert_eq!(config.selection_limit, 5);
        assert!(config.pick_images_in_order);
    }

    #[tokio::test]
    async fn test_versions_are_monotonic() {
        let (manager, _) = manager();
        let v1 = manager.current().version;
        manager.set_caller("a", 1, None).unwrap();
        let v2 = manager.current().version;
        manager
            .set_intent_parameters(PickerIntentParams::default())
            .unwrap();
        let v3 = manager.current().version;
        assert!(v1 < v2 && v2 < v3);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_current_snapshot() {
        let (manager, _) = manager();
        manager
            .set_intent_parameters(PickerIntentParams {
                selection_limit: Some(7),
                ..Default::default()
            })
            .unwrap();

        let rx = manager.subscribe();
        assert_eq!(rx.borrow().selection_limit, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_burst_coalesced_into_one_emission() {
        let (manager, source) = manager();
        let mut rx = manager.subscribe();
        rx.mark_unchanged();
        let version_before = rx.borrow().version;

        // Three bumps inside one quiet period
        source.set_bool(FLAG_CLOUD_MEDIA, true);
        tokio::time::sleep(Duration::from_millis(200)).await;
        source.set_bool(FLAG_ALBUM_GRID, false);
        tokio::time::sleep(Duration::from_millis(200)).await;
        source.set_bool(FLAG_CLOUD_MEDIA, true);

        // Inside the window nothing has been published yet
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!rx.has_changed().unwrap());

        // After the quiet period: exactly one publication with both changes
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(rx.has_changed().unwrap());
        let config = rx.borrow_and_update().clone();
        assert_eq!(config.version, version_before + 1);
        assert!(config.flags.cloud_media_enabled);
        assert!(!config.flags.album_grid_enabled);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_publication_survives_interleaved_setter() {
        let (manager, source) = manager();

        // Arm the flag window, then let a setter publish inside it. The flag
        // re-resolve and the setter serialize on the mutation guard, so the
        // flag update must land on its own version, after the setter's.
        source.set_bool(FLAG_CLOUD_MEDIA, true);
        tokio::time::sleep(Duration::from_millis(500)).await;
        manager
            .set_intent_parameters(PickerIntentParams {
                selection_limit: Some(7),
                ..Default::default()
            })
            .unwrap();
        let version_after_setter = manager.current().version;

        tokio::time::sleep(Duration::from_millis(700)).await;
        let config = manager.current();
        assert!(config.flags.cloud_media_enabled);
        assert_eq!(config.selection_limit, 7);
        assert!(config.version > version_after_setter);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_noop_change_not_republished() {
        let (manager, source) = manager();
        let mut rx = manager.subscribe();
        rx.mark_unchanged();

        // Writing the default value bumps the generation but resolves to the
        // same flag set; no snapshot is published.
        source.set_bool(FLAG_ALBUM_GRID, true);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_flag_listener() {
        let (manager, source) = manager();
        let mut rx = manager.subscribe();
        rx.mark_unchanged();

        manager.shutdown();
        tokio::task::yield_now().await;

        source.set_bool(FLAG_CLOUD_MEDIA, true);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!rx.has_changed().unwrap());
    }
}
