//! The feature manager
//!
//! Optional behavior modules register as [`FeatureDescriptor`]s; the manager
//! computes which are enabled for the current configuration, in what priority
//! order they compose at each placement, and enforces the event
//! producer/consumer contract. The enabled set is a pure function of the
//! latest configuration snapshot, recomputed wholesale on every emission --
//! no incremental patching, so there is nothing to drift.

mod registry;

pub use registry::{built_in_registry, CORE_CONSUMES, CORE_PRODUCES};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use alcove_core::prelude::*;
use alcove_core::{Configuration, EventType};

use crate::events::EventBus;
use crate::prefetch::PrefetchResults;

/// Unique tag for each registered feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureToken {
    PhotoGrid,
    Albums,
    CloudMedia,
    SelectionBar,
    Snackbar,
    Preview,
}

/// Logical placements features compose into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    NavigationBar,
    MainGrid,
    SelectionBar,
    Snackbar,
    Banner,
    Dialog,
}

/// Composition priority; higher composes first, ties broken by registration
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub i32);

/// A live feature instance. Instances are cheap state holders; the UI tree
/// they drive is out of scope here.
pub trait Feature: Send + Sync {
    fn token(&self) -> FeatureToken;

    /// Called (off the UI context) whenever a new configuration snapshot
    /// arrives while this feature is enabled.
    fn on_configuration_changed(&self, config: &Configuration);
}

/// Registration record for one feature
pub struct FeatureDescriptor {
    pub token: FeatureToken,
    pub is_enabled: fn(&Configuration, &PrefetchResults) -> bool,
    pub placements: Vec<(Location, Priority)>,
    pub build: fn() -> Arc<dyn Feature>,
    pub produces: &'static [EventType],
    pub consumes: &'static [EventType],
}

/// Snapshot of the currently-enabled feature set, replaced wholesale on
/// every recomputation.
#[derive(Default)]
struct EnabledSet {
    tokens: HashSet<FeatureToken>,
    /// Live instances keyed by registry index (registration order)
    instances: HashMap<usize, Arc<dyn Feature>>,
}

/// Computes and serves the enabled, priority-ordered feature set.
pub struct FeatureManager {
    registry: Arc<Vec<FeatureDescriptor>>,
    enabled: Arc<RwLock<EnabledSet>>,
    recompute_task: Option<JoinHandle<()>>,
    stop_tx: watch::Sender<bool>,
}

impl FeatureManager {
    /// Compute the initial enabled set and start the recompute task.
    ///
    /// # Panics
    ///
    /// In debug builds, panics when an enabled feature consumes an event type
    /// that no enabled feature and not the core declares as produced. Release
    /// builds skip the check: a wiring gap must not become a runtime crash
    /// for end users.
    pub fn new(
        config_rx: watch::Receiver<Configuration>,
        prefetch: PrefetchResults,
        registry: Vec<FeatureDescriptor>,
        core_consumes: &[EventType],
        core_produces: &'static [EventType],
        bus: EventBus,
    ) -> Self {
        let registry = Arc::new(registry);
        let initial_config = config_rx.borrow().clone();

        let mut enabled = EnabledSet::default();
        recompute(&registry, &initial_config, &prefetch, &mut enabled, &bus, core_produces);

        if cfg!(debug_assertions) {
            validate_contract(&registry, &enabled, core_consumes, core_produces);
        }

        let enabled = Arc::new(RwLock::new(enabled));
        let (stop_tx, stop_rx) = watch::channel(false);

        let recompute_task = tokio::spawn(run_recompute(
            registry.clone(),
            prefetch,
            enabled.clone(),
            config_rx,
            bus,
            core_produces,
            stop_rx,
        ));

        Self {
            registry,
            enabled,
            recompute_task: Some(recompute_task),
            stop_tx,
        }
    }

    /// O(1) membership check against the live enabled set.
    pub fn is_feature_enabled(&self, token: FeatureToken) -> bool {
        self.enabled.read().unwrap().tokens.contains(&token)
    }

    /// Enabled features registered at `location`, priority-descending with a
    /// stable registration-order tie-break, truncated to `max_slots`.
    pub fn compose_at(&self, location: Location, max_slots: Option<usize>) -> Vec<FeatureToken> {
        let enabled = self.enabled.read().unwrap();
        let mut slots: Vec<(Priority, usize, FeatureToken)> = Vec::new();
        for (index, descriptor) in self.registry.iter().enumerate() {
            if !enabled.tokens.contains(&descriptor.token) {
                continue;
            }
            for (placement, priority) in &descriptor.placements {
                if *placement == location {
                    slots.push((*priority, index, descriptor.token));
                }
            }
        }
        // Stable sort keeps registration order within equal priorities
        slots.sort_by(|a, b| b.0.cmp(&a.0));

        let mut tokens: Vec<FeatureToken> = slots.into_iter().map(|(_, _, token)| token).collect();
        if let Some(max_slots) = max_slots {
            tokens.truncate(max_slots);
        }
        tokens
    }

    /// Count of features registered (regardless of enablement) at a
    /// location. Diagnostics only.
    pub fn size_of_location_in_registry(&self, location: Location) -> usize {
        self.registry
            .iter()
            .filter(|descriptor| {
                descriptor
                    .placements
                    .iter()
                    .any(|(placement, _)| *placement == location)
            })
            .count()
    }

    /// Stop the recompute task. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.stop_tx.send(true);
    }
}

impl Drop for FeatureManager {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(task) = self.recompute_task.take() {
            task.abort();
        }
    }
}

/// Re-evaluate every descriptor against `config`: build newly-enabled
/// instances, drop newly-disabled ones, and refresh the bus' produced-set.
fn recompute(
    registry: &[FeatureDescriptor],
    config: &Configuration,
    prefetch: &PrefetchResults,
    enabled: &mut EnabledSet,
    bus: &EventBus,
    core_produces: &[EventType],
) {
    let mut tokens = HashSet::new();
    let mut instances = HashMap::new();
    let mut produced: HashSet<EventType> = core_produces.iter().copied().collect();

    for (index, descriptor) in registry.iter().enumerate() {
        if !(descriptor.is_enabled)(config, prefetch) {
            continue;
        }
        tokens.insert(descriptor.token);
        produced.extend(descriptor.produces.iter().copied());
        // Keep the live instance for still-enabled features
        let instance = enabled
            .instances
            .remove(&index)
            .unwrap_or_else(|| (descriptor.build)());
        instances.insert(index, instance);
    }

    enabled.tokens = tokens;
    enabled.instances = instances;
    bus.set_registered_producers(produced);
}

/// Construction-time producer/consumer contract validation (debug only).
fn validate_contract(
    registry: &[FeatureDescriptor],
    enabled: &EnabledSet,
    core_consumes: &[EventType],
    core_produces: &[EventType],
) {
    let mut produced: HashSet<EventType> = core_produces.iter().copied().collect();
    for descriptor in registry {
        if enabled.tokens.contains(&descriptor.token) {
            produced.extend(descriptor.produces.iter().copied());
        }
    }

    for descriptor in registry {
        if !enabled.tokens.contains(&descriptor.token) {
            continue;
        }
        for consumed in descriptor.consumes {
            assert!(
                produced.contains(consumed),
                "feature contract violation: {:?} consumes {:?} but no enabled feature or the core produces it",
                descriptor.token,
                consumed
            );
        }
    }

    for consumed in core_consumes {
        if !produced.contains(consumed) {
            debug!(
                "core consumes {:?} but no enabled feature produces it in this configuration",
                consumed
            );
        }
    }
}

async fn run_recompute(
    registry: Arc<Vec<FeatureDescriptor>>,
    prefetch: PrefetchResults,
    enabled: Arc<RwLock<EnabledSet>>,
    mut config_rx: watch::Receiver<Configuration>,
    bus: EventBus,
    core_produces: &'static [EventType],
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            result = stop_rx.changed() => {
                if result.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            result = config_rx.changed() => {
                if result.is_err() {
                    break;
                }
                let config = config_rx.borrow_and_update().clone();
                let notify: Vec<Arc<dyn Feature>> = {
                    let mut enabled = enabled.write().unwrap();
                    recompute(&registry, &config, &prefetch, &mut enabled, &bus, core_produces);
                    enabled.instances.values().cloned().collect()
                };
                for instance in notify {
                    instance.on_configuration_changed(&config);
                }
                trace!("feature set recomputed for configuration v{}", config.version);
            }
        }
    }
}
