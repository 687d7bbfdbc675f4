//! # alcove-session - Session Orchestration
//!
//! Per-client session runtime for the Alcove embedded picker. A host process
//! opens a session over its own transport; this crate owns everything behind
//! that boundary:
//!
//! - [`ConfigurationManager`] - one authoritative, versioned configuration
//!   snapshot reduced from intent parameters, caller identity, host feature
//!   info, and a debounced device-flag source
//! - [`FeatureManager`] - the enabled, priority-ordered feature set computed
//!   from the configuration stream, with producer/consumer contract checking
//! - [`Session`] - the per-connection controller: UI lifecycle, presentation
//!   surface, and the debounced selection-to-permission-grant bridge
//! - [`PickerService`] - the RPC-facing session factory a transport binding
//!   calls into
//!
//! The UI rendering tree, the storage layer, and the transport itself stay
//! host-side behind the narrow traits in [`grants`], [`provider`],
//! [`surface`], and [`client`].

pub mod client;
pub mod config;
pub mod embedded_state;
pub mod events;
pub mod features;
pub mod flags;
pub mod grants;
pub mod lifecycle;
pub mod prefetch;
pub mod provider;
pub mod selection;
pub mod service;
pub mod session;
pub mod surface;
pub mod ui;

pub use client::ClientCallback;
pub use config::{ConfigurationManager, HostFeatureInfo, PickerIntentParams};
pub use embedded_state::{EmbeddedState, EmbeddedStateManager, HostBinding};
pub use events::EventBus;
pub use features::{
    built_in_registry, Feature, FeatureDescriptor, FeatureManager, FeatureToken, Location,
    Priority, CORE_CONSUMES, CORE_PRODUCES,
};
pub use flags::{FlagKey, FlagSource, StaticFlagSource, TomlFlagSource};
pub use grants::MediaGrants;
pub use lifecycle::{LifecycleState, UiLifecycle};
pub use prefetch::{run_prefetch, PrefetchKey, PrefetchResults};
pub use provider::{MediaPage, MediaProvider, PageRequest, ProviderInfo};
pub use selection::{SelectionSnapshot, SelectionStore};
pub use service::{OpenSessionRequest, PickerDeps, PickerService};
pub use session::Session;
pub use surface::{BufferSurface, BufferSurfaceFactory, PresentationSurface, SurfaceFactory};
pub use ui::{UiCommand, UiHandle};
