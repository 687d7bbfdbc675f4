//! The per-connection session controller
//!
//! One `Session` per client connection. State machine:
//! `Created -> Active -> Closed` (terminal). `Created` happens synchronously
//! inside `open` (configuration acquired, UI lifecycle built, surface
//! created, active flag set); `Closed` is reached by exactly one of an
//! explicit `close` or detection of client-process death, both converging on
//! the same idempotent teardown. The active flag is a compare-and-swapped
//! atomic, so teardown runs at most once even when the two paths race.

mod pipeline;


pub use pipeline::SELECTION_DEBOUNCE_WINDOW;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use alcove_core::prelude::*;
use alcove_core::{
    next_session_id, Configuration, DisplayId, Event, HostConfiguration, HostToken, MediaUri,
    NightMode, RuntimeEnv, SessionErrorKind, SessionId, ThemeOverride,
};

use crate::client::ClientCallback;
use crate::config::{ConfigurationManager, HostFeatureInfo};
use crate::embedded_state::{EmbeddedStateManager, HostBinding};
use crate::events::EventBus;
use crate::features::{built_in_registry, FeatureManager, CORE_CONSUMES, CORE_PRODUCES};
use crate::flags::FlagSource;
use crate::grants::MediaGrants;
use crate::prefetch::run_prefetch;
use crate::provider::MediaProvider;
use crate::selection::SelectionStore;
use crate::surface::SurfaceFactory;
use crate::ui::{spawn_ui, UiHandle};

/// Everything `Session::open` needs, assembled by the service from the open
/// request and the host-supplied collaborators.
pub struct SessionContext<G, P> {
    pub caller_package: String,
    pub caller_uid: u32,
    pub caller_label: Option<String>,
    pub host_token: HostToken,
    pub display_id: DisplayId,
    pub width: u32,
    pub height: u32,
    pub feature_info: HostFeatureInfo,
    pub client: ClientCallback,
    pub grants: Arc<G>,
    pub provider: Arc<P>,
    pub flag_source: Arc<dyn FlagSource>,
    pub surface_factory: Arc<dyn SurfaceFactory>,
}

/// One client's embedded picker session.
///
/// Not generic over the collaborators: the grant collaborator lives inside
/// the pipeline task, so handles to a session stay object-simple for the
/// service registry and the transport.
pub struct Session {
    id: SessionId,
    /// Monotonic: once false, permanently false. Compare-and-swapped so the
    /// explicit-close and client-death paths tear down at most once.
    active: AtomicBool,
    config: Arc<ConfigurationManager>,
    features: FeatureManager,
    embedded: EmbeddedStateManager,
    selection: Arc<SelectionStore>,
    bus: EventBus,
    ui: UiHandle,
    client: ClientCallback,
    /// Whether the theme was explicitly overridden at open time; if so, host
    /// night-mode changes no longer drive it.
    theme_overridden: bool,
    created_at: DateTime<Local>,
    closed_at: Mutex<Option<DateTime<Local>>>,
    shutdown_tx: watch::Sender<bool>,
    /// Background tasks aborted as a backstop after teardown
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Open a session: acquire and validate configuration, resolve prefetch,
    /// build the feature set, create the surface, and start the selection
    /// grant pipeline. Validation failures abort the open and propagate.
    pub async fn open<G, P>(ctx: SessionContext<G, P>) -> Result<Arc<Self>>
    where
        G: MediaGrants + Send + Sync + 'static,
        P: MediaProvider + Send + Sync + 'static,
    {
        let id = next_session_id();
        info!(
            "opening session {id} for {} (uid {})",
            ctx.caller_package, ctx.caller_uid
        );

        let config = Arc::new(ConfigurationManager::new(
            RuntimeEnv::Embedded,
            id,
            ctx.flag_source,
        ));
        config.set_caller(&ctx.caller_package, ctx.caller_uid, ctx.caller_label)?;
        config.set_host_feature_info(ctx.feature_info.clone())?;
        let snapshot = config.current();

        let prefetch = run_prefetch(ctx.provider.as_ref(), &snapshot).await;

        let bus = EventBus::default();
        let features = FeatureManager::new(
            config.subscribe(),
            prefetch,
            built_in_registry(),
            CORE_CONSUMES,
            CORE_PRODUCES,
            bus.clone(),
        );

        let (dark_theme, theme_overridden) = match ctx.feature_info.theme {
            ThemeOverride::Dark => (true, true),
            ThemeOverride::Light => (false, true),
            ThemeOverride::System => (false, false),
        };
        let embedded = EmbeddedStateManager::new(dark_theme);
        embedded.bind_host(HostBinding {
            token: ctx.host_token.clone(),
            display: ctx.display_id,
        });

        // Seed before the pipeline subscribes so pre-selected items land in
        // the first debounced grant batch.
        let selection = Arc::new(SelectionStore::new(config.subscribe()));
        selection.seed(&snapshot.pre_selected);

        let (ui, ui_task) = spawn_ui(ctx.surface_factory);
        ui.create_surface(ctx.display_id, ctx.host_token, ctx.width, ctx.height)
            .await?;

        let (shutdown_tx, _) = watch::channel(false);

        let session = Arc::new(Self {
            id,
            active: AtomicBool::new(true),
            config,
            features,
            embedded,
            selection: selection.clone(),
            bus: bus.clone(),
            ui: ui.clone(),
            client: ctx.client.clone(),
            theme_overridden,
            created_at: Local::now(),
            closed_at: Mutex::new(None),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        });

        let pipeline_task = tokio::spawn(pipeline::run(
            selection.subscribe(),
            ui.lifecycle(),
            ctx.grants,
            ctx.caller_uid,
            ctx.client.clone(),
            bus.clone(),
        ));
        let consumer_task = tokio::spawn(run_core_event_consumer(
            bus.subscribe(),
            ctx.client.clone(),
            session.shutdown_tx.subscribe(),
        ));
        session.spawn_death_watcher(ctx.client);

        let mut tasks = session.tasks.lock().unwrap();
        tasks.push(ui_task);
        tasks.push(pipeline_task);
        tasks.push(consumer_task);
        drop(tasks);

        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn configuration(&self) -> Configuration {
        self.config.current()
    }

    pub fn features(&self) -> &FeatureManager {
        &self.features
    }

    pub fn embedded_state(&self) -> &EmbeddedStateManager {
        &self.embedded
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Local>> {
        *self.closed_at.lock().unwrap()
    }

    // ─────────────────────────────────────────────────────────
    // Notification handlers (the inbound RPC surface)
    // ─────────────────────────────────────────────────────────

    /// Resume or pause the UI lifecycle. Hidden drops below `Started`, so
    /// the selection grant subscription pauses.
    pub async fn notify_visibility_changed(&self, visible: bool) {
        if !self.guard_active().await {
            return;
        }
        if let Err(e) = self.ui.set_visibility(visible).await {
            warn!("session {}: visibility hand-off failed: {e}", self.id);
        }
    }

    /// Relayout the surface and force a recompose.
    pub async fn notify_resized(&self, width: u32, height: u32) {
        if !self.guard_active().await {
            return;
        }
        if let Err(e) = self.ui.relayout(width, height).await {
            warn!("session {}: relayout hand-off failed: {e}", self.id);
            return;
        }
        self.embedded.trigger_recompose();
    }

    /// Host configuration delta: recompute the theme from the night-mode
    /// bits unless it was explicitly overridden at open, and forward the
    /// delta to the UI.
    pub async fn notify_configuration_changed(&self, host_config: HostConfiguration) {
        if !self.guard_active().await {
            return;
        }
        if !self.theme_overridden {
            let dark = matches!(host_config.night_mode, NightMode::Yes);
            self.embedded.set_dark_theme(dark);
        }
        self.embedded.trigger_recompose();
    }

    pub async fn notify_picker_expanded(&self, expanded: bool) {
        if !self.guard_active().await {
            return;
        }
        self.embedded.set_expanded(expanded);
    }

    /// Remove the given uris from the live selection; the standard diff
    /// pipeline performs the actual revokes.
    pub async fn request_revoke_uri_permission(&self, uris: &[MediaUri]) {
        if !self.guard_active().await {
            return;
        }
        for uri in uris {
            if !self.selection.remove(uri) {
                debug!("session {}: revoke requested for unselected uri {uri}", self.id);
            }
        }
    }

    /// Close the session and tear down all owned resources. Idempotent: the
    /// losing path of a close/close or close/client-death race only reports
    /// a session error to the client.
    pub async fn close(&self) {
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("session {}: close on an already-closed session", self.id);
            self.client
                .on_session_error(SessionErrorKind::SessionClosed)
                .await;
            return;
        }

        info!("closing session {}", self.id);
        let _ = self.shutdown_tx.send(true);
        self.config.shutdown();
        self.features.shutdown();

        // Synchronous hand-off: the surface is released and the lifecycle is
        // destroyed before we return. The pipeline observes `Destroyed` and
        // exits on its own; the aborts below are a backstop.
        if let Err(e) = self.ui.teardown().await {
            debug!("session {}: UI executor already gone: {e}", self.id);
        }

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock().unwrap());
        for task in tasks {
            task.abort();
        }

        *self.closed_at.lock().unwrap() = Some(Local::now());
    }

    /// True when the session is active; otherwise reports a session error to
    /// the client and returns false. Calls on a closed session never throw.
    async fn guard_active(&self) -> bool {
        if self.is_active() {
            return true;
        }
        self.client
            .on_session_error(SessionErrorKind::SessionClosed)
            .await;
        false
    }

    /// Watch for client-process death (the transport drops its receiver) and
    /// funnel it into the same close path as an explicit request. Holds only
    /// a weak reference, so a forgotten transport cannot leak the session.
    fn spawn_death_watcher(self: &Arc<Self>, client: ClientCallback) {
        let weak = Arc::downgrade(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = client.closed() => {
                    if let Some(session) = weak.upgrade() {
                        info!("session {}: client died, closing", session.id);
                        session.close().await;
                    }
                }
                _ = shutdown_rx.changed() => {}
            }
        });
    }
}

/// Core event consumer: bridges `SelectionConfirmed` to the client's
/// selection-complete callback and absorbs core navigation events.
async fn run_core_event_consumer(
    mut events_rx: broadcast::Receiver<Event>,
    client: ClientCallback,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            event = events_rx.recv() => {
                match event {
                    Ok(Event::SelectionConfirmed { item_count }) => {
                        debug!("selection confirmed with {item_count} item(s)");
                        client.on_selection_complete().await;
                    }
                    Ok(Event::BrowseToAlbum { album_id }) => {
                        debug!("navigating to album {album_id}");
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("core event consumer lagged, skipped {skipped} event(s)");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}
