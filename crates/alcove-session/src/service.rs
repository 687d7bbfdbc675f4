//! The picker service -- the RPC-facing session factory
//!
//! A transport binding deserializes an open request, pairs it with a client
//! callback channel, and calls [`PickerService::open_session`]. The service
//! holds only weak references to the sessions it opened: a session's
//! lifetime is governed by its own close paths (explicit close or client
//! death), never by registry membership.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};

use alcove_core::prelude::*;
use alcove_core::{DisplayId, HostToken, SessionId};

use crate::client::ClientCallback;
use crate::config::HostFeatureInfo;
use crate::flags::FlagSource;
use crate::grants::MediaGrants;
use crate::provider::MediaProvider;
use crate::session::{Session, SessionContext};
use crate::surface::SurfaceFactory;

/// Wire form of a session-open request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    pub caller_package: String,
    pub caller_uid: u32,
    #[serde(default)]
    pub caller_label: Option<String>,
    pub host_token: HostToken,
    pub display_id: DisplayId,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub feature_info: HostFeatureInfo,
}

/// Host-supplied collaborators shared by every session the service opens.
pub struct PickerDeps<G, P> {
    pub grants: Arc<G>,
    pub provider: Arc<P>,
    pub flag_source: Arc<dyn FlagSource>,
    pub surface_factory: Arc<dyn SurfaceFactory>,
}

/// Session factory and registry.
pub struct PickerService<G, P> {
    deps: PickerDeps<G, P>,
    sessions: Mutex<HashMap<SessionId, Weak<Session>>>,
}

impl<G, P> PickerService<G, P>
where
    G: MediaGrants + Send + Sync + 'static,
    P: MediaProvider + Send + Sync + 'static,
{
    pub fn new(deps: PickerDeps<G, P>) -> Self {
        Self {
            deps,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a session for one client connection and register it.
    ///
    /// Validation failures inside `Session::open` propagate to the caller;
    /// nothing is registered on failure.
    pub async fn open_session(
        &self,
        request: OpenSessionRequest,
        client: ClientCallback,
    ) -> Result<Arc<Session>> {
        let session = Session::open(SessionContext {
            caller_package: request.caller_package,
            caller_uid: request.caller_uid,
            caller_label: request.caller_label,
            host_token: request.host_token,
            display_id: request.display_id,
            width: request.width,
            height: request.height,
            feature_info: request.feature_info,
            client,
            grants: self.deps.grants.clone(),
            provider: self.deps.provider.clone(),
            flag_source: self.deps.flag_source.clone(),
            surface_factory: self.deps.surface_factory.clone(),
        })
        .await?;

        let mut sessions = self.sessions.lock().unwrap();
        sessions.retain(|_, weak| weak.strong_count() > 0);
        sessions.insert(session.id(), Arc::downgrade(&session));
        debug!(
            "session {} registered ({} live)",
            session.id(),
            sessions.len()
        );

        Ok(session)
    }

    /// Look up a live session by id.
    pub fn session(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .unwrap()
            .get(&id)
            .and_then(Weak::upgrade)
            .filter(|session| session.is_active())
    }

    /// Number of registered sessions still alive and active.
    pub fn session_count(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.retain(|_, weak| weak.strong_count() > 0);
        sessions
            .values()
            .filter_map(Weak::upgrade)
            .filter(|session| session.is_active())
            .count()
    }

    /// Close every live session. Used at host shutdown.
    pub async fn close_all(&self) {
        // Collect under the lock, close outside it: close() awaits the UI
        // hand-off and must not hold the registry lock across that.
        let live: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.lock().unwrap();
            let live = sessions.values().filter_map(Weak::upgrade).collect();
            sessions.clear();
            live
        };

        for session in live {
            if !session.is_active() {
                continue;
            }
            info!("closing session {} at service shutdown", session.id());
            session.close().await;
        }
    }
}
