//! The selection-to-permission-grant bridge
//!
//! One strictly sequential task per session: no two diff computations for
//! the same session ever run concurrently, and the running fold over
//! "previous snapshot" never resets or reorders.
//!
//! Selection toggles can arrive faster than grant IPC round-trips, and the
//! intermediate states are not individually meaningful to the client, so
//! bursts are debounced: the timer re-arms on every change and fires only
//! after the window passes quietly, delivering the *final* state of the
//! burst.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use alcove_core::prelude::*;
use alcove_core::{Event, GrantDecision, MediaUri};

use crate::client::ClientCallback;
use crate::events::EventBus;
use crate::grants::MediaGrants;
use crate::lifecycle::LifecycleState;
use crate::selection::SelectionSnapshot;

/// Quiet period collapsing selection-change bursts into one diff
pub const SELECTION_DEBOUNCE_WINDOW: Duration = Duration::from_millis(400);

pub(super) async fn run<G>(
    mut selection_rx: watch::Receiver<SelectionSnapshot>,
    mut lifecycle_rx: watch::Receiver<LifecycleState>,
    grants: Arc<G>,
    uid: u32,
    client: ClientCallback,
    bus: EventBus,
) where
    G: MediaGrants + Send + Sync,
{
    let mut previous = SelectionSnapshot::default();
    let mut pending: Option<(SelectionSnapshot, Instant)> = None;

    loop {
        let state = *lifecycle_rx.borrow_and_update();
        if state == LifecycleState::Destroyed {
            break;
        }
        if !state.is_at_least_started() {
            // Backgrounded: cancel any armed window. The previous snapshot is
            // kept, so resuming never re-grants an unchanged selection;
            // changes made while hidden are still picked up below because the
            // watch channel marks them unseen.
            pending = None;
            if lifecycle_rx.changed().await.is_err() {
                break;
            }
            continue;
        }

        // Covers resume-after-pause and the pre-seeded selection at startup:
        // anything the fold has not accounted for arms the window.
        if pending.is_none() {
            let current = selection_rx.borrow_and_update().clone();
            if current != previous {
                pending = Some((current, Instant::now() + SELECTION_DEBOUNCE_WINDOW));
            }
        }

        let deadline = pending
            .as_ref()
            .map(|(_, deadline)| *deadline)
            .unwrap_or_else(Instant::now);

        tokio::select! {
            result = lifecycle_rx.changed() => {
                if result.is_err() {
                    break;
                }
            }
            result = selection_rx.changed() => {
                match result {
                    Ok(()) => {
                        let current = selection_rx.borrow_and_update().clone();
                        pending = Some((current, Instant::now() + SELECTION_DEBOUNCE_WINDOW));
                    }
                    // Store dropped: the session is tearing down
                    Err(_) => break,
                }
            }
            _ = tokio::time::sleep_until(deadline), if pending.is_some() => {
                if let Some((current, _)) = pending.take() {
                    apply_diff(&mut previous, current, grants.as_ref(), uid, &client, &bus).await;
                }
            }
        }
    }

    debug!("selection grant pipeline stopped");
}

/// One debounced emission: diff against the running previous snapshot, grant
/// the additions, revoke the removals, notify the client once per non-empty
/// batch, advance the fold.
async fn apply_diff<G>(
    previous: &mut SelectionSnapshot,
    current: SelectionSnapshot,
    grants: &G,
    uid: u32,
    client: &ClientCallback,
    bus: &EventBus,
) where
    G: MediaGrants + Send + Sync,
{
    let (added, removed) = previous.diff(&current);

    let mut granted: Vec<MediaUri> = Vec::with_capacity(added.len());
    let mut grant_failures = 0usize;
    for uri in added {
        match grants.grant(uid, &uri).await {
            GrantDecision::Granted => granted.push(uri),
            GrantDecision::Denied => {
                warn!("grant denied for {uri}; continuing with the rest of the batch");
                grant_failures += 1;
            }
        }
    }

    let mut revoked: Vec<MediaUri> = Vec::with_capacity(removed.len());
    for uri in removed {
        match grants.revoke(uid, &uri).await {
            GrantDecision::Granted => revoked.push(uri),
            GrantDecision::Denied => {
                warn!("revoke denied for {uri}; continuing with the rest of the batch");
            }
        }
    }

    if grant_failures > 0 {
        bus.dispatch(Event::ShowSnackbar {
            message: format!("Couldn't grant access to {grant_failures} item(s)"),
        });
    }

    client.on_uri_permission_granted(granted).await;
    client.on_uri_permission_revoked(revoked).await;

    *previous = current;
}
