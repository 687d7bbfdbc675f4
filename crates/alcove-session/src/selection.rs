//! The per-session selection store
//!
//! Insertion order is significant: when ordered selection is enabled the
//! order items were picked is the order they are reported in snapshots and
//! grant batches.

use std::collections::HashSet;
use std::sync::Mutex;

use tokio::sync::watch;

use alcove_core::prelude::*;
use alcove_core::{Configuration, MediaUri};

/// An immutable, insertion-ordered snapshot of the current selection.
///
/// Readers always work from a snapshot copy; the live store is never iterated
/// under concurrent mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSnapshot {
    order: Vec<MediaUri>,
    members: HashSet<MediaUri>,
}

impl SelectionSnapshot {
    pub fn contains(&self, uri: &MediaUri) -> bool {
        self.members.contains(uri)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MediaUri> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Items present in `newer` but not in `self`, and items present in
    /// `self` but not in `newer`. Both lists preserve insertion order.
    pub fn diff(&self, newer: &SelectionSnapshot) -> (Vec<MediaUri>, Vec<MediaUri>) {
        let added = newer
            .order
            .iter()
            .filter(|uri| !self.members.contains(uri))
            .cloned()
            .collect();
        let removed = self
            .order
            .iter()
            .filter(|uri| !newer.members.contains(uri))
            .cloned()
            .collect();
        (added, removed)
    }
}

/// Mutable selection state, owned exclusively by one session.
///
/// All mutation goes through `add`/`remove`/`toggle`/`clear`; every mutation
/// publishes a fresh snapshot on the watch channel. The selection limit
/// follows the live configuration snapshot.
pub struct SelectionStore {
    inner: Mutex<SelectionSnapshot>,
    snapshot_tx: watch::Sender<SelectionSnapshot>,
    config_rx: watch::Receiver<Configuration>,
}

impl SelectionStore {
    pub fn new(config_rx: watch::Receiver<Configuration>) -> Self {
        let (snapshot_tx, _) = watch::channel(SelectionSnapshot::default());
        Self {
            inner: Mutex::new(SelectionSnapshot::default()),
            snapshot_tx,
            config_rx,
        }
    }

    fn limit(&self) -> usize {
        self.config_rx.borrow().selection_limit
    }

    /// Add an item. Returns false (and leaves the selection untouched) when
    /// the item is already selected or the selection is at the limit.
    pub fn add(&self, uri: MediaUri) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.members.contains(&uri) || inner.order.len() >= self.limit() {
            return false;
        }
        inner.members.insert(uri.clone());
        inner.order.push(uri);
        self.publish(&inner);
        true
    }

    /// Remove an item. Returns false when it was not selected.
    pub fn remove(&self, uri: &MediaUri) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.members.remove(uri) {
            return false;
        }
        inner.order.retain(|existing| existing != uri);
        self.publish(&inner);
        true
    }

    /// Toggle membership. Returns true if the item is selected afterwards.
    pub fn toggle(&self, uri: MediaUri) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.members.remove(&uri) {
            inner.order.retain(|existing| existing != &uri);
            self.publish(&inner);
            false
        } else {
            if inner.order.len() >= self.limit() {
                return false;
            }
            inner.members.insert(uri.clone());
            inner.order.push(uri);
            self.publish(&inner);
            true
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.is_empty() {
            return;
        }
        inner.order.clear();
        inner.members.clear();
        self.publish(&inner);
    }

    /// A copy of the current selection.
    pub fn snapshot(&self) -> SelectionSnapshot {
        self.inner.lock().unwrap().clone()
    }

    /// Subscribe to selection changes. The current snapshot is the channel's
    /// initial value.
    pub fn subscribe(&self) -> watch::Receiver<SelectionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Seed the store from the configuration's pre-selected list, capped at
    /// the selection limit. Called once at session open, before the grant
    /// pipeline subscribes.
    pub fn seed(&self, pre_selected: &[MediaUri]) {
        let limit = self.limit();
        let mut inner = self.inner.lock().unwrap();
        for uri in pre_selected {
            if inner.order.len() >= limit {
                warn!(
                    "pre-selection truncated at the selection limit ({limit}); dropping the rest"
                );
                break;
            }
            if inner.members.insert(uri.clone()) {
                inner.order.push(uri.clone());
            }
        }
        self.publish(&inner);
    }

    fn publish(&self, inner: &SelectionSnapshot) {
        // Receivers may all be gone during teardown; that is fine.
        let _ = self.snapshot_tx.send(inner.clone());
    }
}
