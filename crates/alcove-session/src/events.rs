//! The per-session typed event bus
//!
//! Features and the core communicate through dispatched [`Event`]s. The bus
//! carries the set of event types currently registered as *produced* (kept
//! fresh by the feature manager); in debug builds dispatching an event nobody
//! declares as produced logs an error. The hard producer/consumer failure is
//! construction-time validation in the feature manager, never a dispatch-time
//! panic.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use alcove_core::prelude::*;
use alcove_core::{Event, EventType};

/// Default broadcast capacity; slow consumers observe `Lagged` past this.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Typed pub/sub bus for one session
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    registered_producers: Arc<RwLock<HashSet<EventType>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registered_producers: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Dispatch an event to all current subscribers.
    ///
    /// Send errors (no subscribers right now) are fine and ignored.
    pub fn dispatch(&self, event: Event) {
        if cfg!(debug_assertions) {
            let producers = self.registered_producers.read().unwrap();
            if !producers.is_empty() && !producers.contains(&event.kind()) {
                error!(
                    "event {:?} dispatched but no enabled feature or the core declares it as produced",
                    event.kind()
                );
            }
        }
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Replace the registered-producers set. Called by the feature manager
    /// whenever the enabled feature set changes.
    pub fn set_registered_producers(&self, producers: HashSet<EventType>) {
        *self.registered_producers.write().unwrap() = producers;
    }

    pub fn registered_producers(&self) -> HashSet<EventType> {
        self.registered_producers.read().unwrap().clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_reaches_subscribers() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.dispatch(Event::ShowSnackbar {
            message: "saved".into(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), EventType::ShowSnackbar);
    }

    #[test]
    fn test_dispatch_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.dispatch(Event::SelectionConfirmed { item_count: 1 });
    }

    #[test]
    fn test_registered_producers_replaced_wholesale() {
        let bus = EventBus::default();
        bus.set_registered_producers(HashSet::from([EventType::ShowSnackbar]));
        assert!(bus.registered_producers().contains(&EventType::ShowSnackbar));

        bus.set_registered_producers(HashSet::from([EventType::BrowseToAlbum]));
        let producers = bus.registered_producers();
        assert!(!producers.contains(&EventType::ShowSnackbar));
        assert!(producers.contains(&EventType::BrowseToAlbum));
    }
}
