//! The outbound client notification surface
//!
//! A session never talks to its transport directly; it pushes [`ClientEvent`]s
//! into a channel the transport binding drains. The channel doubles as the
//! peer-death signal: when the client process dies, the transport drops the
//! receiver and `closed()` resolves.

use tokio::sync::mpsc;

use alcove_core::prelude::*;
use alcove_core::{ClientEvent, MediaUri, SessionErrorKind};

/// Handle for notifying one remote client.
///
/// Batched notifications are never sent with an empty batch. Send failures
/// mean the client is already gone; they are logged and never propagated.
#[derive(Clone)]
pub struct ClientCallback {
    sender: mpsc::Sender<ClientEvent>,
}

impl ClientCallback {
    pub fn new(sender: mpsc::Sender<ClientEvent>) -> Self {
        Self { sender }
    }

    pub async fn on_uri_permission_granted(&self, uris: Vec<MediaUri>) {
        if uris.is_empty() {
            return;
        }
        self.send(ClientEvent::UriPermissionGranted { uris }).await;
    }

    pub async fn on_uri_permission_revoked(&self, uris: Vec<MediaUri>) {
        if uris.is_empty() {
            return;
        }
        self.send(ClientEvent::UriPermissionRevoked { uris }).await;
    }

    pub async fn on_selection_complete(&self) {
        self.send(ClientEvent::SelectionComplete).await;
    }

    pub async fn on_session_error(&self, kind: SessionErrorKind) {
        self.send(ClientEvent::SessionError { kind }).await;
    }

    /// Resolves when the client side is gone (receiver dropped). This is the
    /// generic stand-in for a binder-death notification.
    pub async fn closed(&self) {
        self.sender.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, event: ClientEvent) {
        if self.sender.send(event).await.is_err() {
            debug!("client callback channel closed; dropping notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batches_are_never_sent() {
        let (tx, mut rx) = mpsc::channel(4);
        let client = ClientCallback::new(tx);

        client.on_uri_permission_granted(Vec::new()).await;
        client.on_uri_permission_revoked(Vec::new()).await;
        assert!(rx.try_recv().is_err());

        client
            .on_uri_permission_granted(vec![MediaUri::from("content://media/1")])
            .await;
        assert!(matches!(
            rx.try_recv().unwrap(),
            ClientEvent::UriPermissionGranted { .. }
        ));
    }

    #[tokio::test]
    async fn test_closed_resolves_on_receiver_drop() {
        let (tx, rx) = mpsc::channel::<ClientEvent>(1);
        let client = ClientCallback::new(tx);
        assert!(!client.is_closed());

        drop(rx);
        client.closed().await;
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_closed_pending_until_receiver_drops() {
        let (tx, rx) = mpsc::channel::<ClientEvent>(1);
        let client = ClientCallback::new(tx);

        // Manual poll: the death future must not resolve while the receiver
        // is alive, and must wake on the drop rather than on a later poll.
        let mut closed = tokio_test::task::spawn(client.closed());
        tokio_test::assert_pending!(closed.poll());

        drop(rx);
        assert!(closed.is_woken());
        tokio_test::assert_ready!(closed.poll());
    }

    #[tokio::test]
    async fn test_send_after_close_does_not_panic() {
        let (tx, rx) = mpsc::channel::<ClientEvent>(1);
        let client = ClientCallback::new(tx);
        drop(rx);
        client.on_selection_complete().await;
    }
}
