//! The session's UI actor -- the designated "main" execution context
//!
//! One dedicated task per session owns the UI lifecycle sender and the
//! presentation surface. Everything else talks to it through a mailbox;
//! every command carries a oneshot ack, so cross-context calls are
//! synchronous hand-offs and lifecycle transitions stay ordered relative to
//! surface operations.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use alcove_core::prelude::*;
use alcove_core::{DisplayId, HostToken};

use crate::lifecycle::{LifecycleState, UiLifecycle};
use crate::surface::{PresentationSurface, SurfaceFactory};

const MAILBOX_CAPACITY: usize = 16;

/// Commands the UI actor accepts
pub enum UiCommand {
    CreateSurface {
        display: DisplayId,
        host: HostToken,
        width: u32,
        height: u32,
        reply: oneshot::Sender<Result<()>>,
    },
    SetVisibility {
        visible: bool,
        reply: oneshot::Sender<()>,
    },
    Relayout {
        width: u32,
        height: u32,
        reply: oneshot::Sender<()>,
    },
    Teardown {
        reply: oneshot::Sender<()>,
    },
}

/// Caller side of the UI actor. Methods block until the actor has executed
/// the command.
#[derive(Clone)]
pub struct UiHandle {
    command_tx: mpsc::Sender<UiCommand>,
    lifecycle_rx: watch::Receiver<LifecycleState>,
}

impl UiHandle {
    pub fn lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle_rx.clone()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        *self.lifecycle_rx.borrow()
    }

    pub async fn create_surface(
        &self,
        display: DisplayId,
        host: HostToken,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let (reply, ack) = oneshot::channel();
        self.send(UiCommand::CreateSurface {
            display,
            host,
            width,
            height,
            reply,
        })
        .await?;
        ack.await.map_err(|_| Error::ExecutorGone)?
    }

    pub async fn set_visibility(&self, visible: bool) -> Result<()> {
        let (reply, ack) = oneshot::channel();
        self.send(UiCommand::SetVisibility { visible, reply }).await?;
        ack.await.map_err(|_| Error::ExecutorGone)
    }

    pub async fn relayout(&self, width: u32, height: u32) -> Result<()> {
        let (reply, ack) = oneshot::channel();
        self.send(UiCommand::Relayout {
            width,
            height,
            reply,
        })
        .await?;
        ack.await.map_err(|_| Error::ExecutorGone)
    }

    /// Release the surface and destroy the lifecycle. The actor exits after
    /// acknowledging; later calls get `ExecutorGone`.
    pub async fn teardown(&self) -> Result<()> {
        let (reply, ack) = oneshot::channel();
        self.send(UiCommand::Teardown { reply }).await?;
        ack.await.map_err(|_| Error::ExecutorGone)
    }

    async fn send(&self, command: UiCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Error::ExecutorGone)
    }
}

/// Spawn the UI actor for one session.
pub fn spawn_ui(factory: Arc<dyn SurfaceFactory>) -> (UiHandle, JoinHandle<()>) {
    let lifecycle = UiLifecycle::new();
    let lifecycle_rx = lifecycle.subscribe();
    let (command_tx, command_rx) = mpsc::channel(MAILBOX_CAPACITY);

    let task = tokio::spawn(run_actor(lifecycle, factory, command_rx));

    (
        UiHandle {
            command_tx,
            lifecycle_rx,
        },
        task,
    )
}

async fn run_actor(
    lifecycle: UiLifecycle,
    factory: Arc<dyn SurfaceFactory>,
    mut command_rx: mpsc::Receiver<UiCommand>,
) {
    let mut surface: Option<Box<dyn PresentationSurface>> = None;

    while let Some(command) = command_rx.recv().await {
        match command {
            UiCommand::CreateSurface {
                display,
                host,
                width,
                height,
                reply,
            } => {
                let result = match factory.create(display, &host, width, height) {
                    Ok(created) => {
                        lifecycle.create();
                        surface = Some(created);
                        let display_id = display;
                        debug!("surface created: display {:?}, {width}x{height}", display_id);
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            UiCommand::SetVisibility { visible, reply } => {
                if visible {
                    lifecycle.resume();
                } else {
                    lifecycle.stop_to_created();
                }
                let _ = reply.send(());
            }
            UiCommand::Relayout {
                width,
                height,
                reply,
            } => {
                if let Some(surface) = surface.as_mut() {
                    surface.relayout(width, height);
                }
                let _ = reply.send(());
            }
            UiCommand::Teardown { reply } => {
                teardown(&lifecycle, &mut surface);
                let _ = reply.send(());
                break;
            }
        }
    }

    // All handles dropped without an explicit teardown still releases the
    // surface exactly once.
    teardown(&lifecycle, &mut surface);
}

fn teardown(lifecycle: &UiLifecycle, surface: &mut Option<Box<dyn PresentationSurface>>) {
    if let Some(mut surface) = surface.take() {
        surface.release();
    }
    lifecycle.destroy();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::BufferSurfaceFactory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handle() -> (UiHandle, JoinHandle<()>, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        let factory = Arc::new(BufferSurfaceFactory::with_release_counter(releases.clone()));
        let (ui, task) = spawn_ui(factory);
        (ui, task, releases)
    }

    #[tokio::test]
    async fn test_create_and_visibility() {
        let (ui, _task, _) = handle();
        assert_eq!(ui.lifecycle_state(), LifecycleState::Initialized);

        ui.create_surface(DisplayId(0), HostToken("h".into()), 800, 600)
            .await
            .unwrap();
        assert_eq!(ui.lifecycle_state(), LifecycleState::Created);

        ui.set_visibility(true).await.unwrap();
        assert_eq!(ui.lifecycle_state(), LifecycleState::Resumed);

        ui.set_visibility(false).await.unwrap();
        assert_eq!(ui.lifecycle_state(), LifecycleState::Created);
    }

    #[tokio::test]
    async fn test_create_failure_propagates() {
        let (ui, _task, _) = handle();
        let err = ui
            .create_surface(DisplayId(0), HostToken("h".into()), 0, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SurfaceCreation { .. }));
    }

    #[tokio::test]
    async fn test_teardown_releases_once_and_stops_actor() {
        let (ui, task, releases) = handle();
        ui.create_surface(DisplayId(0), HostToken("h".into()), 10, 10)
            .await
            .unwrap();

        ui.teardown().await.unwrap();
        assert_eq!(ui.lifecycle_state(), LifecycleState::Destroyed);
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        // The actor has exited; further hand-offs fail cleanly.
        let err = ui.relayout(1, 1).await.unwrap_err();
        assert!(matches!(err, Error::ExecutorGone));

        task.await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropping_handles_releases_surface() {
        let (ui, task, releases) = handle();
        ui.create_surface(DisplayId(0), HostToken("h".into()), 10, 10)
            .await
            .unwrap();
        drop(ui);
        task.await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
