//! Presentation surfaces
//!
//! A session composites into exactly one surface, created on the session's UI
//! actor and released exactly once at teardown. Real compositors implement
//! [`PresentationSurface`] host-side; [`BufferSurface`] is the in-tree
//! software implementation and the test double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alcove_core::prelude::*;
use alcove_core::{DisplayId, HostToken};

/// An off-screen surface a session renders into.
///
/// `release` must be idempotent; a session may race an explicit close against
/// client-death teardown and both funnel into one release.
pub trait PresentationSurface: Send + std::fmt::Debug {
    fn relayout(&mut self, width: u32, height: u32);

    fn release(&mut self);

    fn is_released(&self) -> bool;

    fn size(&self) -> (u32, u32);
}

/// Creates surfaces for new sessions
pub trait SurfaceFactory: Send + Sync {
    fn create(
        &self,
        display: DisplayId,
        host: &HostToken,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PresentationSurface>>;
}

/// Software-buffer surface: tracks dimensions, a relayout generation, and the
/// released flag.
#[derive(Debug)]
pub struct BufferSurface {
    display: DisplayId,
    width: u32,
    height: u32,
    relayout_generation: u64,
    released: bool,
    release_counter: Option<Arc<AtomicUsize>>,
}

impl BufferSurface {
    pub fn new(display: DisplayId, width: u32, height: u32) -> Self {
        Self {
            display,
            width,
            height,
            relayout_generation: 0,
            released: false,
            release_counter: None,
        }
    }

    /// Attach a shared counter bumped on every release. Used by tests to
    /// assert the surface is released exactly once.
    pub fn with_release_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.release_counter = Some(counter);
        self
    }

    pub fn display(&self) -> DisplayId {
        self.display
    }

    pub fn relayout_generation(&self) -> u64 {
        self.relayout_generation
    }
}

impl PresentationSurface for BufferSurface {
    fn relayout(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.relayout_generation += 1;
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(counter) = &self.release_counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        debug!("buffer surface released (display {:?})", self.display);
    }

    fn is_released(&self) -> bool {
        self.released
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Factory for [`BufferSurface`]
#[derive(Default)]
pub struct BufferSurfaceFactory {
    release_counter: Option<Arc<AtomicUsize>>,
}

impl BufferSurfaceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release_counter(counter: Arc<AtomicUsize>) -> Self {
        Self {
            release_counter: Some(counter),
        }
    }
}

impl SurfaceFactory for BufferSurfaceFactory {
    fn create(
        &self,
        display: DisplayId,
        _host: &HostToken,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PresentationSurface>> {
        if width == 0 || height == 0 {
            return Err(Error::surface_creation(format!(
                "zero-sized surface requested: {width}x{height}"
            )));
        }
        let mut surface = BufferSurface::new(display, width, height);
        if let Some(counter) = &self.release_counter {
            surface = surface.with_release_counter(counter.clone());
        }
        Ok(Box::new(surface))
    }
}
