//! Most-recent-request-wins render orchestration.
//!
//! Every redraw request takes a ticket from a monotonically increasing generation counter.
//! A render that finishes after a newer request was issued is discarded rather than
//! published; renders are never interrupted mid-flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

/// Identifies one render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderTicket(u64);

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Published<T> {
    generation: u64,
    result: Arc<T>,
}

/// Tracks render requests and keeps the result of the newest one that completed.
#[derive(Debug)]
pub struct RenderCoordinator<T> {
    generation: AtomicU64,
    discarded: AtomicU64,
    latest: Mutex<Option<Published<T>>>,
}

impl<T> Default for RenderCoordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RenderCoordinator<T> {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            latest: Mutex::new(None),
        }
    }

    /// Registers a new request, superseding every earlier one.
    pub fn begin(&self) -> RenderTicket {
        RenderTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether no newer request has been issued since `ticket`.
    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Publishes `result` if `ticket` is still the newest request. Returns whether it was
    /// published.
    pub fn complete(&self, ticket: RenderTicket, result: T) -> bool {
        let mut latest = self.latest.lock();
        let newer_published = latest
            .as_ref()
            .is_some_and(|published| published.generation > ticket.0);
        if !self.is_current(ticket) || newer_published {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            warn!(
                generation = ticket.0,
                current = self.generation.load(Ordering::SeqCst),
                "Discarding superseded render"
            );
            return false;
        }
        *latest = Some(Published {
            generation: ticket.0,
            result: Arc::new(result),
        });
        true
    }

    /// Runs `render` under a fresh ticket. `Ok(None)` means the render finished but a newer
    /// request had superseded it.
    pub fn run<F>(&self, render: F) -> Result<Option<Arc<T>>>
    where
        F: FnOnce() -> Result<T>,
    {
        let ticket = self.begin();
        let started = Instant::now();
        let result = render()?;
        debug!(
            generation = ticket.0,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Render finished"
        );
        if self.complete(ticket, result) {
            Ok(self.latest())
        } else {
            Ok(None)
        }
    }

    /// The newest published result.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.latest.lock().as_ref().map(|p| Arc::clone(&p.result))
    }

    pub fn latest_generation(&self) -> Option<u64> {
        self.latest.lock().as_ref().map(|p| p.generation)
    }

    /// How many finished renders were thrown away as superseded.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}
