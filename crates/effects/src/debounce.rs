use std::time::{Duration, Instant};

use crate::layout::Viewport;

/// Trailing-edge debounce for resize notifications.
#[derive(Debug, Clone)]
pub struct ResizeDebouncer {
    delay: Duration,
    pending: Option<(Viewport, Instant)>,
}

impl ResizeDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Records a new size; restarts the quiet period.
    pub fn push(&mut self, viewport: Viewport, now: Instant) {
        self.pending = Some((viewport, now));
    }

    /// Returns the latest size once it has been stable for the delay.
    pub fn poll(&mut self, now: Instant) -> Option<Viewport> {
        match self.pending {
            Some((viewport, at)) if now.saturating_duration_since(at) >= self.delay => {
                self.pending = None;
                Some(viewport)
            }
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, at)| at + self.delay)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
