//! Debounce primitive
//!
//! Coalesces rapid repeated triggers into a single delayed action carrying
//! the latest value. The debouncer itself holds no timer: callers pass the
//! current instant in and drive the deadline with whatever clock they run
//! on, which keeps it testable under a virtual clock.

use tokio::time::{Duration, Instant};

/// Latest-value-wins delayed slot
///
/// `schedule` cancels and replaces any pending value; the slot fires when
/// the deadline passes. Coalescing never loses the final state: whatever
/// was scheduled last is what fires.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    slot: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given delay window
    pub fn new(delay: Duration) -> Self {
        Self { delay, slot: None }
    }

    /// Schedule a value, replacing any pending one and restarting the window
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.slot = Some((value, now + self.delay));
    }

    /// The pending deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.slot.as_ref().map(|(_, at)| *at)
    }

    /// Whether a value is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Take the value if its deadline has passed
    pub fn fire_due(&mut self, now: Instant) -> Option<T> {
        match &self.slot {
            Some((_, at)) if *at <= now => self.slot.take().map(|(v, _)| v),
            _ => None,
        }
    }

    /// Take the pending value immediately, ignoring the deadline
    pub fn flush(&mut self) -> Option<T> {
        self.slot.take().map(|(v, _)| v)
    }

    /// Drop the pending value without firing
    pub fn cancel(&mut self) {
        self.slot = None;
    }
}
