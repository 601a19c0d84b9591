//! Pause between progress checks.
//!
//! The orchestrator only talks to the `Delay` trait so tests can swap in
//! `NoDelay` and never wait on the wall clock.

use crate::control::AbortToken;
use std::time::{Duration, Instant};

/// Something that can wait between two progress checks.
pub trait Delay {
    /// Wait for `duration`. Returns `false` if `abort` was set before the
    /// wait finished; the caller must not issue another request in that case.
    fn pause(&self, duration: Duration, abort: &AbortToken) -> bool;
}

/// Blocking sleep on the current thread, woken early by the abort token.
///
/// Sleeps in slices of at most `slice` so a cancel is noticed promptly.
#[derive(Debug, Clone, Copy)]
pub struct ThreadSleep {
    slice: Duration,
}

impl Default for ThreadSleep {
    fn default() -> Self {
        Self {
            slice: Duration::from_millis(100),
        }
    }
}

impl ThreadSleep {
    pub fn with_slice(slice: Duration) -> Self {
        Self {
            slice: slice.max(Duration::from_millis(1)),
        }
    }
}

impl Delay for ThreadSleep {
    fn pause(&self, duration: Duration, abort: &AbortToken) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if abort.is_aborted() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(self.slice));
        }
    }
}

/// Returns immediately. Still honours the abort token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn pause(&self, _duration: Duration, abort: &AbortToken) -> bool {
        !abort.is_aborted()
    }
}
