//! Clock capability, injected into `MvScreen` instead of reaching for a
//! global mutable clock — lets tests drive double-tap timing deterministically.

use std::time::{Duration, Instant};

pub trait Clock: Send {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A settable clock for tests, mirroring the original test suite's
/// `advance_clock` helper.
pub struct VirtualClock {
    now: Instant,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            now: Instant::now(),
        }
    }

    pub fn advance(&mut self, d: Duration) {
        self.now += d;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.now
    }
}

pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);
