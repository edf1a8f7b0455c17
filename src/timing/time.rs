//! Injected wall clock.
//!
//! The oscillator never reads the system clock directly. Production hosts
//! use [`SystemTimeSource`]; tests and browser hosts that receive frame
//! timestamps from outside use [`ManualTimeSource`].

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

/// A monotonic wall clock in milliseconds.
pub trait TimeSource: fmt::Debug {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Externally driven clock. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<f64>>,
}

impl ManualTimeSource {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl fmt::Debug for ManualTimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimeSource")
            .field("now", &self.now.get())
            .finish()
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clones_share_time() {
        let time = ManualTimeSource::new(10.0);
        let handle = time.clone();
        handle.advance(5.0);
        assert_eq!(time.now_ms(), 15.0);
        time.set(100.0);
        assert_eq!(handle.now_ms(), 100.0);
    }
}
