//! Wall-clock abstraction used for hook timing and pacing.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of elapsed time.
///
/// The callback registry measures `dt_step` / `dt_sim` with a clock, and
/// pacing observers sleep through one. Swapping the clock makes timing
/// reproducible in tests without touching simulated time.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Blocks (or advances) for the given duration.
    fn sleep(&self, duration: Duration);
}

/// Clock backed by the operating system's monotonic timer.
pub struct WallClock {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl WallClock {
    /// Creates a new WallClock.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped clock for sharing between observers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
