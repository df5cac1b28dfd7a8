//! Deterministic clock for reproducible hook timing.

use formation_env::Clock;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Clock whose time only moves when told to.
///
/// - `advance_time` / `sleep` move time forward explicitly
/// - an optional auto-advance step is added on every `now()` read, so each
///   begin/end pair the registry measures sees a fixed, known interval
///
/// Clones share the same time.
pub struct ManualClock {
    /// Current virtual time (nanoseconds since clock creation)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Added to the virtual time on every read
    auto_advance_ns: u64,
}

impl ManualClock {
    /// Creates a clock frozen at zero.
    pub fn new() -> Self {
        Self {
            virtual_time_ns: Arc::new(Mutex::new(0)),
            auto_advance_ns: 0,
        }
    }

    /// Creates a clock that advances by `step` on every read.
    pub fn auto_advancing(step: Duration) -> Self {
        Self {
            virtual_time_ns: Arc::new(Mutex::new(0)),
            auto_advance_ns: step.as_nanos() as u64,
        }
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner);
        *time += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time in nanoseconds without advancing it.
    pub fn time_ns(&self) -> u64 {
        *self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ManualClock {
    fn clone(&self) -> Self {
        Self {
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            auto_advance_ns: self.auto_advance_ns,
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let mut time = self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner);
        *time += self.auto_advance_ns;
        Duration::from_nanos(*time)
    }

    fn sleep(&self, duration: Duration) {
        // Sleeping advances virtual time instead of blocking
        self.advance_time(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_time() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance_time(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));

        clock.sleep(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_auto_advancing_clock() {
        let clock = ManualClock::auto_advancing(Duration::from_millis(2));
        assert_eq!(clock.now(), Duration::from_millis(2));
        assert_eq!(clock.now(), Duration::from_millis(4));
        assert_eq!(clock.time_ns(), 4_000_000);
    }

    #[test]
    fn test_clone_shares_time() {
        let clock1 = ManualClock::new();
        let clock2 = clock1.clone();

        clock1.advance_time(Duration::from_secs(5));

        assert_eq!(clock1.now(), clock2.now());
    }
}
