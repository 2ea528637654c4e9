//! Clock abstraction
//!
//! The retry driver reads the time and sleeps only through a [`Clock`], so
//! timing behaviour can be tested deterministically with [`ManualClock`].

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time and of blocking pauses
///
/// # Example
///
/// ```rust
/// use reprise_core::{Clock, ManualClock, ONE_MILLISECOND};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.sleep(3 * ONE_MILLISECOND);
/// assert_eq!(clock.now() - start, 3 * ONE_MILLISECOND);
/// ```
pub trait Clock {
    /// Current point in time
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant::now`] and [`std::thread::sleep`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// A clock that only moves when told to
///
/// `sleep` returns immediately and advances the clock by the requested
/// duration. Operations under test may call [`ManualClock::advance`] to
/// simulate time spent doing work.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
    sleeps: AtomicU32,
}

/// Roughly a century; keeps `origin + offset` representable as an `Instant`
const MAX_OFFSET_NANOS: u64 = 100 * 365 * 24 * 60 * 60 * 1_000_000_000;

impl ManualClock {
    /// Furthest the clock can move from its origin
    pub const MAX_OFFSET: Duration = Duration::from_nanos(MAX_OFFSET_NANOS);

    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
            sleeps: AtomicU32::new(0),
        }
    }

    /// Move the clock forward
    ///
    /// The offset saturates at [`ManualClock::MAX_OFFSET`].
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .offset_nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |offset| {
                Some(offset.saturating_add(nanos).min(MAX_OFFSET_NANOS))
            });
    }

    /// Total time the clock has moved since creation
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }

    /// Number of `sleep` calls made so far
    pub fn sleeps(&self) -> u32 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_millis(2));
        clock.sleep(Duration::from_millis(3));

        assert_eq!(clock.now() - start, Duration::from_millis(5));
        assert_eq!(clock.sleeps(), 2);
    }

    #[test]
    fn test_manual_clock_advance_is_not_a_sleep() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_micros(10));

        assert_eq!(clock.elapsed(), Duration::from_micros(10));
        assert_eq!(clock.sleeps(), 0);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::new();
        let before = clock.now();

        clock.advance(Duration::MAX);
        let first = clock.now();
        clock.advance(Duration::MAX);

        assert!(first > before);
        assert_eq!(clock.now(), first);
        assert_eq!(clock.elapsed(), ManualClock::MAX_OFFSET);
    }

    #[test]
    fn test_shared_manual_clock() {
        let clock = Arc::new(ManualClock::new());
        let handle = clock.clone();

        handle.sleep(Duration::from_secs(1));

        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_system_clock_sleeps() {
        let clock = SystemClock;
        let start = clock.now();

        clock.sleep(Duration::from_millis(2));

        assert!(clock.now() - start >= Duration::from_millis(2));
    }
}
