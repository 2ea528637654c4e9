//! Time units
//!
//! Durations are plain [`Duration`]s with microsecond resolution. The
//! constants let callers write limits in human terms, e.g. `5 * ONE_SECOND`
//! or `250 * ONE_MILLISECOND`. Configuration files store microsecond counts.

use std::time::Duration;

/// Microseconds in one millisecond
pub const MICROS_PER_MILLISECOND: u64 = 1_000;

/// Microseconds in one second
pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// One microsecond, the smallest unit reprise deals in
pub const ONE_MICROSECOND: Duration = Duration::from_micros(1);

/// One millisecond
pub const ONE_MILLISECOND: Duration = Duration::from_micros(MICROS_PER_MILLISECOND);

/// One second
pub const ONE_SECOND: Duration = Duration::from_micros(MICROS_PER_SECOND);

/// Convert a microsecond count into a [`Duration`]
pub const fn micros(count: u64) -> Duration {
    Duration::from_micros(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_scale() {
        assert_eq!(5 * ONE_SECOND, Duration::from_secs(5));
        assert_eq!(250 * ONE_MILLISECOND, Duration::from_millis(250));
        assert_eq!(1000 * ONE_MICROSECOND, ONE_MILLISECOND);
        assert_eq!(micros(MICROS_PER_SECOND), ONE_SECOND);
    }
}
