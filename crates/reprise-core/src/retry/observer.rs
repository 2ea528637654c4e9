//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for watching a retry run
//! and a `TracingObserver` implementation that logs using the `tracing` crate.

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::policy::StopReason;

/// Observer trait for retry run events
///
/// Implement this trait to receive callbacks while a run is in progress.
/// Observers only watch; they cannot change the outcome of a run.
///
/// # Example
///
/// ```rust
/// use reprise_core::retry::{RetryObserver, StopReason};
/// use std::fmt::Display;
/// use std::time::Duration;
///
/// struct PrintObserver;
///
/// impl RetryObserver for PrintObserver {
///     fn on_retry(&self, attempt: u32, failure: &dyn Display, _elapsed: Duration) {
///         eprintln!("attempt {attempt} failed: {failure}");
///     }
///
///     fn on_success(&self, _invocations: u32, _elapsed: Duration) {}
///
///     fn on_stop(&self, _attempt: u32, _failure: &dyn Display, reason: StopReason, _elapsed: Duration) {
///         eprintln!("giving up: {reason}");
///     }
/// }
/// ```
pub trait RetryObserver {
    /// Called once per failed attempt that will be retried
    ///
    /// Fires before any pause or pause hook, or after the last policy when
    /// nothing pauses.
    ///
    /// # Arguments
    ///
    /// * `attempt` - Number of failed invocations so far (1-indexed)
    /// * `failure` - The failure of this attempt
    /// * `elapsed` - Time since the first invocation, measured at the failure
    fn on_retry(&self, attempt: u32, failure: &dyn Display, elapsed: Duration);

    /// Called when the operation succeeds
    ///
    /// # Arguments
    ///
    /// * `invocations` - Total invocations, including the successful one
    /// * `elapsed` - Time since the first invocation
    fn on_success(&self, invocations: u32, elapsed: Duration);

    /// Called when a policy stops the run and the failure is surfaced
    fn on_stop(&self, attempt: u32, failure: &dyn Display, reason: StopReason, elapsed: Duration);
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_retry(&self, _attempt: u32, _failure: &dyn Display, _elapsed: Duration) {}

    fn on_success(&self, _invocations: u32, _elapsed: Duration) {}

    fn on_stop(&self, _attempt: u32, _failure: &dyn Display, _reason: StopReason, _elapsed: Duration) {}
}

/// An observer that logs run events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_retry`: WARN
/// - `on_success`: INFO (after retries) or DEBUG (first invocation)
/// - `on_stop`: ERROR
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    ///
    /// # Arguments
    ///
    /// * `operation` - A descriptive name for the operation being retried
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_retry(&self, attempt: u32, failure: &dyn Display, elapsed: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %failure,
            elapsed_ms = elapsed.as_millis() as u64,
            "invocation failed, retrying"
        );
    }

    fn on_success(&self, invocations: u32, elapsed: Duration) {
        if invocations > 1 {
            tracing::info!(
                operation = %self.operation,
                invocations = invocations,
                elapsed_ms = elapsed.as_millis() as u64,
                "succeeded after retrying"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "succeeded on first invocation"
            );
        }
    }

    fn on_stop(&self, attempt: u32, failure: &dyn Display, reason: StopReason, elapsed: Duration) {
        tracing::error!(
            operation = %self.operation,
            attempt = attempt,
            error = %failure,
            reason = %reason,
            elapsed_ms = elapsed.as_millis() as u64,
            "giving up"
        );
    }
}

/// An observer that counts run events
///
/// Useful for testing.
#[derive(Debug, Default)]
pub struct StatsObserver {
    retries: AtomicU32,
    successes: AtomicU32,
    stops: AtomicU32,
    timeouts: AtomicU32,
    exhaustions: AtomicU32,
    uncaught: AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retries
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Number of successful runs
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Number of runs stopped for any reason
    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    /// Number of runs stopped by a timeout
    pub fn timeouts(&self) -> u32 {
        self.timeouts.load(Ordering::SeqCst)
    }

    /// Number of runs stopped by an attempt limit
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    /// Number of runs stopped by a failure kind that is not retried
    pub fn uncaught(&self) -> u32 {
        self.uncaught.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_retry(&self, _attempt: u32, _failure: &dyn Display, _elapsed: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _invocations: u32, _elapsed: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stop(&self, _attempt: u32, _failure: &dyn Display, reason: StopReason, _elapsed: Duration) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let counter = match reason {
            StopReason::TimedOut => &self.timeouts,
            StopReason::AttemptsExhausted => &self.exhaustions,
            StopReason::NotCaught => &self.uncaught,
            StopReason::Policy => return,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for &T {
    fn on_retry(&self, attempt: u32, failure: &dyn Display, elapsed: Duration) {
        (**self).on_retry(attempt, failure, elapsed)
    }

    fn on_success(&self, invocations: u32, elapsed: Duration) {
        (**self).on_success(invocations, elapsed)
    }

    fn on_stop(&self, attempt: u32, failure: &dyn Display, reason: StopReason, elapsed: Duration) {
        (**self).on_stop(attempt, failure, reason, elapsed)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Arc<T> {
    fn on_retry(&self, attempt: u32, failure: &dyn Display, elapsed: Duration) {
        (**self).on_retry(attempt, failure, elapsed)
    }

    fn on_success(&self, invocations: u32, elapsed: Duration) {
        (**self).on_success(invocations, elapsed)
    }

    fn on_stop(&self, attempt: u32, failure: &dyn Display, reason: StopReason, elapsed: Duration) {
        (**self).on_stop(attempt, failure, reason, elapsed)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_retry(&self, attempt: u32, failure: &dyn Display, elapsed: Duration) {
        (**self).on_retry(attempt, failure, elapsed)
    }

    fn on_success(&self, invocations: u32, elapsed: Duration) {
        (**self).on_success(invocations, elapsed)
    }

    fn on_stop(&self, attempt: u32, failure: &dyn Display, reason: StopReason, elapsed: Duration) {
        (**self).on_stop(attempt, failure, reason, elapsed)
    }
}
