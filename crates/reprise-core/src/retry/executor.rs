//! Retry execution engine
//!
//! This module provides the retry loop itself. The loop invokes the
//! operation, hands every failure to the policies and either retries or
//! returns the failure unchanged.

use std::fmt::Display;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};

use super::observer::{NoOpObserver, RetryObserver};
use super::policy::{max_attempts, pause, timeout, Attempt, Policy, Verdict};

/// Run `op` until it succeeds or `decide` stops the run
///
/// Each call owns its counter and start time; nothing outlives the call.
pub(crate) fn drive<T, E, F, D, C, O>(
    clock: &C,
    observer: &O,
    mut op: F,
    mut decide: D,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    D: FnMut(&Attempt<'_, E>) -> Verdict,
    C: Clock,
    O: RetryObserver + ?Sized,
    E: Display,
{
    let start = clock.now();
    let mut failed: u32 = 0;

    loop {
        match op() {
            Ok(value) => {
                let elapsed = clock.now().saturating_duration_since(start);
                observer.on_success(failed.saturating_add(1), elapsed);
                return Ok(value);
            }
            Err(failure) => {
                let elapsed = clock.now().saturating_duration_since(start);
                failed = failed.saturating_add(1);

                let verdict = {
                    let notice = || observer.on_retry(failed, &failure, elapsed);
                    let attempt =
                        Attempt::new(&failure, failed, elapsed, clock).with_retry_notice(&notice);
                    let verdict = decide(&attempt);
                    if !verdict.is_stop() {
                        attempt.announce_retry();
                    }
                    verdict
                };

                if let Verdict::Stop(reason) = verdict {
                    observer.on_stop(failed, &failure, reason, elapsed);
                    return Err(failure);
                }
            }
        }
    }
}

/// Repeat an operation until it succeeds or one of `policies` stops it
///
/// Policies run left to right after every failure. Without a policy that
/// stops, the operation is retried forever. The failure that made a policy
/// stop is returned as is.
///
/// # Example
///
/// ```rust
/// use reprise_core::retry::{max_attempts, pause, repeat, timeout};
/// use reprise_core::{ONE_MILLISECOND, ONE_SECOND};
///
/// let mut calls = 0;
/// let result = repeat(
///     || {
///         calls += 1;
///         if calls < 3 {
///             Err("not yet")
///         } else {
///             Ok(calls)
///         }
///     },
///     (timeout(10 * ONE_SECOND), max_attempts(5), pause(ONE_MILLISECOND)),
/// );
///
/// assert_eq!(result, Ok(3));
/// ```
pub fn repeat<T, E, F, P>(op: F, policies: P) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: Policy<E>,
    E: Display,
{
    Repeat::new(policies).run(op)
}

/// Repeat until success or until more than `limit` has elapsed, pausing
/// `between` each attempt
pub fn retry_timeout<T, E, F>(op: F, limit: Duration, between: Duration) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    repeat(op, (timeout(limit), pause(between)))
}

/// Repeat until success or until `count` invocations have failed, pausing
/// `between` each attempt
pub fn retry_count<T, E, F>(op: F, count: u32, between: Duration) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    repeat(op, (max_attempts(count), pause(between)))
}

/// A retry loop with its policies, clock and observer
///
/// # Example
///
/// ```rust
/// use reprise_core::retry::{max_attempts, pause, Repeat, TracingObserver};
/// use reprise_core::ONE_MILLISECOND;
///
/// let mut retry = Repeat::new((max_attempts(3), pause(ONE_MILLISECOND)))
///     .with_observer(TracingObserver::new("probe"));
///
/// let value: Result<u8, String> = retry.run(|| Ok(1));
/// assert_eq!(value, Ok(1));
/// ```
#[derive(Debug, Clone)]
pub struct Repeat<P, C = SystemClock, O = NoOpObserver> {
    policies: P,
    clock: C,
    observer: O,
}

impl<P> Repeat<P> {
    /// Create a retry loop on the system clock without an observer
    pub fn new(policies: P) -> Self {
        Self {
            policies,
            clock: SystemClock,
            observer: NoOpObserver,
        }
    }
}

impl<P, C, O> Repeat<P, C, O> {
    /// Use a different clock for elapsed time and pauses
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Repeat<P, C2, O> {
        Repeat {
            policies: self.policies,
            clock,
            observer: self.observer,
        }
    }

    /// Set the observer
    pub fn with_observer<O2: RetryObserver>(self, observer: O2) -> Repeat<P, C, O2> {
        Repeat {
            policies: self.policies,
            clock: self.clock,
            observer,
        }
    }

    /// Mutable access to the policies, for reconfiguring between runs
    pub fn policies_mut(&mut self) -> &mut P {
        &mut self.policies
    }

    /// Run `op` until it succeeds or a policy stops the run
    pub fn run<T, E, F>(&mut self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: Policy<E>,
        C: Clock,
        O: RetryObserver,
        E: Display,
    {
        let policies = &mut self.policies;
        drive(&self.clock, &self.observer, op, |attempt| policies.check(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::retry::observer::StatsObserver;
    use crate::retry::policy::{catch_only, policy_fn, StopReason};
    use std::io;
    use std::sync::Arc;

    fn failing(kind: io::ErrorKind) -> io::Error {
        io::Error::new(kind, "boom")
    }

    #[test]
    fn test_immediate_success() {
        let observer = Arc::new(StatsObserver::new());
        let mut calls = 0;

        let result: Result<&str, io::Error> = Repeat::new(max_attempts(3))
            .with_clock(ManualClock::new())
            .with_observer(observer.clone())
            .run(|| {
                calls += 1;
                Ok("done")
            });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 1);
        assert_eq!(observer.successes(), 1);
        assert_eq!(observer.retries(), 0);
    }

    #[test]
    fn test_failure_is_returned_verbatim() {
        let result: Result<(), io::Error> = Repeat::new(max_attempts(2))
            .with_clock(ManualClock::new())
            .run(|| Err(failing(io::ErrorKind::ConnectionReset)));

        let err = result.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_policies_see_increasing_attempt_numbers() {
        let clock = Arc::new(ManualClock::new());
        let mut seen = Vec::new();

        let result: Result<(), io::Error> = Repeat::new((
            policy_fn(|attempt: &Attempt<'_, io::Error>| {
                seen.push((attempt.number, attempt.elapsed));
                Verdict::Continue
            }),
            max_attempts(3),
            pause(Duration::from_millis(2)),
        ))
        .with_clock(clock.clone())
        .run(|| Err(failing(io::ErrorKind::Other)));

        assert!(result.is_err());
        assert_eq!(
            seen,
            vec![
                (1, Duration::ZERO),
                (2, Duration::from_millis(2)),
                (3, Duration::from_millis(4)),
            ]
        );
        assert_eq!(clock.sleeps(), 2);
    }

    #[test]
    fn test_uncaught_kind_bypasses_pause() {
        let clock = Arc::new(ManualClock::new());
        let observer = Arc::new(StatsObserver::new());
        let mut calls = 0;

        let result: Result<(), io::Error> = Repeat::new((
            catch_only([io::ErrorKind::TimedOut]),
            max_attempts(5),
            pause(Duration::from_millis(1)),
        ))
        .with_clock(clock.clone())
        .with_observer(observer.clone())
        .run(|| {
            calls += 1;
            Err(failing(io::ErrorKind::PermissionDenied))
        });

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(calls, 1);
        assert_eq!(clock.sleeps(), 0);
        assert_eq!(observer.uncaught(), 1);
    }

    #[test]
    fn test_runs_do_not_share_counters() {
        let mut retry = Repeat::new(max_attempts(3)).with_clock(ManualClock::new());
        let mut calls = 0;

        let first: Result<(), io::Error> = retry.run(|| {
            calls += 1;
            Err(failing(io::ErrorKind::Other))
        });
        assert!(first.is_err());
        assert_eq!(calls, 3);

        calls = 0;
        let second: Result<(), io::Error> = retry.run(|| {
            calls += 1;
            Err(failing(io::ErrorKind::Other))
        });
        assert!(second.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_policies_mut_between_runs() {
        let mut retry = Repeat::new(max_attempts(2)).with_clock(ManualClock::new());
        let mut calls = 0;

        let _: Result<(), io::Error> = retry.run(|| {
            calls += 1;
            Err(failing(io::ErrorKind::Other))
        });
        assert_eq!(calls, 2);

        *retry.policies_mut() = max_attempts(4);
        calls = 0;
        let _: Result<(), io::Error> = retry.run(|| {
            calls += 1;
            Err(failing(io::ErrorKind::Other))
        });
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_custom_stop_reason_reaches_observer() {
        let observer = StatsObserver::new();

        let result: Result<(), String> = Repeat::new(policy_fn(|_: &Attempt<'_, String>| {
            Verdict::Stop(StopReason::Policy)
        }))
        .with_clock(ManualClock::new())
        .with_observer(&observer)
        .run(|| Err("nope".to_string()));

        assert_eq!(result.unwrap_err(), "nope");
        assert_eq!(observer.stops(), 1);
        assert_eq!(observer.exhaustions(), 0);
    }
}
