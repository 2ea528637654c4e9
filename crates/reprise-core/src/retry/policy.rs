//! Retry policies
//!
//! A policy looks at a failed attempt and either lets the retry loop carry on
//! or stops it. Policies compose: tuples, [`PolicyChain`], `Box<P>` and
//! `&mut P` are policies themselves and evaluate their members left to
//! right, stopping at the first member that says stop.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::clock::Clock;
use crate::kind::{Classify, KindFilter};

/// A failed attempt, as seen by a policy
pub struct Attempt<'a, E: ?Sized> {
    /// The failure returned by the operation
    pub failure: &'a E,
    /// Number of failed invocations so far in this run (the first is 1)
    pub number: u32,
    /// Time since the first invocation of this run
    pub elapsed: Duration,
    clock: &'a dyn Clock,
    retry_notice: Option<&'a dyn Fn()>,
    announced: Cell<bool>,
}

impl<'a, E: ?Sized> Attempt<'a, E> {
    pub(crate) fn new(failure: &'a E, number: u32, elapsed: Duration, clock: &'a dyn Clock) -> Self {
        Self {
            failure,
            number,
            elapsed,
            clock,
            retry_notice: None,
            announced: Cell::new(false),
        }
    }

    /// Run `notice` the first time this attempt is known to be retried
    pub(crate) fn with_retry_notice(mut self, notice: &'a dyn Fn()) -> Self {
        self.retry_notice = Some(notice);
        self
    }

    /// Report that the run carries on after this attempt
    ///
    /// Only the first call has an effect.
    pub(crate) fn announce_retry(&self) {
        if self.announced.replace(true) {
            return;
        }
        if let Some(notice) = self.retry_notice {
            notice();
        }
    }

    /// Block on the run's clock
    ///
    /// The retry is announced before the clock sleeps.
    pub fn sleep(&self, duration: Duration) {
        self.announce_retry();
        self.clock.sleep(duration);
    }
}

impl<E: ?Sized + fmt::Debug> fmt::Debug for Attempt<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attempt")
            .field("failure", &self.failure)
            .field("number", &self.number)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

/// Why a run gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// More time than the timeout has passed since the first invocation
    TimedOut,
    /// The maximum number of attempts has been reached
    AttemptsExhausted,
    /// The failure's kind is not one that gets retried
    NotCaught,
    /// A custom policy stopped the run
    Policy,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::TimedOut => "timeout elapsed",
            StopReason::AttemptsExhausted => "attempts exhausted",
            StopReason::NotCaught => "failure kind not retried",
            StopReason::Policy => "stopped by policy",
        };
        f.write_str(reason)
    }
}

/// Outcome of evaluating a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Let the next policy decide, or retry if this was the last one
    Continue,
    /// Surface the failure to the caller
    Stop(StopReason),
}

impl Verdict {
    /// Whether this verdict ends the run
    pub fn is_stop(&self) -> bool {
        matches!(self, Verdict::Stop(_))
    }
}

/// Decides, after a failed attempt, whether to keep retrying
///
/// # Example
///
/// ```rust
/// use reprise_core::retry::{Attempt, Policy, StopReason, Verdict};
///
/// /// Stop as soon as the failure message mentions "fatal".
/// struct StopOnFatal;
///
/// impl Policy<String> for StopOnFatal {
///     fn check(&mut self, attempt: &Attempt<'_, String>) -> Verdict {
///         if attempt.failure.contains("fatal") {
///             Verdict::Stop(StopReason::Policy)
///         } else {
///             Verdict::Continue
///         }
///     }
/// }
/// ```
pub trait Policy<E: ?Sized> {
    /// Evaluate one failed attempt
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict;
}

impl<E: ?Sized, P: Policy<E> + ?Sized> Policy<E> for Box<P> {
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
        (**self).check(attempt)
    }
}

impl<E: ?Sized, P: Policy<E> + ?Sized> Policy<E> for &mut P {
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
        (**self).check(attempt)
    }
}

/// Stops once more than `limit` has elapsed since the first invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    limit: Duration,
}

/// Stop retrying once `limit` has been exceeded
pub fn timeout(limit: Duration) -> Timeout {
    Timeout { limit }
}

impl<E: ?Sized> Policy<E> for Timeout {
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
        if attempt.elapsed > self.limit {
            Verdict::Stop(StopReason::TimedOut)
        } else {
            Verdict::Continue
        }
    }
}

/// Stops once the number of failed invocations reaches `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxAttempts {
    limit: u32,
}

/// Stop retrying after `limit` failed invocations
///
/// The operation runs at most `limit` times. A limit of zero behaves like one.
pub fn max_attempts(limit: u32) -> MaxAttempts {
    MaxAttempts { limit }
}

impl<E: ?Sized> Policy<E> for MaxAttempts {
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
        if attempt.number >= self.limit {
            Verdict::Stop(StopReason::AttemptsExhausted)
        } else {
            Verdict::Continue
        }
    }
}

/// Stops immediately on failures whose kind is not accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchOnly<K> {
    filter: KindFilter<K>,
}

/// Only retry failures of the given kinds
///
/// An empty list catches nothing: every failure is surfaced at once.
pub fn catch_only<K>(kinds: impl IntoIterator<Item = K>) -> CatchOnly<K> {
    CatchOnly {
        filter: KindFilter::Only(kinds.into_iter().collect()),
    }
}

impl<K> CatchOnly<K> {
    /// Build from an existing filter
    pub fn new(filter: KindFilter<K>) -> Self {
        Self { filter }
    }
}

impl<E> Policy<E> for CatchOnly<E::Kind>
where
    E: Classify + ?Sized,
{
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
        if self.filter.accepts(attempt.failure.kind()) {
            Verdict::Continue
        } else {
            Verdict::Stop(StopReason::NotCaught)
        }
    }
}

/// Blocks for a fixed duration every time it is evaluated
///
/// Place it after the policies that may stop the run, otherwise the final
/// failed attempt pays for a pause nobody waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pause {
    duration: Duration,
}

/// Wait `duration` before the next attempt
pub fn pause(duration: Duration) -> Pause {
    Pause { duration }
}

impl<E: ?Sized> Policy<E> for Pause {
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
        attempt.sleep(self.duration);
        Verdict::Continue
    }
}

/// A policy backed by a closure
pub struct PolicyFn<F, E: ?Sized> {
    f: F,
    _failure: PhantomData<fn(&E)>,
}

/// Wrap a closure as a policy
pub fn policy_fn<E, F>(f: F) -> PolicyFn<F, E>
where
    E: ?Sized,
    F: FnMut(&Attempt<'_, E>) -> Verdict,
{
    PolicyFn {
        f,
        _failure: PhantomData,
    }
}

impl<E, F> Policy<E> for PolicyFn<F, E>
where
    E: ?Sized,
    F: FnMut(&Attempt<'_, E>) -> Verdict,
{
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
        (self.f)(attempt)
    }
}

impl<E: ?Sized> Policy<E> for () {
    fn check(&mut self, _attempt: &Attempt<'_, E>) -> Verdict {
        Verdict::Continue
    }
}

macro_rules! tuple_policy {
    ($($name:ident $idx:tt),+) => {
        impl<E: ?Sized, $($name: Policy<E>),+> Policy<E> for ($($name,)+) {
            fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
                $(
                    if let Verdict::Stop(reason) = self.$idx.check(attempt) {
                        return Verdict::Stop(reason);
                    }
                )+
                Verdict::Continue
            }
        }
    };
}

tuple_policy!(A 0);
tuple_policy!(A 0, B 1);
tuple_policy!(A 0, B 1, C 2);
tuple_policy!(A 0, B 1, C 2, D 3);
tuple_policy!(A 0, B 1, C 2, D 3, F 4);
tuple_policy!(A 0, B 1, C 2, D 3, F 4, G 5);
tuple_policy!(A 0, B 1, C 2, D 3, F 4, G 5, H 6);
tuple_policy!(A 0, B 1, C 2, D 3, F 4, G 5, H 6, I 7);

/// An ordered list of boxed policies assembled at runtime
///
/// # Example
///
/// ```rust
/// use reprise_core::retry::{repeat, PolicyChain};
/// use reprise_core::{ONE_MILLISECOND, ONE_SECOND};
///
/// let chain = PolicyChain::<std::io::Error>::new()
///     .timeout(ONE_SECOND)
///     .max_attempts(3)
///     .pause(ONE_MILLISECOND);
///
/// let value = repeat(|| Ok::<_, std::io::Error>(7), chain);
/// assert_eq!(value.unwrap(), 7);
/// ```
pub struct PolicyChain<'a, E: ?Sized> {
    policies: Vec<Box<dyn Policy<E> + 'a>>,
}

impl<'a, E: ?Sized> PolicyChain<'a, E> {
    /// Create an empty chain (retries forever)
    pub fn new() -> Self {
        Self {
            policies: Vec::new(),
        }
    }

    /// Append a policy
    pub fn push<P: Policy<E> + 'a>(mut self, policy: P) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    /// Append a [`Timeout`]
    pub fn timeout(self, limit: Duration) -> Self {
        self.push(timeout(limit))
    }

    /// Append a [`MaxAttempts`]
    pub fn max_attempts(self, limit: u32) -> Self {
        self.push(max_attempts(limit))
    }

    /// Append a [`Pause`]
    pub fn pause(self, duration: Duration) -> Self {
        self.push(pause(duration))
    }

    /// Append a [`CatchOnly`] built from `filter`
    pub fn catch_only(self, filter: KindFilter<E::Kind>) -> Self
    where
        E: Classify,
        E::Kind: 'a,
    {
        self.push(CatchOnly::new(filter))
    }

    /// Number of policies in the chain
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the chain has no policies
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl<E: ?Sized> Default for PolicyChain<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> fmt::Debug for PolicyChain<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyChain")
            .field("len", &self.policies.len())
            .finish()
    }
}

impl<E: ?Sized> Policy<E> for PolicyChain<'_, E> {
    fn check(&mut self, attempt: &Attempt<'_, E>) -> Verdict {
        for policy in self.policies.iter_mut() {
            if let Verdict::Stop(reason) = policy.check(attempt) {
                return Verdict::Stop(reason);
            }
        }
        Verdict::Continue
    }
}
