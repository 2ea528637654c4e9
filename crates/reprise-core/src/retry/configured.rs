//! Configurable retry object
//!
//! [`Retry`] holds an operation together with a timeout, an attempt limit, a
//! pause, a failure kind filter and two pause hooks. Both limits apply at
//! once and whichever is reached first ends the run.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::kind::{Classify, KindFilter};

use super::executor::drive;
use super::observer::{NoOpObserver, RetryObserver};
use super::policy::{StopReason, Verdict};

type Callable<'a, T, E> = Box<dyn FnMut() -> std::result::Result<T, E> + 'a>;
type Filter<'a, E> = Box<dyn Fn(&E) -> bool + 'a>;
type HookFn<'a, E> = Box<dyn FnMut(&E) + 'a>;

/// Points around the pause where a callback can be attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Runs right before the pause, with the failure that caused it
    BeforePause,
    /// Runs right after the pause, with the failure that caused it
    AfterPause,
}

impl Hook {
    /// Every hook, in the order they fire
    pub const ALL: [Hook; 2] = [Hook::BeforePause, Hook::AfterPause];

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::BeforePause => "before-pause",
            Hook::AfterPause => "after-pause",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hook {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "before" | "before-pause" => Ok(Hook::BeforePause),
            "after" | "after-pause" => Ok(Hook::AfterPause),
            other => Err(Error::unknown_hook(other)),
        }
    }
}

/// A retry loop configured through setters
///
/// # Example
///
/// ```rust
/// use reprise_core::retry::{Hook, Retry};
/// use reprise_core::{ONE_MILLISECOND, ONE_SECOND};
///
/// let mut calls = 0;
/// let mut retry = Retry::create(
///     || {
///         calls += 1;
///         if calls < 3 {
///             Err(std::io::Error::other("busy"))
///         } else {
///             Ok(calls)
///         }
///     },
///     Some(ONE_SECOND),
///     Some(5),
///     ONE_MILLISECOND,
/// )
/// .unwrap();
/// retry.set_hook(Hook::BeforePause, |err| eprintln!("retrying after: {err}"));
///
/// assert_eq!(retry.run().unwrap(), 3);
/// ```
pub struct Retry<'a, T, E, C = SystemClock, O = NoOpObserver> {
    callable: Callable<'a, T, E>,
    timeout: Option<Duration>,
    count: Option<u32>,
    pause: Duration,
    filter: Filter<'a, E>,
    catches_all: bool,
    before_pause: Option<HookFn<'a, E>>,
    after_pause: Option<HookFn<'a, E>>,
    clock: C,
    observer: O,
}

impl<'a, T, E> Retry<'a, T, E> {
    /// Create a retry with no limits, no pause and no hooks
    pub fn new<F>(callable: F) -> Self
    where
        F: FnMut() -> std::result::Result<T, E> + 'a,
    {
        Self {
            callable: Box::new(callable),
            timeout: None,
            count: None,
            pause: Duration::ZERO,
            filter: Box::new(|_| true),
            catches_all: true,
            before_pause: None,
            after_pause: None,
            clock: SystemClock,
            observer: NoOpObserver,
        }
    }

    /// Create a retry with the given limits
    ///
    /// `None` leaves a limit unbounded. A count of zero is rejected.
    pub fn create<F>(
        callable: F,
        timeout: Option<Duration>,
        count: Option<u32>,
        pause: Duration,
    ) -> Result<Self>
    where
        F: FnMut() -> std::result::Result<T, E> + 'a,
    {
        let mut retry = Self::new(callable);
        retry.set_timeout(timeout).set_count(count)?.set_pause(pause);
        Ok(retry)
    }
}

impl<'a, T, E, C, O> Retry<'a, T, E, C, O> {
    /// Use a different clock for elapsed time and pauses
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Retry<'a, T, E, C2, O> {
        Retry {
            callable: self.callable,
            timeout: self.timeout,
            count: self.count,
            pause: self.pause,
            filter: self.filter,
            catches_all: self.catches_all,
            before_pause: self.before_pause,
            after_pause: self.after_pause,
            clock,
            observer: self.observer,
        }
    }

    /// Set the observer
    pub fn with_observer<O2: RetryObserver>(self, observer: O2) -> Retry<'a, T, E, C, O2> {
        Retry {
            callable: self.callable,
            timeout: self.timeout,
            count: self.count,
            pause: self.pause,
            filter: self.filter,
            catches_all: self.catches_all,
            before_pause: self.before_pause,
            after_pause: self.after_pause,
            clock: self.clock,
            observer,
        }
    }

    /// Replace the operation
    pub fn set_callable<F>(&mut self, callable: F) -> &mut Self
    where
        F: FnMut() -> std::result::Result<T, E> + 'a,
    {
        self.callable = Box::new(callable);
        self
    }

    /// Time limit measured from the first invocation, `None` when unbounded
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Set the time limit, `None` for unbounded
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Maximum number of invocations, `None` when unbounded
    pub fn count(&self) -> Option<u32> {
        self.count
    }

    /// Set the maximum number of invocations, `None` for unbounded
    pub fn set_count(&mut self, count: Option<u32>) -> Result<&mut Self> {
        if count == Some(0) {
            return Err(Error::ZeroAttempts);
        }
        self.count = count;
        Ok(self)
    }

    /// Pause between attempts
    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Set the pause between attempts
    pub fn set_pause(&mut self, pause: Duration) -> &mut Self {
        self.pause = pause;
        self
    }

    /// Whether every failure kind is retried
    pub fn catches_all(&self) -> bool {
        self.catches_all
    }

    /// Restrict retries to failures accepted by `filter`
    ///
    /// A filter that names no kind is rejected here rather than at run time.
    pub fn set_failure_kinds(&mut self, filter: KindFilter<E::Kind>) -> Result<&mut Self>
    where
        E: Classify,
        E::Kind: 'a,
    {
        if let KindFilter::Only(kinds) = &filter {
            if kinds.is_empty() {
                return Err(Error::EmptyKindFilter);
            }
        }
        self.catches_all = filter.is_any();
        self.filter = Box::new(move |failure: &E| filter.accepts(failure.kind()));
        Ok(self)
    }

    /// Restrict retries to the named failure kinds
    pub fn set_failure_kind_names<I, S>(&mut self, names: I) -> Result<&mut Self>
    where
        E: Classify,
        E::Kind: FromStr + 'a,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filter = KindFilter::parse(names)?;
        self.set_failure_kinds(filter)
    }

    /// Attach `callback` to `hook`, replacing any previous callback
    pub fn set_hook<F>(&mut self, hook: Hook, callback: F) -> &mut Self
    where
        F: FnMut(&E) + 'a,
    {
        *self.hook_slot(hook) = Some(Box::new(callback));
        self
    }

    /// Detach the callback from `hook`, if any
    pub fn remove_hook(&mut self, hook: Hook) -> &mut Self {
        *self.hook_slot(hook) = None;
        self
    }

    /// Whether a callback is attached to `hook`
    pub fn has_hook(&self, hook: Hook) -> bool {
        match hook {
            Hook::BeforePause => self.before_pause.is_some(),
            Hook::AfterPause => self.after_pause.is_some(),
        }
    }

    fn hook_slot(&mut self, hook: Hook) -> &mut Option<HookFn<'a, E>> {
        match hook {
            Hook::BeforePause => &mut self.before_pause,
            Hook::AfterPause => &mut self.after_pause,
        }
    }

    /// Invoke the operation until it succeeds or a limit is reached
    ///
    /// After each failure the checks run in this order: failure kind,
    /// timeout, attempt count. If none of them stops the run, the
    /// before-pause hook fires, the pause elapses and the after-pause hook
    /// fires before the next invocation.
    pub fn run(&mut self) -> std::result::Result<T, E>
    where
        C: Clock,
        O: RetryObserver,
        E: Display,
    {
        let Self {
            callable,
            timeout,
            count,
            pause,
            filter,
            before_pause,
            after_pause,
            clock,
            observer,
            ..
        } = self;

        drive(&*clock, &*observer, || callable(), |attempt| {
            if !filter(attempt.failure) {
                return Verdict::Stop(StopReason::NotCaught);
            }
            if timeout.is_some_and(|limit| attempt.elapsed > limit) {
                return Verdict::Stop(StopReason::TimedOut);
            }
            if count.is_some_and(|limit| attempt.number >= limit) {
                return Verdict::Stop(StopReason::AttemptsExhausted);
            }

            attempt.announce_retry();
            if let Some(hook) = before_pause.as_mut() {
                hook(attempt.failure);
            }
            attempt.sleep(*pause);
            if let Some(hook) = after_pause.as_mut() {
                hook(attempt.failure);
            }
            Verdict::Continue
        })
    }
}

impl<T, E, C: fmt::Debug, O: fmt::Debug> fmt::Debug for Retry<'_, T, E, C, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("timeout", &self.timeout)
            .field("count", &self.count)
            .field("pause", &self.pause)
            .field("catches_all", &self.catches_all)
            .field("before_pause", &self.before_pause.is_some())
            .field("after_pause", &self.after_pause.is_some())
            .field("clock", &self.clock)
            .field("observer", &self.observer)
            .finish()
    }
}
