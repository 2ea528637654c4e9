//! Bounded retry engine
//!
//! This module re-invokes a fallible operation until it succeeds or a policy
//! decides to give up. The failure that ends a run is handed back untouched.
//!
//! # Features
//!
//! - Composable policies: timeout, max attempts, failure kind filter, pause
//! - Tuple and runtime-built (`PolicyChain`) policy composition
//! - A setter-based `Retry` object with before/after pause hooks
//! - Observable runs via the `RetryObserver` trait
//! - Built-in `TracingObserver` for logging
//! - Pluggable `Clock` for deterministic tests
//!
//! # Example
//!
//! ```rust
//! use reprise_core::retry::{max_attempts, pause, repeat, timeout};
//! use reprise_core::{ONE_MILLISECOND, ONE_SECOND};
//!
//! let value = repeat(
//!     || Ok::<_, std::io::Error>("ready"),
//!     (timeout(10 * ONE_SECOND), max_attempts(5), pause(100 * ONE_MILLISECOND)),
//! );
//! assert_eq!(value.unwrap(), "ready");
//! ```

mod configured;
mod executor;
mod observer;
mod policy;

pub use configured::{Hook, Retry};
pub use executor::{repeat, retry_count, retry_timeout, Repeat};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use policy::{
    catch_only, max_attempts, pause, policy_fn, timeout, Attempt, CatchOnly, MaxAttempts, Pause,
    Policy, PolicyChain, PolicyFn, StopReason, Timeout, Verdict,
};
