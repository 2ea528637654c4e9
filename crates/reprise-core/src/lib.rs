//! # reprise-core
//!
//! Core library for reprise providing:
//! - A bounded retry engine driven by composable policies
//! - A configurable retry object with pause hooks
//! - Failure classification by kind
//! - YAML configuration for retry settings

pub mod clock;
pub mod config;
pub mod error;
pub mod kind;
pub mod retry;
pub mod types;
pub mod units;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ConfigLoader;
pub use error::{Error, Result};
pub use kind::{Classify, KindFilter};
pub use types::{RetryProfiles, RetrySettings};
pub use units::{ONE_MICROSECOND, ONE_MILLISECOND, ONE_SECOND};
