//! Type definitions for reprise configuration

mod retry_config;

pub use retry_config::*;
