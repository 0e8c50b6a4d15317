//! Production resilience features
//!
//! Provides the retry policy and request monitoring settings used by the
//! transport for every Targetprocess API call.

pub mod config;
pub mod retry;

pub use config::{MonitoringConfig, ResilienceConfig, ResilienceConfigBuilder};
pub use retry::{RequestError, RetryConfig, RetryPolicy, RetryableError};
