//! Resilience presets for the Targetprocess transport

use super::retry::RetryConfig;
use std::time::Duration;

/// Retry and monitoring settings shared by every transport request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub monitoring: MonitoringConfig,
}

/// Request monitoring configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringConfig {
    /// Attach an `X-Correlation-Id` header to every request
    pub correlation_ids: bool,
    /// Log method, path, status and elapsed time of every attempt
    pub request_logging: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            correlation_ids: true,
            request_logging: true,
        }
    }
}

impl ResilienceConfig {
    /// Create a new builder for ResilienceConfig
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// Fewer, slower retries and quiet request logs
    pub fn conservative() -> Self {
        Self {
            retry: RetryConfig::conservative(),
            monitoring: MonitoringConfig {
                correlation_ids: true,
                request_logging: false,
            },
        }
    }

    /// More retries with a flatter backoff curve
    pub fn development() -> Self {
        Self {
            retry: RetryConfig::aggressive(),
            monitoring: MonitoringConfig::default(),
        }
    }

    /// Single attempt, no timeout, no monitoring
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig {
                attempt_timeout: None,
                ..RetryConfig::none()
            },
            monitoring: MonitoringConfig {
                correlation_ids: false,
                request_logging: false,
            },
        }
    }
}

/// Consuming builder starting from [`ResilienceConfig::default`]
#[derive(Debug, Default)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure retry behavior
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set max retries after the first attempt
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.retry.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.retry.max_delay = delay;
        self
    }

    /// Per-attempt timeout, `None` to wait indefinitely
    pub fn attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.retry.attempt_timeout = timeout;
        self
    }

    /// Configure monitoring
    pub fn monitoring_config(mut self, monitoring: MonitoringConfig) -> Self {
        self.config.monitoring = monitoring;
        self
    }

    /// Enable/disable correlation IDs
    pub fn correlation_ids(mut self, enabled: bool) -> Self {
        self.config.monitoring.correlation_ids = enabled;
        self
    }

    /// Enable/disable request logging
    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.config.monitoring.request_logging = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}
