//! Configuration loading
//!
//! Settings come from a TOML file (`~/.config/targetprocess-cli/config.toml`
//! by default, or `--config`) and are overridden by `TP_*` environment
//! variables, which may themselves come from a `.env` file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::AuthConfig;
use crate::api::resilience::{MonitoringConfig, ResilienceConfig, RetryConfig};
use crate::services::PaginationConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account URL, e.g. `https://acme.tpondemand.com`
    pub base_url: Option<String>,
    pub auth: Option<AuthConfig>,
    pub request_timeout_secs: Option<u64>,
    pub retry: RetrySettings,
    pub monitoring: MonitoringSettings,
    pub pagination: PaginationSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
    pub jitter: bool,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        let mut codes: Vec<u16> = defaults.retryable_status_codes.into_iter().collect();
        codes.sort_unstable();
        Self {
            max_retries: defaults.max_retries,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            factor: defaults.factor,
            jitter: defaults.jitter,
            retryable_status_codes: codes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub correlation_ids: bool,
    pub request_logging: bool,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        let defaults = MonitoringConfig::default();
        Self {
            correlation_ids: defaults.correlation_ids,
            request_logging: defaults.request_logging,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub page_size: usize,
    pub ttl_secs: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        let defaults = PaginationConfig::default();
        Self {
            page_size: defaults.page_size,
            ttl_secs: defaults.ttl.as_secs(),
        }
    }
}

impl Config {
    /// `~/.config/targetprocess-cli/config.toml` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("targetprocess-cli").join("config.toml"))
    }

    /// Load from `path` (must exist) or the default location (may be
    /// missing), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply `TP_BASE_URL`, `TP_DOMAIN`, `TP_TOKEN` and `TP_AUTH_MODE`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(base_url) = lookup("TP_BASE_URL") {
            self.base_url = Some(base_url);
        } else if let Some(domain) = lookup("TP_DOMAIN") {
            self.base_url = Some(format!("https://{}", domain.trim_end_matches('/')));
        }

        let mode = lookup("TP_AUTH_MODE").map(|m| m.trim().to_lowercase());
        let token = lookup("TP_TOKEN").or_else(|| match &self.auth {
            Some(AuthConfig::Basic { token }) | Some(AuthConfig::ApiKey { token }) => {
                Some(token.clone())
            }
            None => None,
        });

        if let Some(token) = token {
            let mode = mode.unwrap_or_else(|| {
                self.auth
                    .as_ref()
                    .map(|auth| auth.mode_name().to_string())
                    .unwrap_or_else(|| "apikey".to_string())
            });
            self.auth = Some(match mode.as_str() {
                "basic" => AuthConfig::basic(token),
                "apikey" | "api_key" | "token" => AuthConfig::api_key(token),
                other => anyhow::bail!("Unknown auth mode '{}' (expected 'basic' or 'apikey')", other),
            });
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.factor <= 1.0 {
            anyhow::bail!("retry.factor must be greater than 1 (got {})", self.retry.factor);
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            anyhow::bail!("retry.max_delay_ms must not be below retry.initial_delay_ms");
        }
        if self.pagination.page_size == 0 {
            anyhow::bail!("pagination.page_size must be at least 1");
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<&str> {
        self.base_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No Targetprocess URL configured. Set base_url in the config file or TP_BASE_URL / TP_DOMAIN."
            )
        })
    }

    pub fn auth(&self) -> Result<AuthConfig> {
        self.auth.clone().ok_or_else(|| {
            anyhow::anyhow!("No credentials configured. Set [auth] in the config file or TP_TOKEN.")
        })
    }

    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig {
            retry: RetryConfig {
                max_retries: self.retry.max_retries,
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
                factor: self.retry.factor,
                jitter: self.retry.jitter,
                retryable_status_codes: self.retry.retryable_status_codes.iter().copied().collect(),
                attempt_timeout: match self.request_timeout_secs {
                    Some(0) => None,
                    Some(secs) => Some(Duration::from_secs(secs)),
                    None => RetryConfig::default().attempt_timeout,
                },
            },
            monitoring: MonitoringConfig {
                correlation_ids: self.monitoring.correlation_ids,
                request_logging: self.monitoring.request_logging,
            },
        }
    }

    pub fn pagination(&self) -> PaginationConfig {
        PaginationConfig {
            page_size: self.pagination.page_size,
            ttl: Duration::from_secs(self.pagination.ttl_secs),
        }
    }
}
