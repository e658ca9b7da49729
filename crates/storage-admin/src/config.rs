//! Panel configuration.
//!
//! Defaults suit a server on localhost; every field can be overridden from the
//! environment or given as JSON.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub const ENV_BASE_URL: &str = "STORAGE_ADMIN_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "STORAGE_ADMIN_TIMEOUT_SECS";
pub const ENV_CHANNEL_CAPACITY: &str = "STORAGE_ADMIN_CHANNEL_CAPACITY";
pub const ENV_BUSINESS: &str = "STORAGE_ADMIN_BUSINESS";

/// Errors that can occur while loading [`AdminConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Root that request targets are joined to.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Buffer of the cache actor's request channel.
    pub channel_capacity: usize,
    /// Business selected at startup, if any.
    pub initial_business: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            initial_business: None,
        }
    }
}

impl AdminConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            config.request_timeout_secs = parse(ENV_TIMEOUT_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_CHANNEL_CAPACITY) {
            config.channel_capacity = parse(ENV_CHANNEL_CAPACITY, value)?;
        }
        config.initial_business = lookup(ENV_BUSINESS)
            .map(|business| business.trim().to_string())
            .filter(|business| !business.is_empty());
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Empty("base_url"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Zero("channel_capacity"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}
