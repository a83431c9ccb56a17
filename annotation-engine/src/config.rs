//! Runtime configuration for the annotation engine.
//!
//! Defaults come from the `constants` crate; each value can be overridden
//! through an environment variable:
//!
//! | Variable                       | Meaning                                  |
//! |--------------------------------|------------------------------------------|
//! | `INVENTORY_API_URL`            | Base URL of the inventory service        |
//! | `INVENTORY_POLL_INTERVAL_SECS` | Registry refresh period while visible    |
//! | `INVENTORY_HTTP_TIMEOUT_SECS`  | Transport timeout for gateway requests   |
//! | `INVENTORY_SCENE_MANIFEST`     | Asset path of the scene manifest JSON    |

use std::time::Duration;

use bevy::prelude::*;
use constants::network::{
    DEFAULT_API_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_SECS,
};
use constants::path::DEFAULT_SCENE_MANIFEST_PATH;
use thiserror::Error;

pub const ENV_API_URL: &str = "INVENTORY_API_URL";
pub const ENV_POLL_INTERVAL_SECS: &str = "INVENTORY_POLL_INTERVAL_SECS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "INVENTORY_HTTP_TIMEOUT_SECS";
pub const ENV_SCENE_MANIFEST: &str = "INVENTORY_SCENE_MANIFEST";

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must start with http:// or https://, got: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got: {value}")]
    InvalidInterval { var: &'static str, value: String },

    #[error("{var} is not a number: {value}")]
    InvalidNumber { var: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine configuration shared as a Bevy resource.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct AnnotationConfig {
    /// Base URL of the inventory service, without trailing slash.
    pub api_base_url: String,
    /// Period of the registry polling loop.
    pub poll_interval: Duration,
    /// Timeout applied by the HTTP gateway.
    pub http_timeout: Duration,
    /// Asset path of the scene manifest.
    pub scene_manifest_path: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval: Duration::from_secs_f32(DEFAULT_POLL_INTERVAL_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            scene_manifest_path: DEFAULT_SCENE_MANIFEST_PATH.to_string(),
        }
    }
}

impl AnnotationConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup(ENV_API_URL)) {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = non_empty(lookup(ENV_POLL_INTERVAL_SECS)) {
            let secs: f32 = raw.parse().map_err(|_| ConfigError::InvalidNumber {
                var: ENV_POLL_INTERVAL_SECS,
                value: raw.clone(),
            })?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::InvalidInterval {
                    var: ENV_POLL_INTERVAL_SECS,
                    value: raw,
                });
            }
            config.poll_interval = Duration::from_secs_f32(secs);
        }

        if let Some(raw) = non_empty(lookup(ENV_HTTP_TIMEOUT_SECS)) {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidNumber {
                var: ENV_HTTP_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidInterval {
                    var: ENV_HTTP_TIMEOUT_SECS,
                    value: raw,
                });
            }
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(path) = non_empty(lookup(ENV_SCENE_MANIFEST)) {
            config.scene_manifest_path = path;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidUrl {
                var: ENV_API_URL,
                value: self.api_base_url.clone(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidInterval {
                var: ENV_POLL_INTERVAL_SECS,
                value: format!("{:?}", self.poll_interval),
            });
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
