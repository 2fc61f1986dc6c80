//! Configuration for the pump process

use crate::error::{PumpError, Result};
use serde_json::json;
use std::env;

/// Main configuration, loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// CloudLog ingestion endpoint
    pub cloudlog_url: Option<String>,

    /// CloudLog `Authorization` header value
    pub cloudlog_token: String,

    /// Environment label stamped on every document
    pub cloudlog_environment: String,

    /// Delivery timeout in seconds (0 disables it)
    pub timeout_secs: u64,

    /// Records per batch
    pub batch_size: usize,

    /// Log level
    pub log_level: String,

    /// Log format (json or pretty)
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloudlog_url: None,
            cloudlog_token: String::new(),
            cloudlog_environment: String::new(),
            timeout_secs: 0,
            batch_size: 100,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("CLOUDLOG_URL") {
            config.cloudlog_url = Some(url);
        }

        if let Some(token) = lookup("CLOUDLOG_TOKEN") {
            config.cloudlog_token = token;
        }

        if let Some(environment) = lookup("CLOUDLOG_ENVIRONMENT") {
            config.cloudlog_environment = environment;
        }

        if let Some(timeout) = lookup("PUMP_TIMEOUT_SECS") {
            config.timeout_secs = timeout
                .parse()
                .map_err(|e| PumpError::Config(format!("invalid PUMP_TIMEOUT_SECS: {e}")))?;
        }

        if let Some(size) = lookup("PUMP_BATCH_SIZE") {
            config.batch_size = size
                .parse()
                .map_err(|e| PumpError::Config(format!("invalid PUMP_BATCH_SIZE: {e}")))?;
            if config.batch_size == 0 {
                return Err(PumpError::Config(
                    "invalid PUMP_BATCH_SIZE: must be greater than zero".to_string(),
                ));
            }
        }

        if let Some(level) = lookup("PUMP_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(format) = lookup("PUMP_LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(PumpError::Config(format!(
                        "invalid PUMP_LOG_FORMAT: {other} (expected 'json' or 'pretty')"
                    )));
                }
            };
        }

        Ok(config)
    }

    /// CloudLog section as the opaque value handed to the pump's `init`
    ///
    /// Returns `None` when no URL is configured.
    pub fn cloudlog_pump_config(&self) -> Option<serde_json::Value> {
        self.cloudlog_url.as_ref().map(|url| {
            json!({
                "url": url,
                "token": self.cloudlog_token,
                "environment": self.cloudlog_environment,
            })
        })
    }
}
