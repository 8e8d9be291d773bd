//! Realtime configuration module
//!
//! Timing and paging knobs for the realtime service. Values come from
//! built-in defaults, an optional TOML file, then environment overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Realtime service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Seconds between metrics ticks
    pub tick_interval_secs: u64,
    /// Upper bound on a single identity verification
    pub auth_timeout_secs: u64,
    /// Upper bound on a single metrics refresh
    pub refresh_timeout_secs: u64,
    /// Recent transactions carried in each snapshot
    pub snapshot_recent_limit: u32,
    /// Activity entries sent when the client gives no limit
    pub activity_default_limit: u32,
    /// Hard cap on an activity feed page
    pub activity_max_limit: u32,
    /// Seconds between server keepalive pings
    pub ping_interval_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 30,
            auth_timeout_secs: 10,
            refresh_timeout_secs: 15,
            snapshot_recent_limit: 20,
            activity_default_limit: 20,
            activity_max_limit: 100,
            ping_interval_secs: 30,
        }
    }
}

impl RealtimeConfig {
    /// Create a new RealtimeConfigBuilder
    pub fn builder() -> RealtimeConfigBuilder {
        RealtimeConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `REALTIME_*` overrides from a variable lookup
    ///
    /// The lookup is injected so tests don't have to touch the process
    /// environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidValue(key, raw)),
                None => Ok(None),
            }
        };

        if let Some(v) = read("REALTIME_TICK_SECS")? {
            self.tick_interval_secs = v;
        }
        if let Some(v) = read("REALTIME_AUTH_TIMEOUT_SECS")? {
            self.auth_timeout_secs = v;
        }
        if let Some(v) = read("REALTIME_REFRESH_TIMEOUT_SECS")? {
            self.refresh_timeout_secs = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, u64); 7] = [
            ("tick_interval_secs", self.tick_interval_secs),
            ("auth_timeout_secs", self.auth_timeout_secs),
            ("refresh_timeout_secs", self.refresh_timeout_secs),
            ("snapshot_recent_limit", self.snapshot_recent_limit as u64),
            ("activity_default_limit", self.activity_default_limit as u64),
            ("activity_max_limit", self.activity_max_limit as u64),
            ("ping_interval_secs", self.ping_interval_secs),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if self.activity_default_limit > self.activity_max_limit {
            return Err(ConfigError::InvalidValue(
                "activity_default_limit",
                self.activity_default_limit.to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Clamp a client-supplied page size into `[1, activity_max_limit]`
    pub fn clamp_activity_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.activity_default_limit)
            .clamp(1, self.activity_max_limit)
    }
}

/// Builder for RealtimeConfig
#[derive(Debug, Default)]
pub struct RealtimeConfigBuilder {
    config: Option<RealtimeConfig>,
}

impl RealtimeConfigBuilder {
    fn inner(&mut self) -> &mut RealtimeConfig {
        self.config.get_or_insert_with(RealtimeConfig::default)
    }

    /// Set the tick interval in seconds
    pub fn tick_interval_secs(mut self, secs: u64) -> Self {
        self.inner().tick_interval_secs = secs;
        self
    }

    /// Set the verifier timeout in seconds
    pub fn auth_timeout_secs(mut self, secs: u64) -> Self {
        self.inner().auth_timeout_secs = secs;
        self
    }

    /// Set the metrics refresh timeout in seconds
    pub fn refresh_timeout_secs(mut self, secs: u64) -> Self {
        self.inner().refresh_timeout_secs = secs;
        self
    }

    /// Set the number of recent transactions per snapshot
    pub fn snapshot_recent_limit(mut self, limit: u32) -> Self {
        self.inner().snapshot_recent_limit = limit;
        self
    }

    /// Set the default activity page size
    pub fn activity_default_limit(mut self, limit: u32) -> Self {
        self.inner().activity_default_limit = limit;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RealtimeConfig, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("could not parse config: {0}")]
    Parse(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
