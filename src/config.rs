//! Configuration for the MemoRable client
//!
//! Settings are layered with the `config` crate:
//! 1. Built-in defaults
//! 2. Optional `memorable.toml` in the working directory (or an explicit file)
//! 3. `MEMORABLE_*` environment variables

use crate::error::{MemorableError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default MCP endpoint
pub const DEFAULT_MCP_URL: &str = "http://127.0.0.1:8080/mcp";

/// Environment variable prefix (`MEMORABLE_MCP_URL`, `MEMORABLE_ENTITY`, ...)
pub const ENV_PREFIX: &str = "MEMORABLE";

const DEFAULT_ENTITY: &str = "chloe";
const DEFAULT_DEVICE_ID: &str = "johnny5-main";
const DEFAULT_DEVICE_TYPE: &str = "robot";
const DEFAULT_HEALTH_TIMEOUT_SECS: f64 = 5.0;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorableConfig {
    /// StreamableHTTP MCP endpoint
    pub mcp_url: String,

    /// Identity this client speaks for (also names the MCP client)
    pub entity: String,

    /// Device sending context updates
    pub device_id: String,

    /// Device kind reported alongside `device_id`
    pub device_type: String,

    /// Upper bound for the liveness probe, in seconds (fractions allowed)
    pub health_timeout_secs: f64,
}

impl Default for MemorableConfig {
    fn default() -> Self {
        Self {
            mcp_url: DEFAULT_MCP_URL.to_string(),
            entity: DEFAULT_ENTITY.to_string(),
            device_id: DEFAULT_DEVICE_ID.to_string(),
            device_type: DEFAULT_DEVICE_TYPE.to_string(),
            health_timeout_secs: DEFAULT_HEALTH_TIMEOUT_SECS,
        }
    }
}

impl MemorableConfig {
    /// Load defaults, `memorable.toml` if present, then the environment
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(config::File::with_name("memorable").required(false));
        Self::finish(builder)
    }

    /// Load defaults, the given file (must exist), then the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let builder = Self::defaults()?.add_source(config::File::from(path).required(true));
        Self::finish(builder)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Self::default();
        Ok(config::Config::builder()
            .set_default("mcp_url", defaults.mcp_url)?
            .set_default("entity", defaults.entity)?
            .set_default("device_id", defaults.device_id)?
            .set_default("device_type", defaults.device_type)?
            .set_default("health_timeout_secs", defaults.health_timeout_secs)?)
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let loaded: Self = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.mcp_url.trim().is_empty() {
            return Err(MemorableError::Config(config::ConfigError::Message(
                "mcp_url cannot be empty".to_string(),
            )));
        }
        if !(self.health_timeout_secs.is_finite() && self.health_timeout_secs > 0.0) {
            return Err(MemorableError::Config(config::ConfigError::Message(format!(
                "health_timeout_secs must be a positive number of seconds, got {}",
                self.health_timeout_secs
            ))));
        }
        Ok(())
    }

    pub fn with_mcp_url(mut self, url: impl Into<String>) -> Self {
        self.mcp_url = url.into();
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }

    pub fn with_device(
        mut self,
        device_id: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        self.device_id = device_id.into();
        self.device_type = device_type.into();
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Probe timeout; an unusable setting falls back to the default
    pub fn health_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.health_timeout_secs)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_HEALTH_TIMEOUT_SECS))
    }

    /// Liveness URL: the `/mcp` path suffix swapped for `/health`
    pub fn health_url(&self) -> String {
        let url = self.mcp_url.trim_end_matches('/');
        if let Some(base) = url.strip_suffix("/mcp") {
            format!("{}/health", base)
        } else if url.contains("/mcp") {
            url.replace("/mcp", "/health")
        } else {
            format!("{}/health", url)
        }
    }
}
