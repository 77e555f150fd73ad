// packages/listener/src/utils/config.rs
//! Layered configuration
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. `config/listener.{toml,yaml,json}` (optional)
//! 3. Environment variables prefixed `LISTENER__`, e.g.
//!    `LISTENER__OBSERVABILITY__LEVEL=debug`

use crate::utils::errors::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listener: ListenerConfig,
    pub client: ClientConfig,
    pub observability: ObservabilityConfig,

    /// URLs the binary requests on startup
    pub targets: Vec<String>,
}

/// Interception behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Call `start()` as soon as the listener is constructed
    pub start_listening: bool,

    /// Log each outgoing request at debug level
    pub log_requests: bool,

    /// Log each arrived response at debug level
    pub log_responses: bool,

    /// Maximum body size to log (bytes)
    pub max_log_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            start_listening: false,
            log_requests: true,
            log_responses: true,
            max_log_body_size: 10_000, // 10KB
        }
    }
}

/// Connection pool settings for the hyper-backed transports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 32,
        }
    }
}

/// Tracing output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Fallback filter when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and environment
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name("config/listener").required(false))
            .add_source(Self::environment())
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from a specific file, still honouring environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    fn environment() -> Environment {
        Environment::with_prefix("LISTENER")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("targets")
            .try_parsing(true)
    }
}
