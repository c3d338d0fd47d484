//! Configuration loading for notequery.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config_dir>/notequery/config.toml`.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::result::ResultOptions;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the note-database backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Bearer token for the backend (prefer the NOTEQUERY_API_TOKEN env var)
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Per-request transport timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries for transient transport failures (not for rejected queries)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Lifetime of a cached tag schema
    #[serde(default = "default_schema_cache_ttl_secs")]
    pub schema_cache_ttl_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Result projection settings
    #[serde(default)]
    pub results: ResultOptions,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:18088".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_schema_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            schema_cache_ttl_secs: default_schema_cache_ttl_secs(),
            log_level: default_log_level(),
            results: ResultOptions::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (<config_dir>/notequery/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (NOTEQUERY_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, QueryError> {
        let defaults = ResultOptions::default();

        let mut builder = Config::builder()
            // 1. Built-in defaults
            .set_default("backend_url", default_backend_url())
            .map_err(|e| QueryError::Config(e.to_string()))?
            .set_default("request_timeout_secs", default_request_timeout_secs() as i64)
            .map_err(|e| QueryError::Config(e.to_string()))?
            .set_default("max_retries", default_max_retries() as i64)
            .map_err(|e| QueryError::Config(e.to_string()))?
            .set_default("schema_cache_ttl_secs", default_schema_cache_ttl_secs() as i64)
            .map_err(|e| QueryError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| QueryError::Config(e.to_string()))?
            .set_default("results.include_full_content", defaults.include_full_content)
            .map_err(|e| QueryError::Config(e.to_string()))?
            .set_default("results.tree_max_blocks", defaults.tree_max_blocks as i64)
            .map_err(|e| QueryError::Config(e.to_string()))?
            .set_default("results.tree_max_depth", defaults.tree_max_depth as i64)
            .map_err(|e| QueryError::Config(e.to_string()))?
            // 2. Default config file
            .add_source(File::with_name(&default_config_path().to_string_lossy()).required(false));

        // 3. CLI-specified config file (higher precedence than default)
        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // 4. Environment variables: NOTEQUERY_BACKEND_URL, NOTEQUERY_RESULTS__TREE_MAX_DEPTH, ...
        builder = builder.add_source(
            Environment::with_prefix("NOTEQUERY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| QueryError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| QueryError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.backend_url.trim().is_empty() {
            return Err(QueryError::Config("backend_url must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(QueryError::Config(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.results.tree_max_blocks == 0 || self.results.tree_max_depth == 0 {
            return Err(QueryError::Config(
                "results.tree_max_blocks and results.tree_max_depth must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Transport timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Schema cache lifetime as a duration.
    pub fn schema_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.schema_cache_ttl_secs)
    }
}

/// Location of the default config file (without extension).
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "notequery")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config")
}
