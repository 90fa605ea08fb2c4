//! Client configuration via `docstore.toml`
//!
//! A [`ClientConfig`] is passed to `DocumentClient::new`. It can be built in
//! code or loaded from a TOML file; `write_default_if_missing` drops a
//! commented template next to the application on first start.

use docstore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "docstore.toml";

/// Default page size for query iterators.
pub const DEFAULT_MAX_ITEM_COUNT: usize = 100;

/// Default throughput accounting window.
pub const DEFAULT_THROUGHPUT_WINDOW_MS: u64 = 1000;

/// Client configuration loaded from `docstore.toml`.
///
/// # Example
///
/// ```toml
/// endpoint = "https://localhost:8081"
/// primary_key = "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw=="
/// application_name = "family-demo"
/// default_max_item_count = 100
/// throughput_window_ms = 1000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Account endpoint (`http://` or `https://`).
    pub endpoint: String,
    /// Account key.
    pub primary_key: String,
    /// Optional name attached to log output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    /// Query page size used when `QueryOptions` does not set one.
    #[serde(default = "default_max_item_count")]
    pub default_max_item_count: usize,
    /// Length of each throughput budget window in milliseconds.
    #[serde(default = "default_throughput_window_ms")]
    pub throughput_window_ms: u64,
}

fn default_max_item_count() -> usize {
    DEFAULT_MAX_ITEM_COUNT
}

fn default_throughput_window_ms() -> u64 {
    DEFAULT_THROUGHPUT_WINDOW_MS
}

impl ClientConfig {
    /// Config for an endpoint and key with every other field defaulted.
    pub fn new(endpoint: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            primary_key: primary_key.into(),
            application_name: None,
            default_max_item_count: DEFAULT_MAX_ITEM_COUNT,
            throughput_window_ms: DEFAULT_THROUGHPUT_WINDOW_MS,
        }
    }

    /// Set the application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Set the default query page size.
    pub fn with_default_max_item_count(mut self, count: usize) -> Self {
        self.default_max_item_count = count;
        self
    }

    /// Set the throughput window length.
    pub fn with_throughput_window(mut self, window: Duration) -> Self {
        self.throughput_window_ms = window.as_millis() as u64;
        self
    }

    /// Throughput window as a `Duration`.
    pub fn throughput_window(&self) -> Duration {
        Duration::from_millis(self.throughput_window_ms)
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::config("endpoint must not be empty"));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(Error::config(format!(
                "endpoint '{}' must start with http:// or https://",
                self.endpoint
            )));
        }
        if self.primary_key.trim().is_empty() {
            return Err(Error::config("primary_key must not be empty"));
        }
        if self.default_max_item_count == 0 {
            return Err(Error::config("default_max_item_count must be positive"));
        }
        if self.throughput_window_ms == 0 {
            return Err(Error::config("throughput_window_ms must be positive"));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docstore client configuration
#
# Account endpoint and key
endpoint = "https://localhost:8081"
primary_key = "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw=="

# Name attached to log output (optional)
# application_name = "my-app"

# Query page size when QueryOptions does not set one (default: 100)
default_max_item_count = 100

# Throughput budget window in milliseconds (default: 1000)
throughput_window_ms = 1000
"#
    }

    /// Parse and validate config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text is not valid TOML or a field is
    /// invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { reason } => {
                Error::config(format!("{} ({})", reason, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
