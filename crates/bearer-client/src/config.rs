//! Client configuration
//!
//! Loaded from a TOML file, then overlaid with environment variables
//! (`BEARER_BASE_URL`, `BEARER_CREDENTIALS_PATH`). Validation happens
//! at load time so a bad base URL or a zero margin fails fast instead
//! of surfacing as a confusing request error later.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend base URL, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Lead time (seconds) before expiry at which the access credential
    /// is treated as stale and refreshed proactively
    #[serde(default = "default_expiry_margin")]
    pub expiry_margin_secs: u64,
    /// Request timeout (seconds) applied to the underlying HTTP client
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Path of the durable credential file
    pub credentials_path: PathBuf,
}

fn default_expiry_margin() -> u64 {
    60
}

fn default_timeout() -> u64 {
    60
}

impl Config {
    /// Build a config programmatically with default margin and timeout.
    pub fn new(base_url: impl Into<String>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            expiry_margin_secs: default_expiry_margin(),
            timeout_secs: default_timeout(),
            credentials_path: credentials_path.into(),
        }
    }

    /// Load configuration from a TOML file, then overlay environment
    /// variables and validate.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("BEARER_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(path) = std::env::var("BEARER_CREDENTIALS_PATH") {
            config.credentials_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate field values and normalize the base URL.
    pub fn validate(&mut self) -> common::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        // Endpoint paths are absolute; a trailing slash would double up.
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }

        if self.expiry_margin_secs == 0 {
            return Err(common::Error::Config(
                "expiry_margin_secs must be greater than 0".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
