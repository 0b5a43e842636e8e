//! Runtime configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file is a
//! valid configuration.
//!
//! ```toml
//! origin = "https://app.example.com"
//! cache_prefix = "app-shell"
//! poll_interval_secs = 120
//! app_shell = ["/", "/index.html", "/manifest.json"]
//!
//! [routes]
//! message = "/messages"
//! task = "/tasks"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::notification::Category;

/// Recommended polling window, in seconds.
const RECOMMENDED_POLL_RANGE: std::ops::RangeInclusive<u64> = 60..=300;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Origin of the app (`scheme://host[:port]`).
    pub origin: String,
    /// Prefix of every cache namespace owned by the worker.
    pub cache_prefix: String,
    /// Path of the version descriptor endpoint.
    pub version_endpoint: String,
    pub fetch_timeout_ms: u64,
    pub poll_interval_secs: u64,
    /// Interval ticks closer than this to the previous check are skipped.
    pub min_check_spacing_secs: u64,
    /// App-shell manifest precached on install.
    pub app_shell: Vec<String>,
    /// Paths that always go to the network and are never cached.
    pub bypass_paths: Vec<String>,
    /// Cached entry served to navigation requests while offline.
    pub offline_fallback: Option<String>,
    pub activation_retries: u32,
    /// Background sync tag that triggers a version check on reconnect.
    pub sync_tag: String,
    /// Lifetime of a degraded in-page notification.
    pub in_page_lifetime_ms: u64,
    pub routes: CategoryRoutes,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost".to_string(),
            cache_prefix: "app-shell".to_string(),
            version_endpoint: "/version.json".to_string(),
            fetch_timeout_ms: 5_000,
            poll_interval_secs: 120,
            min_check_spacing_secs: 30,
            app_shell: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
            ],
            bypass_paths: vec!["/version.json".to_string()],
            offline_fallback: Some("/index.html".to_string()),
            activation_retries: 3,
            sync_tag: "version-check".to_string(),
            in_page_lifetime_ms: 5_000,
            routes: CategoryRoutes::default(),
        }
    }
}

/// Category → route table used when a clicked notification carries no URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CategoryRoutes {
    pub message: String,
    pub task: String,
    pub general: String,
    pub update: String,
}

impl Default for CategoryRoutes {
    fn default() -> Self {
        Self {
            message: "/messages".to_string(),
            task: "/tasks".to_string(),
            general: "/".to_string(),
            update: "/".to_string(),
        }
    }
}

impl CategoryRoutes {
    pub fn route_for(&self, category: Category) -> &str {
        match category {
            Category::Message => &self.message,
            Category::Task => &self.task,
            Category::General => &self.general,
            Category::Update => &self.update,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.origin.is_empty() || !self.origin.contains("://") {
            return Err(ConfigError::Invalid(format!(
                "origin must be scheme://host, got {:?}",
                self.origin
            )));
        }
        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid("cache_prefix is empty".to_string()));
        }
        if !self.version_endpoint.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "version_endpoint must be an absolute path, got {:?}",
                self.version_endpoint
            )));
        }
        if self.poll_interval_secs == 0 || self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs and fetch_timeout_ms must be non-zero".to_string(),
            ));
        }
        if !RECOMMENDED_POLL_RANGE.contains(&self.poll_interval_secs) {
            log::warn!(
                "[Config] poll_interval_secs={} is outside the recommended {}..={}s window",
                self.poll_interval_secs,
                RECOMMENDED_POLL_RANGE.start(),
                RECOMMENDED_POLL_RANGE.end()
            );
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn min_check_spacing(&self) -> Duration {
        Duration::from_secs(self.min_check_spacing_secs)
    }

    pub fn in_page_lifetime(&self) -> Duration {
        Duration::from_millis(self.in_page_lifetime_ms)
    }

    /// Absolute URL for an app-relative path.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.contains("://") {
            path.to_string()
        } else {
            format!("{}{}", self.origin.trim_end_matches('/'), path)
        }
    }
}
