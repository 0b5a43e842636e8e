//! Version endpoint client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::VersionDescriptor;
use crate::config::RuntimeConfig;
use crate::error::VersionError;
use crate::net::{Network, Request};

/// Source of the currently deployed version descriptor.
#[async_trait]
pub trait VersionFetcher: Send + Sync {
    async fn fetch_current(&self) -> Result<VersionDescriptor, VersionError>;
}

/// Fetches `GET <endpoint>?t=<millis>-<seq>` through a [`Network`].
///
/// The stamp pairs wall-clock millis with a per-endpoint sequence number,
/// so every request URL from one endpoint is unique and neither the
/// worker's cache nor an intermediary can answer it.
pub struct VersionEndpoint {
    network: Arc<dyn Network>,
    url: String,
    timeout: Duration,
    seq: AtomicU64,
}

impl VersionEndpoint {
    pub fn new(network: Arc<dyn Network>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            network,
            url: url.into(),
            timeout,
            seq: AtomicU64::new(0),
        }
    }

    pub fn from_config(network: Arc<dyn Network>, config: &RuntimeConfig) -> Self {
        Self::new(
            network,
            config.absolute_url(&config.version_endpoint),
            config.fetch_timeout(),
        )
    }

    /// Endpoint URL with a cache-defeating parameter appended.
    pub fn busted_url(&self, millis: i64, seq: u64) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}t={}-{}", self.url, sep, millis, seq)
    }
}

#[async_trait]
impl VersionFetcher for VersionEndpoint {
    async fn fetch_current(&self) -> Result<VersionDescriptor, VersionError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let request = Request::get(self.busted_url(Utc::now().timestamp_millis(), seq))
            .with_header("Cache-Control", "no-cache, no-store")
            .with_header("Accept", "application/json");

        let response = tokio::time::timeout(self.timeout, self.network.fetch(&request))
            .await
            .map_err(|_| VersionError::Timeout(self.timeout))??;

        if !response.ok() {
            return Err(VersionError::Status {
                status: response.status,
            });
        }

        let descriptor: VersionDescriptor = serde_json::from_slice(&response.body)?;
        log::debug!(
            "[Version] deployed {} ({})",
            descriptor.version,
            descriptor.build_timestamp
        );
        Ok(descriptor)
    }
}
