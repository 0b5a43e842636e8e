//! Error taxonomy.
//!
//! None of these are fatal to the host application. Each call site decides
//! how to degrade:
//! - `VersionError`: skip the reconciliation cycle
//! - `CacheOpError`: log and keep serving from the network; during
//!   activation the eviction sweep is retried instead
//! - `NotifyError`: skip the notification
//! - `RecordError`: skip the cycle (the record is left untouched)

use std::path::PathBuf;
use std::time::Duration;

use crate::service_worker::WorkerState;

/// Failure fetching or decoding the deployed version descriptor.
#[derive(thiserror::Error, Debug)]
pub enum VersionError {
    #[error("version fetch failed: {0}")]
    Fetch(#[from] NetworkError),

    #[error("version endpoint returned status {status}")]
    Status { status: u16 },

    #[error("version fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed version descriptor: {0}")]
    Parse(#[from] serde_json::Error),
}

impl VersionError {
    /// Whether the failure happened before a payload was received.
    pub fn is_fetch_error(&self) -> bool {
        !matches!(self, Self::Parse(_))
    }
}

/// Transport-level failure from the `Network` seam.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("network unreachable: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Cache storage failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheOpError {
    #[error("cache quota exceeded while writing to {namespace}")]
    QuotaExceeded { namespace: String },

    #[error("cache storage error: {0}")]
    Storage(String),
}

/// Background worker lifecycle failure.
#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error("invalid worker state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: WorkerState, to: WorkerState },

    #[error("install failed: could not precache {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error(transparent)]
    Cache(#[from] CacheOpError),
}

/// Notification delivery failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Failure reading or writing the persisted local version record.
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("record I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading / validation failure.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Delivery of a worker → tab message failed (the tab went away).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("client {0} not found")]
    NotFound(String),

    #[error("client {0} is closed")]
    Closed(String),

    #[error("cannot open window at {url}: {reason}")]
    OpenWindow { url: String, reason: String },
}
