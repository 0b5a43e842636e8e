//! App Shell Runtime
//!
//! Version reconciliation and cache invalidation for an offline-capable web
//! app shell. Every open tab eventually runs the latest deployed build,
//! without repeated disruptive reloads, while a background cache worker
//! keeps serving the shell when the network is gone.
//!
//! # Architecture
//!
//! - `version`: Version descriptor contract + endpoint client
//! - `service_worker`: Background cache worker (install → activate → fetch, sync, push, clicks)
//! - `notification`: Category defaults, surfaces, permission + dispatcher
//! - `router`: Worker → tab messages (notification clicks, update-ready)
//! - `reconciler`: Per-tab update reconciliation, local version record, scheduling
//! - `config`: TOML runtime configuration
//! - `net`: Request/response model + reqwest-backed network
//! - `error`: Error taxonomy
//!
//! Dependency order, leaves first: version → service_worker → notification
//! → router → reconciler.

pub mod config;
pub mod error;
pub mod net;
pub mod notification;
pub mod reconciler;
pub mod router;
pub mod service_worker;
pub mod version;

pub use config::RuntimeConfig;
pub use error::{
    CacheOpError, ClientError, ConfigError, NetworkError, NotifyError, RecordError, VersionError,
    WorkerError,
};
pub use notification::{Category, NotificationDispatcher, NotificationRequest};
pub use reconciler::{ReconcileLoop, ReconcileOutcome, Trigger, UpdateReconciler};
pub use router::{ClientMessage, MessageRouter};
pub use service_worker::{CacheWorker, WorkerPlatform, WorkerState};
pub use version::{BuildInfo, VersionDescriptor, VersionEndpoint, VersionFetcher};
