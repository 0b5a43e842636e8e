//! Background Cache Worker
//!
//! One instance per deployed build. The instance owns exactly one cache
//! namespace derived from its [`BuildInfo`], intercepts requests
//! cache-first, evicts every other namespace on activation, shows
//! notifications and relays notification clicks to open tabs.
//!
//! A new deployment spawns a new instance that coexists with the old one
//! until it activates; both may intercept requests during the handoff.

mod cache;
mod clients;
mod events;
mod fetch;
mod lifecycle;
mod sync;

pub use cache::*;
pub use clients::*;
pub use events::*;
pub use fetch::*;
pub use sync::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use spin::RwLock;

use crate::config::RuntimeConfig;
use crate::error::WorkerError;
use crate::net::Network;
use crate::notification::NotificationSurface;
use crate::version::{BuildInfo, VersionEndpoint, VersionFetcher};

/// Worker global ID counter
static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Worker ID, used to tell instances apart in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Create a new unique ID
    pub fn new() -> Self {
        Self(NEXT_WORKER_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Precaching the app shell
    #[default]
    Installing,
    /// Installed, waiting to activate
    Installed,
    /// Evicting stale namespaces
    Activating,
    /// Serving fetches from the current namespace
    Activated,
    /// Replaced by a newer deployment
    Redundant,
}

/// Check if a state transition is valid
pub(crate) fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;

    matches!(
        (from, to),
        (Installing, Installed)
            | (Installing, Redundant)
            | (Installed, Activating)
            | (Installed, Redundant)
            | (Activating, Activated)
            | (Activating, Redundant)
            | (Activated, Redundant)
    )
}

/// Platform handles a worker instance runs against.
#[derive(Clone)]
pub struct WorkerPlatform {
    pub caches: Arc<dyn CacheRepository>,
    pub network: Arc<dyn Network>,
    pub clients: Arc<dyn Clients>,
    pub notifications: Arc<dyn NotificationSurface>,
}

/// A background cache worker instance.
pub struct CacheWorker {
    id: WorkerId,
    build: BuildInfo,
    namespace: CacheNamespace,
    config: RuntimeConfig,
    state: RwLock<WorkerState>,
    caches: Arc<dyn CacheRepository>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    notifications: Arc<dyn NotificationSurface>,
    fetcher: Arc<dyn VersionFetcher>,
    sync: SyncManager,
}

impl CacheWorker {
    /// Create a worker for `build`. The version fetcher defaults to the
    /// configured endpoint over the platform network.
    pub fn new(build: BuildInfo, config: RuntimeConfig, platform: WorkerPlatform) -> Self {
        let fetcher: Arc<dyn VersionFetcher> = Arc::new(VersionEndpoint::from_config(
            platform.network.clone(),
            &config,
        ));
        let namespace = CacheNamespace::for_build(&config.cache_prefix, &build);
        let sync = SyncManager::new();
        sync.register(config.sync_tag.clone());

        Self {
            id: WorkerId::new(),
            build,
            namespace,
            config,
            state: RwLock::new(WorkerState::Installing),
            caches: platform.caches,
            network: platform.network,
            clients: platform.clients,
            notifications: platform.notifications,
            fetcher,
            sync,
        }
    }

    /// Replace the version fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn VersionFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn build(&self) -> &BuildInfo {
        &self.build
    }

    /// The namespace this instance reads from and writes to.
    pub fn namespace(&self) -> &CacheNamespace {
        &self.namespace
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state() == WorkerState::Activated
    }

    pub fn is_waiting(&self) -> bool {
        self.state() == WorkerState::Installed
    }

    pub fn sync_manager(&self) -> &SyncManager {
        &self.sync
    }

    fn transition(&self, to: WorkerState) -> Result<WorkerState, WorkerError> {
        let from = {
            let mut state = self.state.write();
            let from = *state;
            if !is_valid_transition(from, to) {
                return Err(WorkerError::InvalidStateTransition { from, to });
            }
            *state = to;
            from
        };
        log::info!(
            "[SW {}] {} {:?} -> {:?}",
            self.id.raw(),
            self.namespace,
            from,
            to
        );
        Ok(from)
    }

    /// Mark this instance as replaced. It stops reading the cache.
    pub fn retire(&self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Redundant).map(|_| ())
    }
}
