//! Update Reconciler
//!
//! Runs in each tab. A pass fetches the deployed descriptor, compares it
//! with the locally recorded build and decides what to do:
//!
//! - nothing recorded yet: adopt the deployment silently
//! - not newer: nothing, however often the pass runs
//! - newer and mandatory (`forceUpdate`, or below the supported floor):
//!   evict caches, record, reload
//! - newer otherwise: announce it and wait for [`UpdateReconciler::acknowledge`]
//!
//! Every failure skips the pass without side effects; the next trigger
//! tries again. Tabs reconcile concurrently with no coordination beyond
//! idempotent eviction and a last-writer-wins record.

mod record;
mod schedule;

pub use record::*;
pub use schedule::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spin::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::RuntimeConfig;
use crate::error::CacheOpError;
use crate::service_worker::CacheRepository;
use crate::version::{VersionDescriptor, VersionFetcher};

/// Default spacing below which interval ticks are skipped.
const DEFAULT_MIN_CHECK_SPACING: Duration = Duration::from_secs(30);

/// Capacity of the update event channel.
const EVENT_CAPACITY: usize = 16;

// ── Collaborators ───────────────────────────────────────────

/// Drops cached app assets. Must be idempotent.
#[async_trait]
pub trait CacheController: Send + Sync {
    /// Returns the number of namespaces removed.
    async fn evict_all(&self) -> Result<usize, CacheOpError>;
}

/// Tells the user a non-mandatory update is available.
#[async_trait]
pub trait UpdateNotifier: Send + Sync {
    async fn update_available(&self, descriptor: &VersionDescriptor);
}

/// The page hosting this reconciler.
pub trait PageHost: Send + Sync {
    /// Reload so the new build is fetched.
    fn reload(&self);
}

/// [`CacheController`] deleting namespaces straight from cache storage.
pub struct CacheStorageController {
    caches: Arc<dyn CacheRepository>,
}

impl CacheStorageController {
    pub fn new(caches: Arc<dyn CacheRepository>) -> Self {
        Self { caches }
    }
}

#[async_trait]
impl CacheController for CacheStorageController {
    async fn evict_all(&self) -> Result<usize, CacheOpError> {
        let mut removed = 0;
        for name in self.caches.list_namespaces().await? {
            if self.caches.delete(&name).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// ── Outcomes ────────────────────────────────────────────────

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    PageLoad,
    Interval,
    VisibilityRestored,
    Forced,
}

/// Why a pass stopped without a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    RecentlyChecked,
    FetchFailed,
    RecordUnavailable,
    EvictionFailed,
    RecordWriteFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Skipped(SkipReason),
    /// First run: the deployment was recorded without reloading.
    Adopted(VersionDescriptor),
    UpToDate,
    /// Newer deployment waiting for acknowledgment.
    UpdateAvailable(VersionDescriptor),
    /// Newer deployment the user dismissed.
    Deferred(VersionDescriptor),
    /// Caches evicted, record written, reload requested.
    Updated(VersionDescriptor),
}

/// In-page update events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    CheckTriggered(Trigger),
    UpdateAvailable(VersionDescriptor),
    UpdateApplied(VersionDescriptor),
}

type BuildKey = (u64, String);

fn build_key(descriptor: &VersionDescriptor) -> BuildKey {
    (descriptor.build_timestamp, descriptor.version.clone())
}

/// Clears the in-flight flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Reconciler ──────────────────────────────────────────────

pub struct UpdateReconciler {
    fetcher: Arc<dyn VersionFetcher>,
    cache: Arc<dyn CacheController>,
    notifier: Arc<dyn UpdateNotifier>,
    host: Arc<dyn PageHost>,
    store: Arc<dyn VersionRecordStore>,
    min_check_spacing: Duration,
    in_flight: AtomicBool,
    last_check: Mutex<Option<Instant>>,
    pending: Mutex<Option<VersionDescriptor>>,
    announced: Mutex<Option<BuildKey>>,
    dismissed: Mutex<Option<BuildKey>>,
    events: broadcast::Sender<UpdateEvent>,
}

impl UpdateReconciler {
    pub fn new(
        fetcher: Arc<dyn VersionFetcher>,
        cache: Arc<dyn CacheController>,
        notifier: Arc<dyn UpdateNotifier>,
        host: Arc<dyn PageHost>,
        store: Arc<dyn VersionRecordStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            fetcher,
            cache,
            notifier,
            host,
            store,
            min_check_spacing: DEFAULT_MIN_CHECK_SPACING,
            in_flight: AtomicBool::new(false),
            last_check: Mutex::new(None),
            pending: Mutex::new(None),
            announced: Mutex::new(None),
            dismissed: Mutex::new(None),
            events,
        }
    }

    /// Build with the check spacing taken from `config`.
    pub fn from_config(
        fetcher: Arc<dyn VersionFetcher>,
        cache: Arc<dyn CacheController>,
        notifier: Arc<dyn UpdateNotifier>,
        host: Arc<dyn PageHost>,
        store: Arc<dyn VersionRecordStore>,
        config: &RuntimeConfig,
    ) -> Self {
        Self::new(fetcher, cache, notifier, host, store)
            .with_min_check_spacing(config.min_check_spacing())
    }

    pub fn with_min_check_spacing(mut self, spacing: Duration) -> Self {
        self.min_check_spacing = spacing;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.events.subscribe()
    }

    /// The announced update waiting for acknowledgment, if any.
    pub fn pending(&self) -> Option<VersionDescriptor> {
        self.pending.lock().clone()
    }

    /// Run one reconciliation pass.
    pub async fn reconcile(&self, trigger: Trigger) -> ReconcileOutcome {
        let Some(_guard) = PassGuard::acquire(&self.in_flight) else {
            log::debug!("[Reconciler] {:?} skipped, pass in flight", trigger);
            return ReconcileOutcome::Skipped(SkipReason::InFlight);
        };
        if trigger == Trigger::Interval && self.checked_recently() {
            return ReconcileOutcome::Skipped(SkipReason::RecentlyChecked);
        }
        *self.last_check.lock() = Some(Instant::now());
        self.emit(UpdateEvent::CheckTriggered(trigger));

        let remote = match self.fetcher.fetch_current().await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                log::debug!("[Reconciler] version fetch failed: {}", e);
                return ReconcileOutcome::Skipped(SkipReason::FetchFailed);
            }
        };

        let local = match self.store.load().await {
            Ok(Some(local)) => local,
            Ok(None) => return self.adopt(remote).await,
            Err(e) => {
                log::warn!("[Reconciler] version record unreadable: {}", e);
                return ReconcileOutcome::Skipped(SkipReason::RecordUnavailable);
            }
        };

        if !remote.is_newer_than(local.build_timestamp, &local.version) {
            *self.pending.lock() = None;
            return ReconcileOutcome::UpToDate;
        }

        if remote.force_update || remote.requires_update_from(&local.version) {
            log::info!(
                "[Reconciler] mandatory update {} -> {}",
                local.version,
                remote.version
            );
            return self.apply(remote).await;
        }

        self.offer(remote).await
    }

    /// Apply the pending update. `None` when nothing is pending.
    ///
    /// The record is read again first: another tab may have moved it past
    /// the pending build since it was announced, in which case the update
    /// is dropped and `UpToDate` returned.
    pub async fn acknowledge(&self) -> Option<ReconcileOutcome> {
        let descriptor = self.pending.lock().take()?;
        let Some(_guard) = PassGuard::acquire(&self.in_flight) else {
            *self.pending.lock() = Some(descriptor);
            return Some(ReconcileOutcome::Skipped(SkipReason::InFlight));
        };
        match self.store.load().await {
            Ok(Some(local)) if !descriptor.is_newer_than(local.build_timestamp, &local.version) => {
                log::debug!(
                    "[Reconciler] {} superseded by recorded {}, nothing to apply",
                    descriptor.version,
                    local.version
                );
                return Some(ReconcileOutcome::UpToDate);
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("[Reconciler] version record unreadable: {}", e);
                *self.pending.lock() = Some(descriptor);
                return Some(ReconcileOutcome::Skipped(SkipReason::RecordUnavailable));
            }
        }
        let outcome = self.apply(descriptor.clone()).await;
        if matches!(outcome, ReconcileOutcome::Skipped(_)) {
            *self.pending.lock() = Some(descriptor);
        }
        Some(outcome)
    }

    /// Drop the pending update until a newer deployment appears.
    pub fn dismiss(&self) -> Option<VersionDescriptor> {
        let descriptor = self.pending.lock().take()?;
        *self.dismissed.lock() = Some(build_key(&descriptor));
        log::debug!("[Reconciler] update {} dismissed", descriptor.version);
        Some(descriptor)
    }

    fn checked_recently(&self) -> bool {
        let last = *self.last_check.lock();
        last.is_some_and(|at| at.elapsed() < self.min_check_spacing)
    }

    fn emit(&self, event: UpdateEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn adopt(&self, remote: VersionDescriptor) -> ReconcileOutcome {
        if let Err(e) = self.store.save(&LocalVersionRecord::from_descriptor(&remote)).await {
            log::warn!("[Reconciler] could not record {}: {}", remote.version, e);
            return ReconcileOutcome::Skipped(SkipReason::RecordWriteFailed);
        }
        log::debug!("[Reconciler] adopted {}", remote.version);
        ReconcileOutcome::Adopted(remote)
    }

    async fn offer(&self, remote: VersionDescriptor) -> ReconcileOutcome {
        let key = build_key(&remote);
        if self.dismissed.lock().as_ref() == Some(&key) {
            return ReconcileOutcome::Deferred(remote);
        }
        *self.pending.lock() = Some(remote.clone());

        let first_notice = {
            let mut announced = self.announced.lock();
            if announced.as_ref() == Some(&key) {
                false
            } else {
                *announced = Some(key);
                true
            }
        };
        if first_notice {
            log::info!("[Reconciler] update {} available", remote.version);
            self.notifier.update_available(&remote).await;
            self.emit(UpdateEvent::UpdateAvailable(remote.clone()));
        }
        ReconcileOutcome::UpdateAvailable(remote)
    }

    /// Evict, record, reload. Each step only runs if the previous succeeded.
    async fn apply(&self, remote: VersionDescriptor) -> ReconcileOutcome {
        match self.cache.evict_all().await {
            Ok(removed) => log::debug!("[Reconciler] evicted {} namespaces", removed),
            Err(e) => {
                log::warn!("[Reconciler] eviction failed, retrying next pass: {}", e);
                return ReconcileOutcome::Skipped(SkipReason::EvictionFailed);
            }
        }
        if let Err(e) = self.store.save(&LocalVersionRecord::from_descriptor(&remote)).await {
            log::warn!("[Reconciler] could not record {}: {}", remote.version, e);
            return ReconcileOutcome::Skipped(SkipReason::RecordWriteFailed);
        }
        *self.pending.lock() = None;
        log::info!("[Reconciler] updated to {} ({})", remote.version, remote.build_timestamp);
        self.emit(UpdateEvent::UpdateApplied(remote.clone()));
        self.host.reload();
        ReconcileOutcome::Updated(remote)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::service_worker::testing::FixedFetcher;

    struct Fixture {
        fetcher: Arc<FixedFetcher>,
        cache: Arc<CountingCache>,
        notifier: Arc<RecordingNotifier>,
        host: Arc<CountingHost>,
        store: Arc<FlakyStore>,
        reconciler: UpdateReconciler,
    }

    fn fixture(record: Option<(&str, u64)>) -> Fixture {
        let fetcher = Arc::new(FixedFetcher::default());
        let cache = Arc::new(CountingCache::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let host = Arc::new(CountingHost::default());
        let store = Arc::new(FlakyStore {
            inner: match record {
                Some((version, ts)) => {
                    MemoryRecordStore::with_record(LocalVersionRecord::new(version, ts))
                }
                None => MemoryRecordStore::new(),
            },
            fail_writes: AtomicBool::new(false),
        });
        let reconciler = UpdateReconciler::new(
            fetcher.clone(),
            cache.clone(),
            notifier.clone(),
            host.clone(),
            store.clone(),
        );
        Fixture {
            fetcher,
            cache,
            notifier,
            host,
            store,
            reconciler,
        }
    }

    #[tokio::test]
    async fn newer_deployment_waits_for_acknowledgment() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.1.0", 2000));

        let outcome = f.reconciler.reconcile(Trigger::PageLoad).await;
        assert!(matches!(outcome, ReconcileOutcome::UpdateAvailable(ref d) if d.build_timestamp == 2000));
        assert_eq!(f.cache.evictions(), 0);
        assert_eq!(f.host.reloads(), 0);
        assert_eq!(f.notifier.notices.lock().len(), 1);
        assert_eq!(f.store.inner.get().unwrap().build_timestamp, 1000);

        let applied = f.reconciler.acknowledge().await.unwrap();
        assert!(matches!(applied, ReconcileOutcome::Updated(_)));
        assert_eq!(f.cache.evictions(), 1);
        assert_eq!(f.host.reloads(), 1);
        assert_eq!(f.store.inner.get().unwrap().build_timestamp, 2000);
        assert!(f.reconciler.pending().is_none());
        assert!(f.reconciler.acknowledge().await.is_none());
    }

    #[tokio::test]
    async fn repeated_passes_are_idempotent() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.0.0", 1000));
        for _ in 0..3 {
            assert_eq!(
                f.reconciler.reconcile(Trigger::Forced).await,
                ReconcileOutcome::UpToDate
            );
        }
        assert_eq!(f.cache.evictions(), 0);
        assert_eq!(f.host.reloads(), 0);
    }

    #[tokio::test]
    async fn older_deployment_is_ignored() {
        let f = fixture(Some(("2.0.0", 2000)));
        f.fetcher.deploy(VersionDescriptor::new("1.0.0", 1000).with_force_update(true));
        assert_eq!(
            f.reconciler.reconcile(Trigger::Forced).await,
            ReconcileOutcome::UpToDate
        );
        assert_eq!(f.cache.evictions(), 0);
    }

    #[tokio::test]
    async fn force_update_skips_acknowledgment() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.1.0", 2000).with_force_update(true));
        let outcome = f.reconciler.reconcile(Trigger::PageLoad).await;
        assert!(matches!(outcome, ReconcileOutcome::Updated(_)));
        assert_eq!(f.cache.evictions(), 1);
        assert_eq!(f.host.reloads(), 1);
        assert!(f.notifier.notices.lock().is_empty());
    }

    #[tokio::test]
    async fn below_minimum_supported_is_mandatory() {
        let f = fixture(Some(("1.2.0", 1000)));
        f.fetcher
            .deploy(VersionDescriptor::new("2.0.0", 2000).with_minimum_supported("1.5.0"));
        assert!(matches!(
            f.reconciler.reconcile(Trigger::PageLoad).await,
            ReconcileOutcome::Updated(_)
        ));
    }

    #[tokio::test]
    async fn fetch_failure_has_no_side_effects() {
        let f = fixture(Some(("1.0.0", 1000)));
        assert_eq!(
            f.reconciler.reconcile(Trigger::PageLoad).await,
            ReconcileOutcome::Skipped(SkipReason::FetchFailed)
        );
        assert_eq!(f.cache.evictions(), 0);
        assert_eq!(f.store.inner.get().unwrap().build_timestamp, 1000);
    }

    #[tokio::test]
    async fn first_run_adopts_without_reload() {
        let f = fixture(None);
        f.fetcher.deploy(VersionDescriptor::new("1.0.0", 1000).with_force_update(true));
        assert!(matches!(
            f.reconciler.reconcile(Trigger::PageLoad).await,
            ReconcileOutcome::Adopted(_)
        ));
        assert_eq!(f.cache.evictions(), 0);
        assert_eq!(f.host.reloads(), 0);
        assert_eq!(f.store.inner.get().unwrap().version, "1.0.0");
    }

    #[tokio::test]
    async fn eviction_failure_leaves_record_alone() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.1.0", 2000).with_force_update(true));
        f.cache.fail.store(true, Ordering::SeqCst);

        assert_eq!(
            f.reconciler.reconcile(Trigger::PageLoad).await,
            ReconcileOutcome::Skipped(SkipReason::EvictionFailed)
        );
        assert_eq!(f.store.inner.get().unwrap().build_timestamp, 1000);
        assert_eq!(f.host.reloads(), 0);

        f.cache.fail.store(false, Ordering::SeqCst);
        assert!(matches!(
            f.reconciler.reconcile(Trigger::Forced).await,
            ReconcileOutcome::Updated(_)
        ));
    }

    #[tokio::test]
    async fn record_write_failure_blocks_reload() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.1.0", 2000));
        f.reconciler.reconcile(Trigger::PageLoad).await;
        f.store.fail_writes.store(true, Ordering::SeqCst);

        assert_eq!(
            f.reconciler.acknowledge().await,
            Some(ReconcileOutcome::Skipped(SkipReason::RecordWriteFailed))
        );
        assert_eq!(f.host.reloads(), 0);
        // Still pending, so the user can try again.
        assert!(f.reconciler.pending().is_some());
    }

    #[tokio::test]
    async fn acknowledge_after_another_tab_moved_ahead_is_a_no_op() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("2.0.0", 2000));
        assert!(matches!(
            f.reconciler.reconcile(Trigger::PageLoad).await,
            ReconcileOutcome::UpdateAvailable(_)
        ));

        // A second tab sharing the record already applied a newer build.
        f.store
            .save(&LocalVersionRecord::new("3.0.0", 3000))
            .await
            .unwrap();

        assert_eq!(
            f.reconciler.acknowledge().await,
            Some(ReconcileOutcome::UpToDate)
        );
        assert_eq!(f.store.inner.get().unwrap().build_timestamp, 3000);
        assert_eq!(f.cache.evictions(), 0);
        assert_eq!(f.host.reloads(), 0);
        assert!(f.reconciler.pending().is_none());
    }

    #[tokio::test]
    async fn notifies_once_per_deployment() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.1.0", 2000));
        f.reconciler.reconcile(Trigger::PageLoad).await;
        f.reconciler.reconcile(Trigger::Forced).await;
        assert_eq!(f.notifier.notices.lock().len(), 1);

        f.fetcher.deploy(VersionDescriptor::new("1.2.0", 3000));
        f.reconciler.reconcile(Trigger::Forced).await;
        assert_eq!(f.notifier.notices.lock().len(), 2);
        assert_eq!(f.reconciler.pending().unwrap().build_timestamp, 3000);
    }

    #[tokio::test]
    async fn dismissed_until_newer_deployment() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.1.0", 2000));
        f.reconciler.reconcile(Trigger::PageLoad).await;
        assert!(f.reconciler.dismiss().is_some());

        assert!(matches!(
            f.reconciler.reconcile(Trigger::Forced).await,
            ReconcileOutcome::Deferred(_)
        ));
        assert!(f.reconciler.pending().is_none());

        f.fetcher.deploy(VersionDescriptor::new("1.2.0", 3000));
        assert!(matches!(
            f.reconciler.reconcile(Trigger::Forced).await,
            ReconcileOutcome::UpdateAvailable(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_respect_spacing() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.0.0", 1000));
        f.reconciler.reconcile(Trigger::PageLoad).await;

        assert_eq!(
            f.reconciler.reconcile(Trigger::Interval).await,
            ReconcileOutcome::Skipped(SkipReason::RecentlyChecked)
        );
        // On-demand triggers are never throttled.
        assert_eq!(
            f.reconciler.reconcile(Trigger::VisibilityRestored).await,
            ReconcileOutcome::UpToDate
        );

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(
            f.reconciler.reconcile(Trigger::Interval).await,
            ReconcileOutcome::UpToDate
        );
        assert_eq!(f.fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn configured_spacing_throttles_interval() {
        let f = fixture(Some(("1.0.0", 1000)));
        f.fetcher.deploy(VersionDescriptor::new("1.0.0", 1000));
        let config = RuntimeConfig {
            min_check_spacing_secs: 90,
            ..RuntimeConfig::default()
        };
        let reconciler = UpdateReconciler::from_config(
            f.fetcher.clone(),
            f.cache.clone(),
            f.notifier.clone(),
            f.host.clone(),
            f.store.clone(),
            &config,
        );
        reconciler.reconcile(Trigger::PageLoad).await;

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(
            reconciler.reconcile(Trigger::Interval).await,
            ReconcileOutcome::Skipped(SkipReason::RecentlyChecked)
        );
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(
            reconciler.reconcile(Trigger::Interval).await,
            ReconcileOutcome::UpToDate
        );
    }

    #[tokio::test]
    async fn overlapping_pass_is_rejected() {
        let f = fixture(Some(("1.0.0", 1000)));
        let _held = PassGuard::acquire(&f.reconciler.in_flight).unwrap();
        assert_eq!(
            f.reconciler.reconcile(Trigger::Forced).await,
            ReconcileOutcome::Skipped(SkipReason::InFlight)
        );
        assert_eq!(f.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn events_are_broadcast() {
        let f = fixture(Some(("1.0.0", 1000)));
        let mut events = f.reconciler.subscribe();
        f.fetcher.deploy(VersionDescriptor::new("1.1.0", 2000).with_force_update(true));
        f.reconciler.reconcile(Trigger::Forced).await;

        assert_eq!(
            events.recv().await.unwrap(),
            UpdateEvent::CheckTriggered(Trigger::Forced)
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            UpdateEvent::UpdateApplied(ref d) if d.version == "1.1.0"
        ));
    }

    #[tokio::test]
    async fn storage_controller_evicts_every_namespace() {
        let storage = Arc::new(crate::service_worker::MemoryCacheStorage::new());
        storage.open("app-shell-v1-1").await.unwrap();
        storage.open("app-shell-v2-2").await.unwrap();
        let controller = CacheStorageController::new(storage.clone());
        assert_eq!(controller.evict_all().await.unwrap(), 2);
        assert_eq!(controller.evict_all().await.unwrap(), 0);
    }
}
