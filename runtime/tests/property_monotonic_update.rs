//! Monotonic update decisions.
//!
//! For any two deployments A < B (by build timestamp), a client holding A
//! moves to B and a client holding B never moves back to A. Running the
//! same pass repeatedly never evicts or reloads more than once.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use pwa_runtime::error::{CacheOpError, VersionError};
use pwa_runtime::reconciler::{
    CacheController, LocalVersionRecord, MemoryRecordStore, PageHost, ReconcileOutcome, Trigger,
    UpdateNotifier, UpdateReconciler,
};
use pwa_runtime::version::{compare_versions, order_builds};
use pwa_runtime::{VersionDescriptor, VersionFetcher};

struct Deployed(VersionDescriptor);

#[async_trait]
impl VersionFetcher for Deployed {
    async fn fetch_current(&self) -> Result<VersionDescriptor, VersionError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct Counters {
    evictions: AtomicUsize,
    reloads: AtomicUsize,
    notices: AtomicUsize,
}

#[async_trait]
impl CacheController for Counters {
    async fn evict_all(&self) -> Result<usize, CacheOpError> {
        self.evictions.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
}

#[async_trait]
impl UpdateNotifier for Counters {
    async fn update_available(&self, _descriptor: &VersionDescriptor) {
        self.notices.fetch_add(1, Ordering::SeqCst);
    }
}

impl PageHost for Counters {
    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn reconciler(
    held: (&str, u64),
    deployed: VersionDescriptor,
) -> (UpdateReconciler, Arc<Counters>, Arc<MemoryRecordStore>) {
    let counters = Arc::new(Counters::default());
    let store = Arc::new(MemoryRecordStore::with_record(LocalVersionRecord::new(
        held.0, held.1,
    )));
    let reconciler = UpdateReconciler::new(
        Arc::new(Deployed(deployed)),
        counters.clone(),
        counters.clone(),
        counters.clone(),
        store.clone(),
    );
    (reconciler, counters, store)
}

fn arb_version() -> impl Strategy<Value = String> {
    (0u32..20, 0u32..20, 0u32..50, proptest::option::of("[a-z]{1,6}")).prop_map(
        |(major, minor, patch, suffix)| match suffix {
            Some(s) => format!("{major}.{minor}.{patch}-{s}"),
            None => format!("{major}.{minor}.{patch}"),
        },
    )
}

proptest! {
    #[test]
    fn older_client_moves_forward(
        va in arb_version(),
        vb in arb_version(),
        ts_a in 1u64..1_000_000,
        gap in 1u64..1_000_000,
        force in any::<bool>(),
    ) {
        let ts_b = ts_a + gap;
        let deployed = VersionDescriptor::new(vb.clone(), ts_b).with_force_update(force);
        let (r, counters, store) = reconciler((va.as_str(), ts_a), deployed);

        let outcome = runtime().block_on(r.reconcile(Trigger::PageLoad));
        if force {
            prop_assert!(matches!(outcome, ReconcileOutcome::Updated(_)));
            prop_assert_eq!(store.get().unwrap().build_timestamp, ts_b);
            prop_assert_eq!(counters.reloads.load(Ordering::SeqCst), 1);
        } else {
            let moved = matches!(
                outcome,
                ReconcileOutcome::UpdateAvailable(_) | ReconcileOutcome::Updated(_)
            );
            prop_assert!(moved);
        }
    }

    #[test]
    fn newer_client_never_moves_back(
        va in arb_version(),
        vb in arb_version(),
        ts_a in 1u64..1_000_000,
        gap in 1u64..1_000_000,
        force in any::<bool>(),
    ) {
        let ts_b = ts_a + gap;
        let deployed = VersionDescriptor::new(va, ts_a).with_force_update(force);
        let (r, counters, store) = reconciler((vb.as_str(), ts_b), deployed);

        let outcome = runtime().block_on(r.reconcile(Trigger::PageLoad));
        prop_assert_eq!(outcome, ReconcileOutcome::UpToDate);
        prop_assert_eq!(counters.evictions.load(Ordering::SeqCst), 0);
        prop_assert_eq!(store.get().unwrap().build_timestamp, ts_b);
    }

    #[test]
    fn repeated_passes_act_at_most_once(
        ts_local in 1u64..1_000_000,
        delta in 0u64..1_000,
        force in any::<bool>(),
        passes in 2usize..6,
    ) {
        let deployed = VersionDescriptor::new("2.0.0", ts_local + delta).with_force_update(force);
        let (r, counters, _) = reconciler(("1.0.0", ts_local), deployed);

        let rt = runtime();
        for _ in 0..passes {
            rt.block_on(r.reconcile(Trigger::Forced));
        }
        prop_assert!(counters.evictions.load(Ordering::SeqCst) <= 1);
        prop_assert!(counters.reloads.load(Ordering::SeqCst) <= 1);
        prop_assert!(counters.notices.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn build_order_is_antisymmetric(
        ts_a in 0u64..100,
        ts_b in 0u64..100,
        va in arb_version(),
        vb in arb_version(),
    ) {
        prop_assert_eq!(
            order_builds(ts_a, &va, ts_b, &vb),
            order_builds(ts_b, &vb, ts_a, &va).reverse()
        );
    }

    #[test]
    fn version_floor_compare_is_antisymmetric(a in arb_version(), b in arb_version()) {
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        prop_assert_eq!(compare_versions(&a, &a), CmpOrdering::Equal);
    }
}
