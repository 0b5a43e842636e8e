//! Reconciliation scheduling.
//!
//! One task per tab: a pass on start, one every poll interval, and one per
//! on-demand trigger. Passes run one at a time. The task stops when the
//! handle is shut down or dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::{Trigger, UpdateReconciler};
use crate::config::RuntimeConfig;

pub struct ReconcileLoop;

impl ReconcileLoop {
    /// Start the loop. Must be called from within a tokio runtime.
    pub fn spawn(reconciler: Arc<UpdateReconciler>, poll_interval: Duration) -> ReconcileHandle {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let outcome = reconciler.reconcile(Trigger::PageLoad).await;
            log::debug!("[Reconciler] page load pass: {:?}", outcome);

            let mut ticker = time::interval_at(Instant::now() + poll_interval, poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                let trigger = tokio::select! {
                    _ = ticker.tick() => Trigger::Interval,
                    next = rx.recv() => match next {
                        Some(trigger) => trigger,
                        None => break,
                    },
                };
                let outcome = reconciler.reconcile(trigger).await;
                log::trace!("[Reconciler] {:?} pass: {:?}", trigger, outcome);
            }
            log::debug!("[Reconciler] loop stopped");
        });
        ReconcileHandle {
            triggers: tx,
            task: Some(task),
        }
    }

    /// Start the loop polling every `config.poll_interval_secs`.
    pub fn spawn_with_config(
        reconciler: Arc<UpdateReconciler>,
        config: &RuntimeConfig,
    ) -> ReconcileHandle {
        Self::spawn(reconciler, config.poll_interval())
    }
}

/// Owner of a running [`ReconcileLoop`].
pub struct ReconcileHandle {
    triggers: mpsc::UnboundedSender<Trigger>,
    task: Option<JoinHandle<()>>,
}

impl ReconcileHandle {
    /// Queue an on-demand pass. Returns `false` once the loop has stopped.
    pub fn trigger(&self, trigger: Trigger) -> bool {
        self.triggers.send(trigger).is_ok()
    }

    /// The tab became visible again.
    pub fn visibility_restored(&self) -> bool {
        self.trigger(Trigger::VisibilityRestored)
    }

    pub fn force(&self) -> bool {
        self.trigger(Trigger::Forced)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop, abandoning any pass in progress.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for ReconcileHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
