//! Background Sync
//!
//! Tags registered with the [`SyncManager`] fire once each time the device
//! comes back online. The worker's own tag runs a best-effort version check.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::router::ClientMessage;
use crate::version::VersionDescriptor;

use super::CacheWorker;

/// Registered sync tags and the last known connectivity.
pub struct SyncManager {
    tags: Mutex<BTreeSet<String>>,
    online: AtomicBool,
}

impl SyncManager {
    /// Starts online with no tags.
    pub fn new() -> Self {
        Self {
            tags: Mutex::new(BTreeSet::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Register a tag. Returns `false` if it was already registered.
    pub fn register(&self, tag: impl Into<String>) -> bool {
        self.tags.lock().insert(tag.into())
    }

    pub fn unregister(&self, tag: &str) -> bool {
        self.tags.lock().remove(tag)
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.lock().iter().cloned().collect()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record a connectivity change and return the tags to fire.
    ///
    /// Only an offline → online edge fires; repeated `online` reports do not.
    pub fn connectivity_changed(&self, online: bool) -> Vec<String> {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            self.tags()
        } else {
            Vec::new()
        }
    }
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheWorker {
    /// Feed a connectivity change and run every sync tag it fires.
    /// Returns the number of tags fired.
    pub async fn connectivity_changed(&self, online: bool) -> usize {
        let fired = self.sync.connectivity_changed(online);
        for tag in &fired {
            self.sync(tag).await;
        }
        fired.len()
    }

    /// Handle a sync event. Unknown tags are ignored.
    pub async fn sync(&self, tag: &str) -> bool {
        if tag != self.config.sync_tag {
            log::debug!("[SW Sync] ignoring unknown tag {}", tag);
            return false;
        }
        self.check_for_update().await;
        true
    }

    /// Best-effort check for a deployment newer than this worker's build.
    ///
    /// When one is found every open tab receives `UPDATE_READY` carrying the
    /// new build. Fetch failures are swallowed.
    pub async fn check_for_update(&self) -> Option<VersionDescriptor> {
        let descriptor = match self.fetcher.fetch_current().await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                log::debug!("[SW Sync] version check skipped: {}", e);
                return None;
            }
        };
        if !descriptor.is_newer_than(self.build.build_timestamp, &self.build.version) {
            log::trace!("[SW Sync] {} is current", self.build.version);
            return None;
        }

        log::info!(
            "[SW Sync] deployment {} ({}) supersedes {}",
            descriptor.version,
            descriptor.build_timestamp,
            self.build.version
        );
        let message = ClientMessage::update_ready(&descriptor.build_info());
        for client in self.clients.match_all().await {
            if let Err(e) = self.clients.post_message(&client.id, message.clone()).await {
                log::debug!("[SW Sync] could not notify {}: {}", client.id, e);
            }
        }
        Some(descriptor)
    }
}
