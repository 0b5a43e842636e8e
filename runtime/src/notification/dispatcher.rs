//! Notification dispatcher.
//!
//! Chooses the delivery path for each notification:
//! - the worker surface when a worker controls the page (persists after the
//!   tab is backgrounded or closed)
//! - otherwise the in-page surface, never sticky, closed automatically
//!   after `in_page_lifetime`
//!
//! Permission is asked for once, on first use. The answer is kept for the
//! dispatcher's lifetime; anything but `Granted` turns every later call into
//! `NotifyError::PermissionDenied` without prompting again.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spin::{Mutex, RwLock};
use tokio::sync::OnceCell;

use super::{
    build_payload, Category, NotificationPermission, NotificationRequest, NotificationSurface,
    PermissionProvider,
};
use crate::config::RuntimeConfig;
use crate::error::NotifyError;
use crate::reconciler::UpdateNotifier;
use crate::version::VersionDescriptor;

/// Where a notification ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Worker,
    InPage,
}

pub struct NotificationDispatcher {
    permissions: Arc<dyn PermissionProvider>,
    permission: OnceCell<NotificationPermission>,
    in_page: Arc<dyn NotificationSurface>,
    worker: RwLock<Option<Arc<dyn NotificationSurface>>>,
    in_page_lifetime: Duration,
    /// tag -> generation of the latest in-page notification
    generations: Arc<Mutex<BTreeMap<String, u64>>>,
}

impl NotificationDispatcher {
    pub fn new(
        permissions: Arc<dyn PermissionProvider>,
        in_page: Arc<dyn NotificationSurface>,
        in_page_lifetime: Duration,
    ) -> Self {
        Self {
            permissions,
            permission: OnceCell::new(),
            in_page,
            worker: RwLock::new(None),
            in_page_lifetime,
            generations: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Build with the in-page lifetime taken from `config`.
    pub fn from_config(
        permissions: Arc<dyn PermissionProvider>,
        in_page: Arc<dyn NotificationSurface>,
        config: &RuntimeConfig,
    ) -> Self {
        Self::new(permissions, in_page, config.in_page_lifetime())
    }

    /// Attach (or detach) the controlling worker's surface.
    pub fn set_worker_surface(&self, surface: Option<Arc<dyn NotificationSurface>>) {
        *self.worker.write() = surface;
    }

    /// Whether a worker currently controls the page.
    pub fn is_controlled(&self) -> bool {
        self.worker.read().is_some()
    }

    /// Permission, prompting on first use only.
    pub async fn permission(&self) -> NotificationPermission {
        *self
            .permission
            .get_or_init(|| async {
                let permission = match self.permissions.current() {
                    NotificationPermission::Default => self.permissions.request().await,
                    settled => settled,
                };
                if permission != NotificationPermission::Granted {
                    log::warn!("[Notify] permission {:?}, notifications disabled", permission);
                }
                permission
            })
            .await
    }

    /// Show a notification of `category`.
    pub async fn notify(
        &self,
        category: Category,
        request: NotificationRequest,
    ) -> Result<Delivery, NotifyError> {
        if self.permission().await != NotificationPermission::Granted {
            return Err(NotifyError::PermissionDenied);
        }

        let mut payload = build_payload(category, request);
        let worker = self.worker.read().clone();
        if let Some(surface) = worker {
            surface.show(payload).await?;
            log::debug!("[Notify] {} via worker", category);
            return Ok(Delivery::Worker);
        }

        payload.require_interaction = false;
        let tag = payload.tag.clone();
        self.in_page.show(payload).await?;
        self.schedule_close(tag);
        log::debug!("[Notify] {} in page", category);
        Ok(Delivery::InPage)
    }

    /// Close the in-page notification after its lifetime, unless a newer one
    /// with the same tag replaced it in the meantime.
    fn schedule_close(&self, tag: String) {
        let generation = {
            let mut generations = self.generations.lock();
            let entry = generations.entry(tag.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        let generations = self.generations.clone();
        let surface = self.in_page.clone();
        let lifetime = self.in_page_lifetime;
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            let latest = generations.lock().get(&tag).copied();
            if latest == Some(generation) {
                surface.close(&tag).await;
            }
        });
    }
}

#[async_trait]
impl UpdateNotifier for NotificationDispatcher {
    async fn update_available(&self, descriptor: &VersionDescriptor) {
        let mut body = format!("Version {} is ready.", descriptor.version);
        if !descriptor.release_notes.is_empty() {
            body.push(' ');
            body.push_str(&descriptor.release_notes.join(" · "));
        }
        let request = NotificationRequest {
            body: Some(body),
            ..NotificationRequest::default()
        }
        .with_data("version", descriptor.version.clone())
        .with_data("buildTimestamp", descriptor.build_timestamp);

        if let Err(e) = self.notify(Category::Update, request).await {
            log::debug!("[Notify] update notice skipped: {}", e);
        }
    }
}
