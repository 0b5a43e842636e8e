//! Worker Events
//!
//! One handler method per event on [`CacheWorker`], plus [`WorkerEvent`]
//! and [`CacheWorker::handle`] for hosts that deliver events as values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CacheOpError, WorkerError};
use crate::net::Request;
use crate::notification::{build_payload, Category, NotificationRequest};
use crate::reconciler::CacheController;
use crate::router::{route_notification_click, NotificationClick, RouteOutcome};

use super::{CacheWorker, Fetched};

/// Tab → worker message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerMessage {
    /// Run a version check now.
    ForceUpdateCheck,
    /// Activate a waiting worker immediately.
    SkipWaiting,
    /// Drop every cache namespace.
    ClearCaches,
}

impl WorkerMessage {
    /// Parse a posted message; unknown types yield `None`.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Body of a push message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PushPayload {
    pub category: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
}

impl PushPayload {
    /// Decode push data. Non-JSON text becomes the body.
    pub fn decode(data: Option<&[u8]>) -> Self {
        let Some(bytes) = data else {
            return Self::default();
        };
        match serde_json::from_slice(bytes) {
            Ok(payload) => payload,
            Err(_) => Self {
                body: Some(String::from_utf8_lossy(bytes).into_owned()),
                ..Self::default()
            },
        }
    }

    fn category(&self) -> Category {
        self.category
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(Category::General)
    }

    fn into_request(self) -> NotificationRequest {
        NotificationRequest {
            title: self.title,
            body: self.body,
            icon: self.icon,
            url: self.url,
            ..NotificationRequest::default()
        }
    }
}

/// An event delivered to the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Push(Option<Vec<u8>>),
    NotificationClick(NotificationClick),
    Sync(String),
    Message(WorkerMessage),
    /// Connectivity report from the host (`true` = online).
    Connectivity(bool),
}

/// Result of a handled [`WorkerEvent`].
#[derive(Debug, Clone)]
pub enum EventOutput {
    Installed(usize),
    Activated(usize),
    Fetched(Fetched),
    Pushed(bool),
    Routed(RouteOutcome),
    Synced(bool),
    Handled,
    SyncFired(usize),
}

impl CacheWorker {
    /// Dispatch an event to its handler.
    pub async fn handle(&self, event: WorkerEvent) -> Result<EventOutput, WorkerError> {
        Ok(match event {
            WorkerEvent::Install => EventOutput::Installed(self.install().await?),
            WorkerEvent::Activate => EventOutput::Activated(self.activate().await?),
            WorkerEvent::Fetch(request) => EventOutput::Fetched(self.fetch(&request).await),
            WorkerEvent::Push(data) => EventOutput::Pushed(self.push(data.as_deref()).await),
            WorkerEvent::NotificationClick(click) => {
                EventOutput::Routed(self.notification_click(&click).await)
            }
            WorkerEvent::Sync(tag) => EventOutput::Synced(self.sync(&tag).await),
            WorkerEvent::Message(message) => {
                self.message(message).await?;
                EventOutput::Handled
            }
            WorkerEvent::Connectivity(online) => {
                EventOutput::SyncFired(self.connectivity_changed(online).await)
            }
        })
    }

    /// Handle a message posted by a tab.
    pub async fn message(&self, message: WorkerMessage) -> Result<(), WorkerError> {
        log::debug!("[SW {}] message {:?}", self.id.raw(), message);
        match message {
            WorkerMessage::ForceUpdateCheck => {
                self.check_for_update().await;
            }
            WorkerMessage::SkipWaiting => {
                self.skip_waiting().await?;
            }
            WorkerMessage::ClearCaches => {
                self.clear_caches().await?;
            }
        }
        Ok(())
    }

    /// Show a push message. Returns whether a notification was shown.
    pub async fn push(&self, data: Option<&[u8]>) -> bool {
        let payload = PushPayload::decode(data);
        let category = payload.category();
        let notification = build_payload(category, payload.into_request());
        match self.notifications.show(notification).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[SW {}] push notification failed: {}", self.id.raw(), e);
                false
            }
        }
    }

    pub async fn notification_click(&self, click: &NotificationClick) -> RouteOutcome {
        route_notification_click(
            self.clients.as_ref(),
            self.notifications.as_ref(),
            &self.config,
            click,
        )
        .await
    }
}

#[async_trait]
impl CacheController for CacheWorker {
    async fn evict_all(&self) -> Result<usize, CacheOpError> {
        self.clear_caches().await
    }
}
