//! Client Message Router
//!
//! Worker side: turns a notification click into "focus an open tab and tell
//! it where to go", or opens a new window when no tab is open.
//!
//! Tab side: [`MessageRouter`] receives [`ClientMessage`]s from the worker
//! and hands them to the app's navigation layer. Message types it does not
//! know are ignored so older tabs keep working against newer workers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::config::RuntimeConfig;
use crate::net::is_same_origin;
use crate::notification::{Category, NotificationData, NotificationSurface, DISMISS_ACTION};
use crate::service_worker::{ClientInfo, Clients};
use crate::version::BuildInfo;

/// A notification was clicked; `url` is where the tab should navigate.
pub const NOTIFICATION_CLICK: &str = "NOTIFICATION_CLICK";

/// A newer build is active (or available); `data` carries its identity.
pub const UPDATE_READY: &str = "UPDATE_READY";

/// Worker → tab message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NotificationClick,
    UpdateReady,
    Unknown,
}

impl ClientMessage {
    pub fn notification_click(url: impl Into<String>, data: Value) -> Self {
        Self {
            kind: NOTIFICATION_CLICK.to_string(),
            url: Some(url.into()),
            data,
        }
    }

    pub fn update_ready(build: &BuildInfo) -> Self {
        Self {
            kind: UPDATE_READY.to_string(),
            url: None,
            data: json!({
                "version": build.version,
                "buildTimestamp": build.build_timestamp,
            }),
        }
    }

    pub fn message_kind(&self) -> MessageKind {
        match self.kind.as_str() {
            NOTIFICATION_CLICK => MessageKind::NotificationClick,
            UPDATE_READY => MessageKind::UpdateReady,
            _ => MessageKind::Unknown,
        }
    }
}

// ── Worker side ─────────────────────────────────────────────

/// A click on a shown notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationClick {
    pub tag: String,
    /// Action button id, `None` for a click on the body.
    pub action: Option<String>,
    pub data: NotificationData,
}

impl NotificationClick {
    pub fn new(tag: impl Into<String>, data: NotificationData) -> Self {
        Self {
            tag: tag.into(),
            action: None,
            data,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Navigation target: the deep link, else the category route.
    pub fn target(&self, config: &RuntimeConfig) -> String {
        match &self.data.url {
            Some(url) => url.clone(),
            None => config
                .routes
                .route_for(self.data.category.unwrap_or(Category::General))
                .to_string(),
        }
    }
}

/// What a notification click resulted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// An open tab was focused and told to navigate.
    Focused { client_id: String, url: String },
    /// No tab was open; a new window was opened at `url`.
    Opened { client_id: String, url: String },
    /// The dismiss action was clicked.
    Dismissed,
    /// Nothing could be focused or opened.
    Dropped { url: String },
}

/// Handle a notification click in the worker.
pub async fn route_notification_click(
    clients: &dyn Clients,
    surface: &dyn NotificationSurface,
    config: &RuntimeConfig,
    click: &NotificationClick,
) -> RouteOutcome {
    surface.close(&click.tag).await;
    if click.action.as_deref() == Some(DISMISS_ACTION) {
        log::debug!("[Router] {} dismissed", click.tag);
        return RouteOutcome::Dismissed;
    }

    let url = click.target(config);
    let data = serde_json::to_value(&click.data).unwrap_or(Value::Null);

    for client in candidates(clients.match_all().await, &config.origin) {
        if let Err(e) = clients.focus(&client.id).await {
            log::debug!("[Router] focus {} failed: {}", client.id, e);
            continue;
        }
        let message = ClientMessage::notification_click(url.clone(), data.clone());
        match clients.post_message(&client.id, message).await {
            Ok(()) => {
                log::debug!("[Router] {} -> {}", url, client.id);
                return RouteOutcome::Focused {
                    client_id: client.id,
                    url,
                };
            }
            Err(e) => log::debug!("[Router] post to {} failed: {}", client.id, e),
        }
    }

    let absolute = config.absolute_url(&url);
    match clients.open_window(&absolute).await {
        Ok(client) => {
            log::debug!("[Router] opened {} at {}", client.id, absolute);
            RouteOutcome::Opened {
                client_id: client.id,
                url: absolute,
            }
        }
        Err(e) => {
            log::warn!("[Router] could not open {}: {}", absolute, e);
            RouteOutcome::Dropped { url: absolute }
        }
    }
}

/// Same-origin clients, focused ones first.
fn candidates(mut clients: Vec<ClientInfo>, origin: &str) -> Vec<ClientInfo> {
    clients.retain(|c| is_same_origin(&c.url, origin));
    clients.sort_by_key(|c| !c.focused);
    clients
}

// ── Tab side ────────────────────────────────────────────────

/// The app's navigation layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);

    /// A newer build is active. `None` when the message carried no
    /// readable build identity.
    fn update_ready(&self, build: Option<BuildInfo>);
}

/// Single listener for worker messages in a tab.
pub struct MessageRouter {
    navigator: Arc<dyn Navigator>,
}

impl MessageRouter {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    /// Dispatch one message. Returns `false` if it was ignored.
    pub fn dispatch(&self, message: &ClientMessage) -> bool {
        match message.message_kind() {
            MessageKind::NotificationClick => match &message.url {
                Some(url) => {
                    self.navigator.navigate(url);
                    true
                }
                None => {
                    log::debug!("[Router] click message without url");
                    false
                }
            },
            MessageKind::UpdateReady => {
                let build = serde_json::from_value(message.data.clone()).ok();
                self.navigator.update_ready(build);
                true
            }
            MessageKind::Unknown => {
                log::debug!("[Router] ignoring message type {:?}", message.kind);
                false
            }
        }
    }

    /// Dispatch a raw JSON message as received from the channel.
    pub fn dispatch_raw(&self, raw: &str) -> bool {
        match serde_json::from_str::<ClientMessage>(raw) {
            Ok(message) => self.dispatch(&message),
            Err(e) => {
                log::debug!("[Router] malformed message: {}", e);
                false
            }
        }
    }

    /// Drain `rx` until the worker side hangs up. Returns the number of
    /// dispatched (not ignored) messages.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<ClientMessage>) -> usize {
        let mut dispatched = 0;
        while let Some(message) = rx.recv().await {
            if self.dispatch(&message) {
                dispatched += 1;
            }
        }
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{build_payload, MemoryNotificationCenter, NotificationRequest};
    use crate::service_worker::ClientRegistry;
    use spin::Mutex;

    const ORIGIN: &str = "https://app.example.com";

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<String>>,
        updates: Mutex<Vec<Option<BuildInfo>>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, url: &str) {
            self.visits.lock().push(url.to_string());
        }

        fn update_ready(&self, build: Option<BuildInfo>) {
            self.updates.lock().push(build);
        }
    }

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            origin: ORIGIN.to_string(),
            ..RuntimeConfig::default()
        }
    }

    async fn shown(
        surface: &MemoryNotificationCenter,
        category: Category,
        url: Option<&str>,
    ) -> NotificationClick {
        let mut request = NotificationRequest::default();
        request.url = url.map(str::to_string);
        let payload = build_payload(category, request);
        surface.show(payload.clone()).await.unwrap();
        NotificationClick::new(payload.tag, payload.data)
    }

    #[tokio::test]
    async fn click_focuses_open_tab() {
        let clients = ClientRegistry::new();
        let surface = MemoryNotificationCenter::new();
        let (other, _other_rx) = clients.connect("https://elsewhere.example/");
        let (tab, mut rx) = clients.connect(format!("{ORIGIN}/dashboard"));
        let click = shown(&surface, Category::Task, Some("/tasks/9")).await;

        let outcome = route_notification_click(&clients, &surface, &config(), &click).await;
        assert_eq!(
            outcome,
            RouteOutcome::Focused {
                client_id: tab.id.clone(),
                url: "/tasks/9".to_string()
            }
        );
        assert!(surface.visible().is_empty());
        assert!(clients.get(&tab.id).unwrap().focused);
        assert!(!clients.get(&other.id).unwrap().focused);

        let message = rx.try_recv().unwrap();
        assert_eq!(message.kind, NOTIFICATION_CLICK);
        assert_eq!(message.url.as_deref(), Some("/tasks/9"));
        assert_eq!(message.data["category"], "task");
    }

    #[tokio::test]
    async fn focused_tab_is_preferred() {
        let clients = ClientRegistry::new();
        let surface = MemoryNotificationCenter::new();
        let (_a, _ra) = clients.connect(format!("{ORIGIN}/a"));
        let (b, _rb) = clients.connect(format!("{ORIGIN}/b"));
        clients.focus(&b.id).await.unwrap();
        let click = shown(&surface, Category::Message, None).await;

        let outcome = route_notification_click(&clients, &surface, &config(), &click).await;
        assert_eq!(
            outcome,
            RouteOutcome::Focused {
                client_id: b.id.clone(),
                url: "/messages".to_string()
            }
        );
    }

    #[tokio::test]
    async fn no_tab_opens_window() {
        let clients = ClientRegistry::new();
        let surface = MemoryNotificationCenter::new();
        let click = shown(&surface, Category::Task, None).await;

        let outcome = route_notification_click(&clients, &surface, &config(), &click).await;
        match outcome {
            RouteOutcome::Opened { url, .. } => assert_eq!(url, format!("{ORIGIN}/tasks")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(clients.take_opened().len(), 1);
    }

    #[tokio::test]
    async fn closed_tab_falls_back_to_new_window() {
        let clients = ClientRegistry::new();
        let surface = MemoryNotificationCenter::new();
        let (_tab, rx) = clients.connect(format!("{ORIGIN}/"));
        drop(rx);
        let click = shown(&surface, Category::General, Some("/settings")).await;

        let outcome = route_notification_click(&clients, &surface, &config(), &click).await;
        assert!(matches!(outcome, RouteOutcome::Opened { .. }));
    }

    #[tokio::test]
    async fn unopenable_window_is_dropped() {
        let clients = ClientRegistry::new();
        clients.block_windows(true);
        let surface = MemoryNotificationCenter::new();
        let click = shown(&surface, Category::General, Some("/settings")).await;

        let outcome = route_notification_click(&clients, &surface, &config(), &click).await;
        assert_eq!(
            outcome,
            RouteOutcome::Dropped {
                url: format!("{ORIGIN}/settings")
            }
        );
    }

    #[tokio::test]
    async fn dismiss_action_only_closes() {
        let clients = ClientRegistry::new();
        let surface = MemoryNotificationCenter::new();
        let (_tab, mut rx) = clients.connect(format!("{ORIGIN}/"));
        let click = shown(&surface, Category::Message, Some("/messages/1"))
            .await
            .with_action(DISMISS_ACTION);

        let outcome = route_notification_click(&clients, &surface, &config(), &click).await;
        assert_eq!(outcome, RouteOutcome::Dismissed);
        assert!(surface.visible().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn tab_dispatches_known_types() {
        let navigator = Arc::new(RecordingNavigator::default());
        let router = MessageRouter::new(navigator.clone());

        assert!(router.dispatch(&ClientMessage::notification_click("/tasks", Value::Null)));
        assert!(router.dispatch(&ClientMessage::update_ready(&BuildInfo::new("2.0.0", 2000))));
        assert_eq!(*navigator.visits.lock(), vec!["/tasks".to_string()]);
        assert_eq!(
            *navigator.updates.lock(),
            vec![Some(BuildInfo::new("2.0.0", 2000))]
        );
    }

    #[test]
    fn unknown_and_malformed_messages_are_ignored() {
        let navigator = Arc::new(RecordingNavigator::default());
        let router = MessageRouter::new(navigator.clone());

        assert!(!router.dispatch_raw(r#"{"type":"CACHE_STATS","data":{"entries":3}}"#));
        assert!(!router.dispatch_raw("not json"));
        assert!(!router.dispatch_raw(r#"{"type":"NOTIFICATION_CLICK"}"#));
        assert!(router.dispatch_raw(r#"{"type":"NOTIFICATION_CLICK","url":"/x"}"#));
        assert_eq!(*navigator.visits.lock(), vec!["/x".to_string()]);
    }

    #[test]
    fn wire_format() {
        let message = ClientMessage::notification_click("/tasks", json!({"id": 1}));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, json!({"type": "NOTIFICATION_CLICK", "url": "/tasks", "data": {"id": 1}}));
    }

    #[tokio::test]
    async fn run_drains_until_closed() {
        let navigator = Arc::new(RecordingNavigator::default());
        let router = MessageRouter::new(navigator.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ClientMessage::notification_click("/a", Value::Null)).unwrap();
        tx.send(ClientMessage {
            kind: "SOMETHING_NEW".to_string(),
            url: None,
            data: Value::Null,
        })
        .unwrap();
        tx.send(ClientMessage::notification_click("/b", Value::Null)).unwrap();
        drop(tx);

        assert_eq!(router.run(rx).await, 2);
        assert_eq!(*navigator.visits.lock(), vec!["/a", "/b"]);
    }
}
