//! Clients API
//!
//! The worker's view of open tabs: enumerate, focus, message, open.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use spin::Mutex;
use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::router::ClientMessage;

/// Visibility state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityState {
    Hidden,
    #[default]
    Visible,
}

/// Client info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    pub focused: bool,
    pub visibility: VisibilityState,
}

/// Window clients controlled by (or reachable from) the worker.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Every open window client of the origin.
    async fn match_all(&self) -> Vec<ClientInfo>;

    async fn focus(&self, id: &str) -> Result<(), ClientError>;

    async fn post_message(&self, id: &str, message: ClientMessage) -> Result<(), ClientError>;

    async fn open_window(&self, url: &str) -> Result<ClientInfo, ClientError>;

    /// Take control of every open client.
    async fn claim(&self);
}

struct Connected {
    info: ClientInfo,
    tx: mpsc::UnboundedSender<ClientMessage>,
}

/// In-process client registry.
///
/// Each connected tab gets the receiving half of a channel; windows opened
/// by the worker are parked until the host picks them up with
/// [`ClientRegistry::take_opened`].
pub struct ClientRegistry {
    clients: Mutex<BTreeMap<String, Connected>>,
    opened: Mutex<Vec<(ClientInfo, mpsc::UnboundedReceiver<ClientMessage>)>>,
    next_id: AtomicU64,
    claimed: AtomicBool,
    windows_blocked: AtomicBool,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(BTreeMap::new()),
            opened: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            claimed: AtomicBool::new(false),
            windows_blocked: AtomicBool::new(false),
        }
    }

    /// Register an open tab.
    pub fn connect(
        &self,
        url: impl Into<String>,
    ) -> (ClientInfo, mpsc::UnboundedReceiver<ClientMessage>) {
        let id = format!("client-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let info = ClientInfo {
            id: id.clone(),
            url: url.into(),
            focused: false,
            visibility: VisibilityState::Visible,
        };
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.lock().insert(
            id,
            Connected {
                info: info.clone(),
                tx,
            },
        );
        (info, rx)
    }

    /// Remove a tab (closed or navigated away).
    pub fn disconnect(&self, id: &str) -> bool {
        self.clients.lock().remove(id).is_some()
    }

    pub fn set_visibility(&self, id: &str, visibility: VisibilityState) {
        if let Some(client) = self.clients.lock().get_mut(id) {
            client.info.visibility = visibility;
        }
    }

    pub fn get(&self, id: &str) -> Option<ClientInfo> {
        self.clients.lock().get(id).map(|c| c.info.clone())
    }

    /// Windows opened by the worker since the last call.
    pub fn take_opened(&self) -> Vec<(ClientInfo, mpsc::UnboundedReceiver<ClientMessage>)> {
        std::mem::take(&mut *self.opened.lock())
    }

    /// Make `open_window` fail, as a host without window support would.
    pub fn block_windows(&self, blocked: bool) {
        self.windows_blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clients for ClientRegistry {
    async fn match_all(&self) -> Vec<ClientInfo> {
        self.clients.lock().values().map(|c| c.info.clone()).collect()
    }

    async fn focus(&self, id: &str) -> Result<(), ClientError> {
        let mut clients = self.clients.lock();
        if !clients.contains_key(id) {
            return Err(ClientError::NotFound(id.to_string()));
        }
        for (client_id, client) in clients.iter_mut() {
            client.info.focused = client_id == id;
            if client.info.focused {
                client.info.visibility = VisibilityState::Visible;
            }
        }
        Ok(())
    }

    async fn post_message(&self, id: &str, message: ClientMessage) -> Result<(), ClientError> {
        let clients = self.clients.lock();
        let client = clients
            .get(id)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;
        client
            .tx
            .send(message)
            .map_err(|_| ClientError::Closed(id.to_string()))
    }

    async fn open_window(&self, url: &str) -> Result<ClientInfo, ClientError> {
        if self.windows_blocked.load(Ordering::SeqCst) {
            return Err(ClientError::OpenWindow {
                url: url.to_string(),
                reason: "windows blocked".to_string(),
            });
        }
        let (mut info, rx) = self.connect(url);
        self.focus(&info.id).await?;
        info.focused = true;
        self.opened.lock().push((info.clone(), rx));
        Ok(info)
    }

    async fn claim(&self) {
        self.claimed.store(true, Ordering::SeqCst);
    }
}
