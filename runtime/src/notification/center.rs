//! Notification surfaces and permission.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use spin::Mutex;

use super::NotificationPayload;
use crate::error::NotifyError;

/// Somewhere notifications can be shown: the worker's persistent
/// notification API or the page itself.
#[async_trait]
pub trait NotificationSurface: Send + Sync {
    /// Show `payload`, replacing any visible notification with the same tag.
    async fn show(&self, payload: NotificationPayload) -> Result<(), NotifyError>;

    /// Close the notification with `tag`. Returns `false` if none was shown.
    async fn close(&self, tag: &str) -> bool;
}

/// In-memory surface. Keeps visible notifications in display order.
pub struct MemoryNotificationCenter {
    visible: Mutex<Vec<NotificationPayload>>,
    shown: AtomicUsize,
}

impl MemoryNotificationCenter {
    pub fn new() -> Self {
        Self {
            visible: Mutex::new(Vec::new()),
            shown: AtomicUsize::new(0),
        }
    }

    pub fn visible(&self) -> Vec<NotificationPayload> {
        self.visible.lock().clone()
    }

    pub fn get(&self, tag: &str) -> Option<NotificationPayload> {
        self.visible.lock().iter().find(|n| n.tag == tag).cloned()
    }

    /// Number of `show` calls so far.
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl Default for MemoryNotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSurface for MemoryNotificationCenter {
    async fn show(&self, payload: NotificationPayload) -> Result<(), NotifyError> {
        let mut visible = self.visible.lock();
        visible.retain(|n| n.tag != payload.tag);
        visible.push(payload);
        self.shown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self, tag: &str) -> bool {
        let mut visible = self.visible.lock();
        let before = visible.len();
        visible.retain(|n| n.tag != tag);
        visible.len() != before
    }
}

// ── Permission ──────────────────────────────────────────────

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPermission {
    /// User hasn't been asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

/// Platform permission state and prompt.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    fn current(&self) -> NotificationPermission;

    /// Prompt the user. Only called while `current()` is `Default`.
    async fn request(&self) -> NotificationPermission;
}

/// Permission provider with a scripted prompt answer.
pub struct StaticPermission {
    state: Mutex<NotificationPermission>,
    answer: NotificationPermission,
    prompts: AtomicUsize,
}

impl StaticPermission {
    /// Not yet asked; a prompt resolves to `answer`.
    pub fn prompting(answer: NotificationPermission) -> Self {
        Self {
            state: Mutex::new(NotificationPermission::Default),
            answer,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::settled(NotificationPermission::Granted)
    }

    pub fn denied() -> Self {
        Self::settled(NotificationPermission::Denied)
    }

    fn settled(state: NotificationPermission) -> Self {
        Self {
            state: Mutex::new(state),
            answer: state,
            prompts: AtomicUsize::new(0),
        }
    }

    /// How many times the user was prompted.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionProvider for StaticPermission {
    fn current(&self) -> NotificationPermission {
        *self.state.lock()
    }

    async fn request(&self) -> NotificationPermission {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = self.answer;
        self.answer
    }
}
