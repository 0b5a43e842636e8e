//! Notifications
//!
//! Normalizes caller requests into [`NotificationPayload`]s: caller fields
//! are merged over per-category defaults, the tag is forced to
//! `<category>-notification` so a newer notification of the same category
//! replaces the older one, and `data.category` is stamped for click routing.

mod center;
mod dispatcher;

pub use center::*;
pub use dispatcher::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default notification icon
pub const DEFAULT_ICON: &str = "/icons/icon-192x192.png";

/// Default monochrome badge
pub const DEFAULT_BADGE: &str = "/icons/badge-72x72.png";

/// Action id that closes a notification without navigating.
pub const DISMISS_ACTION: &str = "dismiss";

// ── Category ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Message,
    Task,
    General,
    Update,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Message => "message",
            Category::Task => "task",
            Category::General => "general",
            Category::Update => "update",
        }
    }

    /// Deduplication tag shared by every notification of this category.
    pub fn tag(&self) -> String {
        format!("{}-notification", self.as_str())
    }

    /// Baseline payload for this category.
    pub fn defaults(&self) -> NotificationPayload {
        let (title, body, require_interaction, actions) = match self {
            Category::Message => (
                "New message",
                "You have a new message",
                false,
                vec![
                    NotificationAction::new("open", "View"),
                    NotificationAction::new(DISMISS_ACTION, "Dismiss"),
                ],
            ),
            Category::Task => (
                "Task update",
                "A task needs your attention",
                true,
                vec![
                    NotificationAction::new("open", "View task"),
                    NotificationAction::new(DISMISS_ACTION, "Dismiss"),
                ],
            ),
            Category::General => ("Notification", "", false, Vec::new()),
            Category::Update => (
                "Update available",
                "A new version is ready",
                true,
                vec![
                    NotificationAction::new("update", "Update now"),
                    NotificationAction::new(DISMISS_ACTION, "Later"),
                ],
            ),
        };
        NotificationPayload {
            title: title.to_string(),
            body: body.to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            tag: self.tag(),
            require_interaction,
            actions,
            data: NotificationData {
                category: Some(*self),
                ..NotificationData::default()
            },
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "message" => Ok(Category::Message),
            "task" => Ok(Category::Task),
            "general" => Ok(Category::General),
            "update" => Ok(Category::Update),
            other => Err(format!("unknown notification category {other:?}")),
        }
    }
}

// ── Payload ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

impl NotificationAction {
    pub fn new(action: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            title: title.into(),
        }
    }
}

/// Routing metadata attached to a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    /// Deep link opened on click.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Caller-defined fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A notification as handed to a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
    #[serde(default)]
    pub data: NotificationData,
}

/// Caller-supplied fields. Anything left `None` takes the category default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub require_interaction: Option<bool>,
    pub actions: Option<Vec<NotificationAction>>,
    pub url: Option<String>,
    pub extra: Map<String, Value>,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Merge `request` over the defaults of `category`.
///
/// The tag and `data.category` always come from the category; callers can
/// not override them.
pub fn build_payload(category: Category, request: NotificationRequest) -> NotificationPayload {
    let mut payload = category.defaults();
    if let Some(title) = request.title {
        payload.title = title;
    }
    if let Some(body) = request.body {
        payload.body = body;
    }
    if let Some(icon) = request.icon {
        payload.icon = icon;
    }
    if let Some(badge) = request.badge {
        payload.badge = badge;
    }
    if let Some(require_interaction) = request.require_interaction {
        payload.require_interaction = require_interaction;
    }
    if let Some(actions) = request.actions {
        payload.actions = actions;
    }
    payload.data = NotificationData {
        url: request.url,
        category: Some(category),
        extra: request.extra,
    };
    payload
}
