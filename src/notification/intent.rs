//! Notification kinds and styling
//!
//! The classifier turns an accepted event into a `NotificationIntent`. The kind
//! decides the message shape and the default attachment color:
//! - Created / Updated / StatusReopened / StatusChanged: full attachment
//! - StatusClosed: compact attachment (no template rendering)

use serde::Serialize;

/// Color for newly created tickets
pub const COLOR_NEW: &str = "good";
/// Color for thread updates and plain status changes
pub const COLOR_WARNING: &str = "warning";
/// Neutral color used for closed tickets
pub const COLOR_CLOSED: &str = "#439FE0";
/// Color for reopened tickets
pub const COLOR_REOPENED: &str = "good";
/// Accent that replaces any color while the ticket is overdue
pub const COLOR_OVERDUE: &str = "#ff00ff";

/// Attachment layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageShape {
    Full,
    Compact,
}

/// What happened to the ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Updated,
    StatusClosed,
    StatusReopened,
    StatusChanged,
}

impl NotificationKind {
    pub fn shape(&self) -> MessageShape {
        match self {
            NotificationKind::StatusClosed => MessageShape::Compact,
            _ => MessageShape::Full,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            NotificationKind::Created => COLOR_NEW,
            NotificationKind::Updated => COLOR_WARNING,
            NotificationKind::StatusClosed => COLOR_CLOSED,
            NotificationKind::StatusReopened => COLOR_REOPENED,
            NotificationKind::StatusChanged => COLOR_WARNING,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Created => "created",
            NotificationKind::Updated => "updated",
            NotificationKind::StatusClosed => "status_closed",
            NotificationKind::StatusReopened => "status_reopened",
            NotificationKind::StatusChanged => "status_changed",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifier output for one accepted event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationIntent {
    pub ticket_id: u64,
    pub event_key: String,
    pub kind: NotificationKind,
    /// Heading with reserved link markers, not yet formatted
    pub heading: String,
    /// Raw event body (message text or subject)
    pub body: String,
    /// Resulting status name, for status kinds
    pub status_name: Option<String>,
    pub color: &'static str,
    pub shape: MessageShape,
}
