//! Meeting notifications surfaced to users.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::{MeetingId, NotificationId, UserId};

/// Why a notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Invitation,
    Confirmation,
    Cancellation,
    Reminder,
    Update,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Invitation => "invitation",
            NotificationKind::Confirmation => "confirmation",
            NotificationKind::Cancellation => "cancellation",
            NotificationKind::Reminder => "reminder",
            NotificationKind::Update => "update",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invitation" => Ok(NotificationKind::Invitation),
            "confirmation" => Ok(NotificationKind::Confirmation),
            "cancellation" => Ok(NotificationKind::Cancellation),
            "reminder" => Ok(NotificationKind::Reminder),
            "update" => Ok(NotificationKind::Update),
            other => Err(ModelError::UnknownVariant {
                kind: "notification kind",
                value: other.to_string(),
            }),
        }
    }
}

/// An append-only notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user: UserId,
    pub meeting: MeetingId,
    pub kind: NotificationKind,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    /// Set once by the first mark-read; never cleared.
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// The most recent notifications of a user plus the unread total.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationFeed {
    pub items: Vec<Notification>,
    pub unread: u32,
}
