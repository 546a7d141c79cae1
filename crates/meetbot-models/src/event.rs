//! Personal calendar events.
//!
//! An event has a date but no time of day, so for availability purposes it
//! occupies the whole day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::{EventId, UserId};

/// Who can see an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only the owner.
    #[default]
    Private,
    /// Listed in other users' shared feeds.
    Public,
}

/// A calendar entry owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub owner: UserId,
    pub date: NaiveDate,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    /// Stamped on every private to public transition, kept after unpublishing.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Fields collected for a new event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub date: NaiveDate,
    pub title: String,
    pub description: Option<String>,
}

/// Partial update of an event; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Counters shown by `/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventStats {
    pub total: u32,
    pub today: u32,
    pub future: u32,
    pub past: u32,
    /// Nearest event dated today or later.
    pub closest: Option<CalendarEvent>,
}

/// Counters shown by `/share_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShareStats {
    pub public: u32,
    pub private: u32,
    /// Own events published in the last seven days.
    pub recently_published: u32,
    /// Public events owned by everyone else.
    pub others_public: u32,
}

/// Kind of mutation recorded in the event change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Published,
    Unpublished,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Created => "created",
            ChangeAction::Updated => "updated",
            ChangeAction::Deleted => "deleted",
            ChangeAction::Published => "published",
            ChangeAction::Unpublished => "unpublished",
        }
    }
}

impl std::str::FromStr for ChangeAction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ChangeAction::Created),
            "updated" => Ok(ChangeAction::Updated),
            "deleted" => Ok(ChangeAction::Deleted),
            "published" => Ok(ChangeAction::Published),
            "unpublished" => Ok(ChangeAction::Unpublished),
            other => Err(ModelError::UnknownVariant {
                kind: "change action",
                value: other.to_string(),
            }),
        }
    }
}
