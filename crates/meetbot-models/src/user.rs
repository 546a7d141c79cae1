//! Registered chat users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Identity details the chat platform reports with every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Platform-assigned user id.
    pub id: UserId,
    /// Public handle without the leading `@`.
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// IETF language tag reported by the client.
    pub language_code: Option<String>,
}

impl UserProfile {
    /// Profile with only an id, as used by tests and id-only lookups.
    pub fn bare(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            username: None,
            first_name: None,
            last_name: None,
            language_code: None,
        }
    }

    /// Set the first name.
    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// A user row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    /// First interaction.
    pub registered_at: DateTime<Utc>,
    /// Most recent interaction.
    pub last_seen: DateTime<Utc>,
}

impl User {
    /// Human-friendly name: first name, then `@username`, then `User<id>`.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) if !first.is_empty() => format!("{} {}", first, last),
            (Some(first), _, _) if !first.is_empty() => first.clone(),
            (_, _, Some(username)) if !username.is_empty() => format!("@{}", username),
            _ => format!("User{}", self.id),
        }
    }
}
