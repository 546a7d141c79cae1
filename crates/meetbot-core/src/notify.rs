//! Notification dispatcher.
//!
//! A notice is first written as a `meeting_notifications` row, which is the
//! durable record that the user was told. Delivery through the messenger
//! then runs in the background: it never delays the caller and a failure
//! is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use meetbot_models::{MeetingId, Notification, NotificationFeed, NotificationId, NotificationKind, UserId};
use meetbot_persistence::CalendarStore;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::blocking::run_blocking;
use crate::error::Result;

/// How many notifications a feed shows.
pub const FEED_LIMIT: u32 = 20;

/// Outbound delivery failed.
#[derive(Debug, Error)]
#[error("failed to deliver message to {user}: {reason}")]
pub struct DeliveryError {
    pub user: UserId,
    pub reason: String,
}

/// Sends plain text to a user over the chat transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, user: UserId, text: &str) -> std::result::Result<(), DeliveryError>;
}

/// A state change one user should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub user: UserId,
    pub meeting: MeetingId,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notice {
    pub fn new(user: UserId, meeting: MeetingId, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            user,
            meeting,
            kind,
            message: message.into(),
        }
    }
}

/// What a dispatch did.
#[derive(Debug, Default)]
pub struct Dispatched {
    /// Rows written, in notice order.
    pub recorded: Vec<Notification>,
    /// Background deliveries; each resolves to whether the send succeeded.
    pub deliveries: Vec<JoinHandle<bool>>,
}

impl Dispatched {
    /// Wait for every delivery and count the successful ones.
    pub async fn delivered(self) -> usize {
        let mut ok = 0;
        for handle in self.deliveries {
            if matches!(handle.await, Ok(true)) {
                ok += 1;
            }
        }
        ok
    }
}

/// Records notices and fans them out to the messenger.
pub struct NotificationDispatcher {
    store: Arc<CalendarStore>,
    messenger: Arc<dyn Messenger>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<CalendarStore>, messenger: Arc<dyn Messenger>) -> Self {
        Self { store, messenger }
    }

    /// Record and deliver every notice. Never fails: problems are logged.
    ///
    /// Must only be called after the state change the notices describe has
    /// been committed.
    pub async fn dispatch(&self, notices: Vec<Notice>) -> Dispatched {
        let mut dispatched = Dispatched::default();
        for notice in notices {
            let (recorded, delivery) = self.notify(notice).await;
            dispatched.recorded.extend(recorded);
            dispatched.deliveries.push(delivery);
        }
        dispatched
    }

    /// Write one notification row, then start delivering it.
    pub async fn notify(&self, notice: Notice) -> (Option<Notification>, JoinHandle<bool>) {
        let store = Arc::clone(&self.store);
        let Notice {
            user,
            meeting,
            kind,
            message,
        } = notice;

        let text = message.clone();
        let recorded = match run_blocking(move || {
            store.append_notification(user, meeting, kind, &message, Utc::now())
        })
        .await
        {
            Ok(notification) => Some(notification),
            Err(e) => {
                warn!(user_id = %user, meeting_id = %meeting, kind = kind.as_str(), error = %e, "Failed to record notification");
                None
            }
        };

        let messenger = Arc::clone(&self.messenger);
        let delivery = tokio::spawn(async move {
            match messenger.send(user, &text).await {
                Ok(()) => {
                    debug!(user_id = %user, meeting_id = %meeting, kind = kind.as_str(), "Notification delivered");
                    true
                }
                Err(e) => {
                    warn!(user_id = %user, meeting_id = %meeting, error = %e, "Failed to deliver notification");
                    false
                }
            }
        });

        (recorded, delivery)
    }

    /// The newest notifications of `user`.
    pub async fn feed(&self, user: UserId) -> Result<NotificationFeed> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.recent_notifications(user, FEED_LIMIT)).await
    }

    /// Mark a notification read. A second call keeps the first timestamp.
    /// Returns `None` when `user` has no such notification.
    pub async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<Option<Notification>> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.mark_notification_read(user, id, Utc::now())).await
    }
}
