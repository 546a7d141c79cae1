//! Per-user conversation sessions.
//!
//! Sessions live in a sharded map keyed by user id. Each entry carries its
//! own async mutex, so one user's messages are handled one at a time while
//! different users never wait on each other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use meetbot_models::UserId;
use tokio::sync::Mutex;
use tracing::debug;

use crate::dialog::{Dialog, DialogKind};

/// A user's dialog state.
#[derive(Debug)]
pub struct ConversationSession {
    pub dialog: Dialog,
    last_activity: Instant,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self {
            dialog: Dialog::Idle,
            last_activity: Instant::now(),
        }
    }
}

impl ConversationSession {
    /// Record that the user just sent something.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Drop any dialog in progress.
    pub fn reset(&mut self) {
        self.dialog = Dialog::Idle;
    }
}

/// All sessions of the running bot.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<UserId, Arc<Mutex<ConversationSession>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session of `user`, created idle on first use.
    ///
    /// Lock the returned mutex for the whole handling of one message.
    pub fn session(&self, user: UserId) -> Arc<Mutex<ConversationSession>> {
        Arc::clone(self.sessions.entry(user).or_default().value())
    }

    /// Current dialog kind of `user`; waits if the user is being served.
    pub async fn kind(&self, user: UserId) -> DialogKind {
        let Some(session) = self.sessions.get(&user).map(|s| Arc::clone(s.value())) else {
            return DialogKind::Idle;
        };
        let guard = session.lock().await;
        guard.dialog.kind()
    }

    /// Drop sessions untouched for longer than `max_idle`.
    ///
    /// Sessions currently locked by a handler are kept. Returns how many
    /// were dropped.
    pub fn reap_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|user, session| match session.try_lock() {
            Ok(guard) => {
                let keep = guard.idle_for() <= max_idle;
                if !keep && guard.dialog.is_active() {
                    debug!(user_id = %user, dialog = ?guard.dialog.kind(), "Dropping idle dialog");
                }
                keep
            }
            Err(_) => true,
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
