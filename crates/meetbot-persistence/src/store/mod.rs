//! The calendar store: the single gateway to the relational database.
//!
//! All methods are synchronous and may block on SQLite I/O. Async callers
//! run them on the blocking pool (`tokio::task::spawn_blocking`). Every
//! logical operation that writes more than one row runs in a single
//! transaction, so a concurrent reader never sees a half-applied change.
//!
//! ```text
//! users ─┬─< calendar_events
//!        ├─< meetings ─┬─< meeting_participants >─ users
//!        │             └─< meeting_notifications >─ users
//!        └─< event_change_log
//! ```

mod events;
mod meetings;
mod notifications;
mod rows;
mod users;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::db::{open_db, open_db_in_memory};
use crate::error::{PersistenceError, Result};

pub use events::{ChangeLogEntry, VisibilityOutcome};
pub use meetings::RecordedResponse;

/// SQLite-backed store for users, events, meetings and notifications.
pub struct CalendarStore {
    conn: Mutex<Connection>,
}

impl CalendarStore {
    /// Open the database file at `path`, creating and migrating it as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_db(path)?),
        })
    }

    /// Open a fresh in-memory database (tests and throwaway runs).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_db_in_memory()?),
        })
    }

    /// Run `f` with exclusive access to the connection.
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| PersistenceError::LockPoisoned(e.to_string()))?;
        f(&mut conn)
    }
}
