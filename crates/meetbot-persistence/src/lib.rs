//! Persistence gateway for the meeting calendar bot.
//!
//! This crate is the only code that talks to the relational store. It
//! wraps a SQLite database (bundled through `rusqlite`) and exposes
//! record-level operations, each of them atomic.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use meetbot_models::UserProfile;
//! use meetbot_persistence::CalendarStore;
//!
//! let store = CalendarStore::open("/home/user/.meetbot/db/meetbot.sqlite3").unwrap();
//! let user = store.upsert_user(&UserProfile::bare(123456789), Utc::now()).unwrap();
//! let events = store.list_events(user.id).unwrap();
//! ```

pub mod db;
pub mod error;
pub mod store;

pub use error::{PersistenceError, Result};
pub use store::{CalendarStore, ChangeLogEntry, RecordedResponse, VisibilityOutcome};
