use chrono::{DateTime, Utc};
use meetbot_models::{User, UserId, UserProfile};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::rows::{user_from_row, USER_COLUMNS};
use super::CalendarStore;
use crate::error::Result;

impl CalendarStore {
    /// Register a user on first contact, or refresh their profile and
    /// last-seen timestamp on every later one.
    pub fn upsert_user(&self, profile: &UserProfile, now: DateTime<Utc>) -> Result<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users \
                     (id, username, first_name, last_name, language_code, registered_at, last_seen) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
                 ON CONFLICT(id) DO UPDATE SET \
                     username = excluded.username, \
                     first_name = excluded.first_name, \
                     last_name = excluded.last_name, \
                     language_code = excluded.language_code, \
                     last_seen = excluded.last_seen",
                params![
                    profile.id.get(),
                    profile.username,
                    profile.first_name,
                    profile.last_name,
                    profile.language_code,
                    now,
                ],
            )?;
            let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
            let user = conn.query_row(&sql, params![profile.id.get()], |row| user_from_row(row, 0))?;
            debug!(user_id = %user.id, "User upserted");
            Ok(user)
        })
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
            let user = conn
                .query_row(&sql, params![id.get()], |row| user_from_row(row, 0))
                .optional()?;
            Ok(user)
        })
    }

    /// Number of registered users.
    pub fn count_users(&self) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}
