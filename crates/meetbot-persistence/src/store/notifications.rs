use chrono::{DateTime, Utc};
use meetbot_models::{
    MeetingId, Notification, NotificationFeed, NotificationId, NotificationKind, UserId,
};
use rusqlite::{params, Connection, OptionalExtension};

use super::rows::{notification_from_row, NOTIFICATION_COLUMNS};
use super::CalendarStore;
use crate::error::{PersistenceError, Result};

fn load_notification(conn: &Connection, user: UserId, id: NotificationId) -> Result<Option<Notification>> {
    let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM meeting_notifications n WHERE n.id = ?1 AND n.user_id = ?2");
    let notification = conn
        .query_row(&sql, params![id.get(), user.get()], notification_from_row)
        .optional()?;
    Ok(notification)
}

impl CalendarStore {
    /// Append a notification row. Rows are never updated except for the
    /// one-time read stamp.
    pub fn append_notification(
        &self,
        user: UserId,
        meeting: MeetingId,
        kind: NotificationKind,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO meeting_notifications (user_id, meeting_id, kind, message, sent_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user.get(), meeting.get(), kind.as_str(), message, now],
            )?;
            let id = NotificationId(conn.last_insert_rowid());
            load_notification(conn, user, id)?.ok_or_else(|| PersistenceError::not_found("notification", id))
        })
    }

    /// The `limit` newest notifications of `user` and their unread total.
    pub fn recent_notifications(&self, user: UserId, limit: u32) -> Result<NotificationFeed> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM meeting_notifications n \
                 WHERE n.user_id = ?1 ORDER BY n.sent_at DESC, n.id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params![user.get(), limit], notification_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let unread = conn.query_row(
                "SELECT COUNT(*) FROM meeting_notifications WHERE user_id = ?1 AND read_at IS NULL",
                params![user.get()],
                |row| row.get(0),
            )?;
            Ok(NotificationFeed { items, unread })
        })
    }

    /// Stamp a notification as read the first time; later calls keep the
    /// original stamp. Returns `None` if `user` does not own it.
    pub fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE meeting_notifications SET read_at = ?1 \
                 WHERE id = ?2 AND user_id = ?3 AND read_at IS NULL",
                params![now, id.get(), user.get()],
            )?;
            load_notification(conn, user, id)
        })
    }
}
