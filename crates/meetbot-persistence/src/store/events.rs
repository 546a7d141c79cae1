//! Calendar event records, always scoped to their owner.
//!
//! Every mutation appends an `event_change_log` row in the same
//! transaction, carrying JSON snapshots of the event before and after.

use chrono::{DateTime, NaiveDate, Utc};
use meetbot_models::{
    CalendarEvent, ChangeAction, EventId, EventPatch, EventStats, NewEvent, ShareStats, User,
    UserId, Visibility,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::rows::{event_from_row, user_from_row, EVENT_COLUMNS, EVENT_WIDTH, USER_COLUMNS};
use super::CalendarStore;
use crate::error::{PersistenceError, Result};

/// Result of a publish or unpublish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityOutcome {
    /// The event switched visibility.
    Changed(CalendarEvent),
    /// The event already had the requested visibility; nothing was written.
    AlreadySet(CalendarEvent),
    /// No such event owned by the caller.
    NotFound,
}

/// One row of the event audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogEntry {
    pub user: UserId,
    pub event: EventId,
    pub action: ChangeAction,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
    pub changed_at: DateTime<Utc>,
}

fn load_event(conn: &Connection, owner: UserId, id: EventId) -> Result<Option<CalendarEvent>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM calendar_events e WHERE e.id = ?1 AND e.owner_id = ?2");
    let event = conn
        .query_row(&sql, params![id.get(), owner.get()], |row| event_from_row(row, 0))
        .optional()?;
    Ok(event)
}

fn query_events(conn: &Connection, filter: &str, args: impl rusqlite::Params) -> Result<Vec<CalendarEvent>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM calendar_events e WHERE {filter} ORDER BY e.date, e.id");
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(args, |row| event_from_row(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

fn log_change(
    conn: &Connection,
    event: &CalendarEvent,
    action: ChangeAction,
    old: Option<&CalendarEvent>,
    new: Option<&CalendarEvent>,
    now: DateTime<Utc>,
) -> Result<()> {
    let old_data = old.map(serde_json::to_string).transpose()?;
    let new_data = new.map(serde_json::to_string).transpose()?;
    conn.execute(
        "INSERT INTO event_change_log (user_id, event_id, action, old_data, new_data, changed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![event.owner.get(), event.id.get(), action.as_str(), old_data, new_data, now],
    )?;
    Ok(())
}

impl CalendarStore {
    pub fn insert_event(&self, owner: UserId, new: &NewEvent, now: DateTime<Utc>) -> Result<CalendarEvent> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO calendar_events (owner_id, date, title, description, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![owner.get(), new.date, new.title, new.description, now],
            )?;
            let id = EventId(tx.last_insert_rowid());
            let event = load_event(&tx, owner, id)?
                .ok_or_else(|| PersistenceError::not_found("event", id))?;
            log_change(&tx, &event, ChangeAction::Created, None, Some(&event), now)?;
            tx.commit()?;

            info!(user_id = %owner, event_id = %id, "Calendar event created");
            Ok(event)
        })
    }

    /// Fetch one of `owner`'s events.
    pub fn get_event(&self, owner: UserId, id: EventId) -> Result<Option<CalendarEvent>> {
        self.with_conn(|conn| load_event(conn, owner, id))
    }

    /// Apply `patch`; returns `None` when the event is not `owner`'s.
    pub fn update_event(
        &self,
        owner: UserId,
        id: EventId,
        patch: &EventPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<CalendarEvent>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let Some(current) = load_event(&tx, owner, id)? else {
                return Ok(None);
            };

            let title = patch.title.clone().unwrap_or_else(|| current.title.clone());
            let description = patch.description.clone().or_else(|| current.description.clone());
            tx.execute(
                "UPDATE calendar_events SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![title, description, now, id.get()],
            )?;

            let updated = load_event(&tx, owner, id)?
                .ok_or_else(|| PersistenceError::not_found("event", id))?;
            log_change(&tx, &updated, ChangeAction::Updated, Some(&current), Some(&updated), now)?;
            tx.commit()?;

            debug!(user_id = %owner, event_id = %id, "Calendar event updated");
            Ok(Some(updated))
        })
    }

    /// Delete one of `owner`'s events, returning what was removed.
    pub fn delete_event(&self, owner: UserId, id: EventId, now: DateTime<Utc>) -> Result<Option<CalendarEvent>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let Some(current) = load_event(&tx, owner, id)? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM calendar_events WHERE id = ?1", params![id.get()])?;
            log_change(&tx, &current, ChangeAction::Deleted, Some(&current), None, now)?;
            tx.commit()?;

            info!(user_id = %owner, event_id = %id, "Calendar event deleted");
            Ok(Some(current))
        })
    }

    /// All of `owner`'s events, oldest date first.
    pub fn list_events(&self, owner: UserId) -> Result<Vec<CalendarEvent>> {
        self.with_conn(|conn| query_events(conn, "e.owner_id = ?1", params![owner.get()]))
    }

    pub fn events_on(&self, owner: UserId, date: NaiveDate) -> Result<Vec<CalendarEvent>> {
        self.with_conn(|conn| {
            query_events(conn, "e.owner_id = ?1 AND e.date = ?2", params![owner.get(), date])
        })
    }

    /// `owner`'s events with the given visibility.
    pub fn events_with_visibility(&self, owner: UserId, visibility: Visibility) -> Result<Vec<CalendarEvent>> {
        let is_public = visibility == Visibility::Public;
        self.with_conn(|conn| {
            query_events(conn, "e.owner_id = ?1 AND e.is_public = ?2", params![owner.get(), is_public])
        })
    }

    /// Public events owned by `owner`.
    pub fn public_events_of(&self, owner: UserId) -> Result<Vec<CalendarEvent>> {
        self.events_with_visibility(owner, Visibility::Public)
    }

    /// Public events of everyone except `viewer`, with their owners.
    pub fn public_events_excluding(&self, viewer: UserId) -> Result<Vec<(CalendarEvent, User)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {EVENT_COLUMNS}, {USER_COLUMNS} \
                 FROM calendar_events e JOIN users u ON u.id = e.owner_id \
                 WHERE e.is_public = 1 AND e.owner_id != ?1 \
                 ORDER BY e.date, e.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![viewer.get()], |row| {
                    Ok((event_from_row(row, 0)?, user_from_row(row, EVENT_WIDTH)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Make an event public or private.
    ///
    /// Publishing stamps `published_at`; unpublishing leaves it in place.
    pub fn set_visibility(
        &self,
        owner: UserId,
        id: EventId,
        target: Visibility,
        now: DateTime<Utc>,
    ) -> Result<VisibilityOutcome> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let Some(current) = load_event(&tx, owner, id)? else {
                return Ok(VisibilityOutcome::NotFound);
            };
            if current.visibility == target {
                return Ok(VisibilityOutcome::AlreadySet(current));
            }

            let action = match target {
                Visibility::Public => {
                    tx.execute(
                        "UPDATE calendar_events SET is_public = 1, published_at = ?1, updated_at = ?1 WHERE id = ?2",
                        params![now, id.get()],
                    )?;
                    ChangeAction::Published
                }
                Visibility::Private => {
                    tx.execute(
                        "UPDATE calendar_events SET is_public = 0, updated_at = ?1 WHERE id = ?2",
                        params![now, id.get()],
                    )?;
                    ChangeAction::Unpublished
                }
            };

            let updated = load_event(&tx, owner, id)?
                .ok_or_else(|| PersistenceError::not_found("event", id))?;
            log_change(&tx, &updated, action, Some(&current), Some(&updated), now)?;
            tx.commit()?;

            info!(user_id = %owner, event_id = %id, action = action.as_str(), "Event visibility changed");
            Ok(VisibilityOutcome::Changed(updated))
        })
    }

    pub fn count_events(&self, owner: UserId) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM calendar_events WHERE owner_id = ?1",
                params![owner.get()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Event counters relative to `today`, plus the closest upcoming event.
    pub fn event_stats(&self, owner: UserId, today: NaiveDate) -> Result<EventStats> {
        self.with_conn(|conn| {
            let (total, today_count, future, past) = conn.query_row(
                "SELECT COUNT(*), \
                        COALESCE(SUM(date = ?2), 0), \
                        COALESCE(SUM(date > ?2), 0), \
                        COALESCE(SUM(date < ?2), 0) \
                 FROM calendar_events WHERE owner_id = ?1",
                params![owner.get(), today],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM calendar_events e \
                 WHERE e.owner_id = ?1 AND e.date >= ?2 ORDER BY e.date, e.id LIMIT 1"
            );
            let closest = conn
                .query_row(&sql, params![owner.get(), today], |row| event_from_row(row, 0))
                .optional()?;

            Ok(EventStats {
                total,
                today: today_count,
                future,
                past,
                closest,
            })
        })
    }

    /// Publication counters; `since` bounds the "recently published" window.
    pub fn share_stats(&self, owner: UserId, since: DateTime<Utc>) -> Result<ShareStats> {
        self.with_conn(|conn| {
            let (public, private, recently_published) = conn.query_row(
                "SELECT COALESCE(SUM(is_public = 1), 0), \
                        COALESCE(SUM(is_public = 0), 0), \
                        COALESCE(SUM(is_public = 1 AND published_at >= ?2), 0) \
                 FROM calendar_events WHERE owner_id = ?1",
                params![owner.get(), since],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            let others_public = conn.query_row(
                "SELECT COUNT(*) FROM calendar_events WHERE is_public = 1 AND owner_id != ?1",
                params![owner.get()],
                |row| row.get(0),
            )?;

            Ok(ShareStats {
                public,
                private,
                recently_published,
                others_public,
            })
        })
    }

    /// Audit trail of one event, oldest first.
    pub fn change_log(&self, event: EventId) -> Result<Vec<ChangeLogEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, event_id, action, old_data, new_data, changed_at \
                 FROM event_change_log WHERE event_id = ?1 ORDER BY id",
            )?;
            let raw = stmt
                .query_map(params![event.get()], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, DateTime<Utc>>(5)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            raw.into_iter()
                .map(|(user, event, action, old, new, changed_at)| {
                    Ok(ChangeLogEntry {
                        user: UserId(user),
                        event: EventId(event),
                        action: action
                            .parse()
                            .map_err(|e: meetbot_models::ModelError| PersistenceError::InvalidData(e.to_string()))?,
                        old_data: old.as_deref().map(serde_json::from_str).transpose()?,
                        new_data: new.as_deref().map(serde_json::from_str).transpose()?,
                        changed_at,
                    })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use meetbot_models::{ChangeAction, EventPatch, Visibility};

    use super::VisibilityOutcome;
    use crate::store::test_support::{date, new_event, now, register, store};

    #[test]
    fn test_events_are_scoped_to_owner() {
        let store = store();
        let ann = register(&store, 1);
        let bob = register(&store, 2);
        let event = store.insert_event(ann, &new_event(25, "Dentist"), now()).unwrap();

        assert!(store.get_event(bob, event.id).unwrap().is_none());
        assert!(store.delete_event(bob, event.id, now()).unwrap().is_none());
        assert!(store.update_event(bob, event.id, &EventPatch::default(), now()).unwrap().is_none());
        assert_eq!(store.get_event(ann, event.id).unwrap(), Some(event));
    }

    #[test]
    fn test_update_keeps_unpatched_fields() {
        let store = store();
        let ann = register(&store, 1);
        let mut new = new_event(25, "Dentist");
        new.description = Some("Bring card".into());
        let event = store.insert_event(ann, &new, now()).unwrap();

        let patch = EventPatch {
            title: Some("Orthodontist".into()),
            description: None,
        };
        let later = now() + Duration::minutes(5);
        let updated = store.update_event(ann, event.id, &patch, later).unwrap().unwrap();

        assert_eq!(updated.title, "Orthodontist");
        assert_eq!(updated.description.as_deref(), Some("Bring card"));
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.created_at, event.created_at);
    }

    #[test]
    fn test_publish_unpublish_retains_timestamp() {
        let store = store();
        let ann = register(&store, 1);
        let event = store.insert_event(ann, &new_event(25, "Party"), now()).unwrap();
        assert!(event.published_at.is_none());

        let published_at = now() + Duration::hours(1);
        let VisibilityOutcome::Changed(public) =
            store.set_visibility(ann, event.id, Visibility::Public, published_at).unwrap()
        else {
            panic!("expected publish to change visibility");
        };
        assert!(public.is_public());
        assert_eq!(public.published_at, Some(published_at));

        let later = now() + Duration::hours(2);
        let VisibilityOutcome::Changed(private) =
            store.set_visibility(ann, event.id, Visibility::Private, later).unwrap()
        else {
            panic!("expected unpublish to change visibility");
        };
        assert!(!private.is_public());
        assert_eq!(private.published_at, Some(published_at));
    }

    #[test]
    fn test_repeated_visibility_is_reported() {
        let store = store();
        let ann = register(&store, 1);
        let event = store.insert_event(ann, &new_event(25, "Party"), now()).unwrap();

        assert!(matches!(
            store.set_visibility(ann, event.id, Visibility::Private, now()).unwrap(),
            VisibilityOutcome::AlreadySet(_)
        ));
        store.set_visibility(ann, event.id, Visibility::Public, now()).unwrap();
        assert!(matches!(
            store.set_visibility(ann, event.id, Visibility::Public, now()).unwrap(),
            VisibilityOutcome::AlreadySet(_)
        ));
        assert_eq!(
            store.set_visibility(register(&store, 2), event.id, Visibility::Public, now()).unwrap(),
            VisibilityOutcome::NotFound
        );
    }

    #[test]
    fn test_change_log_survives_delete() {
        let store = store();
        let ann = register(&store, 1);
        let event = store.insert_event(ann, &new_event(25, "Party"), now()).unwrap();
        store.set_visibility(ann, event.id, Visibility::Public, now()).unwrap();
        store.delete_event(ann, event.id, now()).unwrap();

        let log = store.change_log(event.id).unwrap();
        let actions: Vec<_> = log.iter().map(|entry| entry.action).collect();
        assert_eq!(
            actions,
            vec![ChangeAction::Created, ChangeAction::Published, ChangeAction::Deleted]
        );
        assert!(log[2].new_data.is_none());
        assert_eq!(log[2].old_data.as_ref().unwrap()["title"], "Party");
    }

    #[test]
    fn test_public_feed_excludes_viewer() {
        let store = store();
        let ann = register(&store, 1);
        let bob = register(&store, 2);
        let mine = store.insert_event(ann, &new_event(24, "Mine"), now()).unwrap();
        let theirs = store.insert_event(bob, &new_event(26, "Theirs"), now()).unwrap();
        store.insert_event(bob, &new_event(27, "Hidden"), now()).unwrap();
        store.set_visibility(ann, mine.id, Visibility::Public, now()).unwrap();
        store.set_visibility(bob, theirs.id, Visibility::Public, now()).unwrap();

        let feed = store.public_events_excluding(ann).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].0.id, theirs.id);
        assert_eq!(feed[0].1.id, bob);
        assert_eq!(store.public_events_of(bob).unwrap().len(), 1);
    }

    #[test]
    fn test_event_stats() {
        let store = store();
        let ann = register(&store, 1);
        for (day, title) in [(10, "Past"), (20, "Today"), (22, "Soon"), (30, "Later")] {
            store.insert_event(ann, &new_event(day, title), now()).unwrap();
        }

        let stats = store.event_stats(ann, date(20)).unwrap();
        assert_eq!((stats.total, stats.today, stats.future, stats.past), (4, 1, 2, 1));
        assert_eq!(stats.closest.unwrap().title, "Today");
        assert_eq!(store.events_on(ann, date(22)).unwrap().len(), 1);
    }

    #[test]
    fn test_share_stats_window() {
        let store = store();
        let ann = register(&store, 1);
        let old = store.insert_event(ann, &new_event(10, "Old"), now()).unwrap();
        let fresh = store.insert_event(ann, &new_event(11, "Fresh"), now()).unwrap();
        store.insert_event(ann, &new_event(12, "Private"), now()).unwrap();
        store.set_visibility(ann, old.id, Visibility::Public, now() - Duration::days(30)).unwrap();
        store.set_visibility(ann, fresh.id, Visibility::Public, now()).unwrap();

        let stats = store.share_stats(ann, now() - Duration::days(7)).unwrap();
        assert_eq!((stats.public, stats.private, stats.recently_published), (2, 1, 1));
        assert_eq!(stats.others_public, 0);
    }
}
