//! Row mapping between SQLite and the model types.

use std::str::FromStr;

use meetbot_models::{
    CalendarEvent, EventId, Meeting, MeetingId, ModelError, Notification, NotificationId,
    Participant, TimeWindow, User, UserId, Visibility,
};
use rusqlite::types::Type;
use rusqlite::Row;

pub(crate) const USER_COLUMNS: &str =
    "u.id, u.username, u.first_name, u.last_name, u.language_code, u.registered_at, u.last_seen";

pub(crate) const EVENT_COLUMNS: &str = "e.id, e.owner_id, e.date, e.title, e.description, \
     e.is_public, e.published_at, e.created_at, e.updated_at";

pub(crate) const MEETING_COLUMNS: &str = "m.id, m.organizer_id, m.title, m.description, m.date, \
     m.start_time, m.end_time, m.status, m.created_at, m.updated_at";

pub(crate) const PARTICIPANT_COLUMNS: &str =
    "p.meeting_id, p.user_id, p.status, p.invited_at, p.responded_at";

pub(crate) const NOTIFICATION_COLUMNS: &str =
    "n.id, n.user_id, n.meeting_id, n.kind, n.message, n.sent_at, n.read_at";

/// Number of columns each mapper consumes, for mapping joined rows.
pub(crate) const EVENT_WIDTH: usize = 9;
pub(crate) const MEETING_WIDTH: usize = 10;

fn conversion_error(idx: usize, err: ModelError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read a text column and parse it into a model enum.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ModelError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(offset)?),
        username: row.get(offset + 1)?,
        first_name: row.get(offset + 2)?,
        last_name: row.get(offset + 3)?,
        language_code: row.get(offset + 4)?,
        registered_at: row.get(offset + 5)?,
        last_seen: row.get(offset + 6)?,
    })
}

pub(crate) fn event_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<CalendarEvent> {
    let is_public: bool = row.get(offset + 5)?;
    Ok(CalendarEvent {
        id: EventId(row.get(offset)?),
        owner: UserId(row.get(offset + 1)?),
        date: row.get(offset + 2)?,
        title: row.get(offset + 3)?,
        description: row.get(offset + 4)?,
        visibility: if is_public {
            Visibility::Public
        } else {
            Visibility::Private
        },
        published_at: row.get(offset + 6)?,
        created_at: row.get(offset + 7)?,
        updated_at: row.get(offset + 8)?,
    })
}

pub(crate) fn meeting_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Meeting> {
    let window = TimeWindow::new(row.get(offset + 5)?, row.get(offset + 6)?)
        .map_err(|e| conversion_error(offset + 6, e))?;
    Ok(Meeting {
        id: MeetingId(row.get(offset)?),
        organizer: UserId(row.get(offset + 1)?),
        title: row.get(offset + 2)?,
        description: row.get(offset + 3)?,
        date: row.get(offset + 4)?,
        window,
        status: parse_column(row, offset + 7)?,
        created_at: row.get(offset + 8)?,
        updated_at: row.get(offset + 9)?,
    })
}

pub(crate) fn participant_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Participant> {
    Ok(Participant {
        meeting: MeetingId(row.get(offset)?),
        user: UserId(row.get(offset + 1)?),
        status: parse_column(row, offset + 2)?,
        invited_at: row.get(offset + 3)?,
        responded_at: row.get(offset + 4)?,
    })
}

pub(crate) fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: NotificationId(row.get(0)?),
        user: UserId(row.get(1)?),
        meeting: MeetingId(row.get(2)?),
        kind: parse_column(row, 3)?,
        message: row.get(4)?,
        sent_at: row.get(5)?,
        read_at: row.get(6)?,
    })
}
