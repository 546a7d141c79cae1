//! Meetings and their participant rows.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use meetbot_models::{
    DayCommitments, Meeting, MeetingId, MeetingPlan, MeetingRole, MeetingStatus, Participant,
    ParticipantStatus, User, UserId,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::rows::{
    event_from_row, meeting_from_row, participant_from_row, user_from_row, EVENT_COLUMNS,
    MEETING_COLUMNS, MEETING_WIDTH, PARTICIPANT_COLUMNS, USER_COLUMNS,
};
use super::CalendarStore;
use crate::error::{PersistenceError, Result};

/// A participant response written together with the recomputed status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    /// The meeting after the recompute.
    pub meeting: Meeting,
    /// Meeting status before this response.
    pub previous_status: MeetingStatus,
}

fn load_meeting(conn: &Connection, id: MeetingId) -> Result<Option<Meeting>> {
    let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings m WHERE m.id = ?1");
    let meeting = conn
        .query_row(&sql, params![id.get()], |row| meeting_from_row(row, 0))
        .optional()?;
    Ok(meeting)
}

fn participant_statuses(conn: &Connection, meeting: MeetingId) -> Result<Vec<ParticipantStatus>> {
    let mut stmt = conn.prepare("SELECT status FROM meeting_participants WHERE meeting_id = ?1")?;
    let raw = stmt
        .query_map(params![meeting.get()], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raw.iter()
        .map(|s| s.parse().map_err(|e: meetbot_models::ModelError| PersistenceError::InvalidData(e.to_string())))
        .collect()
}

impl CalendarStore {
    /// Load what can make `user` busy on `date`.
    ///
    /// Returns `None` for an unregistered user.
    pub fn day_commitments(&self, user: UserId, date: NaiveDate) -> Result<Option<DayCommitments>> {
        self.with_conn(|conn| {
            let known = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", params![user.get()], |_| Ok(()))
                .optional()?
                .is_some();
            if !known {
                return Ok(None);
            }

            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM calendar_events e \
                 WHERE e.owner_id = ?1 AND e.date = ?2 ORDER BY e.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let events = stmt
                .query_map(params![user.get(), date], |row| event_from_row(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let sql = format!(
                "SELECT {MEETING_COLUMNS} FROM meetings m \
                 JOIN meeting_participants p ON p.meeting_id = m.id \
                 WHERE p.user_id = ?1 AND m.date = ?2 AND m.status = 'confirmed' \
                 ORDER BY m.start_time"
            );
            let mut stmt = conn.prepare(&sql)?;
            let confirmed_meetings = stmt
                .query_map(params![user.get(), date], |row| meeting_from_row(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Some(DayCommitments {
                events,
                confirmed_meetings,
            }))
        })
    }

    /// Write a meeting, its confirmed organizer row and every invitee row
    /// in one transaction.
    ///
    /// The meeting starts with `resolve` applied to the inserted
    /// participant statuses, so a meeting nobody has to answer is final
    /// from the start.
    pub fn insert_meeting<F>(&self, plan: &MeetingPlan, now: DateTime<Utc>, resolve: F) -> Result<Meeting>
    where
        F: FnOnce(&[ParticipantStatus]) -> MeetingStatus,
    {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO meetings \
                     (organizer_id, title, description, date, start_time, end_time, status, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)",
                params![
                    plan.organizer.get(),
                    plan.title,
                    plan.description,
                    plan.date,
                    plan.window.start(),
                    plan.window.end(),
                    now,
                ],
            )?;
            let id = MeetingId(tx.last_insert_rowid());

            {
                let mut insert = tx.prepare(
                    "INSERT INTO meeting_participants (meeting_id, user_id, status, invited_at, responded_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                insert.execute(params![
                    id.get(),
                    plan.organizer.get(),
                    ParticipantStatus::Confirmed.as_str(),
                    now,
                    now,
                ])?;
                for (user, status) in &plan.invitees {
                    let responded_at = (*status != ParticipantStatus::Pending).then_some(now);
                    insert.execute(params![id.get(), user.get(), status.as_str(), now, responded_at])?;
                }
            }

            let initial = resolve(&participant_statuses(&tx, id)?);
            if initial != MeetingStatus::Pending {
                tx.execute(
                    "UPDATE meetings SET status = ?1 WHERE id = ?2",
                    params![initial.as_str(), id.get()],
                )?;
            }

            let meeting = load_meeting(&tx, id)?.ok_or_else(|| PersistenceError::not_found("meeting", id))?;
            tx.commit()?;

            info!(
                meeting_id = %id,
                organizer = %plan.organizer,
                invitees = plan.invitees.len(),
                status = meeting.status.as_str(),
                "Meeting created"
            );
            Ok(meeting)
        })
    }

    pub fn get_meeting(&self, id: MeetingId) -> Result<Option<Meeting>> {
        self.with_conn(|conn| load_meeting(conn, id))
    }

    /// Participant rows of a meeting with their users, organizer first.
    pub fn participants(&self, meeting: MeetingId) -> Result<Vec<(Participant, User)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PARTICIPANT_COLUMNS}, {USER_COLUMNS} \
                 FROM meeting_participants p \
                 JOIN meetings m ON m.id = p.meeting_id \
                 JOIN users u ON u.id = p.user_id \
                 WHERE p.meeting_id = ?1 \
                 ORDER BY (p.user_id = m.organizer_id) DESC, p.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![meeting.get()], |row| {
                    Ok((participant_from_row(row, 0)?, user_from_row(row, 5)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Meetings `user` organizes or takes part in, soonest first.
    pub fn meetings_for(&self, user: UserId) -> Result<Vec<(Meeting, MeetingRole)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEETING_COLUMNS}, p.status FROM meetings m \
                 JOIN meeting_participants p ON p.meeting_id = m.id \
                 WHERE p.user_id = ?1 \
                 ORDER BY m.date, m.start_time, m.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let raw = stmt
                .query_map(params![user.get()], |row| {
                    Ok((meeting_from_row(row, 0)?, row.get::<_, String>(MEETING_WIDTH)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            raw.into_iter()
                .map(|(meeting, status)| {
                    let role = if meeting.organizer == user {
                        MeetingRole::Organizer
                    } else {
                        let status = status
                            .parse()
                            .map_err(|e: meetbot_models::ModelError| PersistenceError::InvalidData(e.to_string()))?;
                        MeetingRole::Participant(status)
                    };
                    Ok((meeting, role))
                })
                .collect()
        })
    }

    /// Meetings awaiting `user`'s answer, with their organizers.
    pub fn pending_invitations(&self, user: UserId) -> Result<Vec<(Meeting, User)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEETING_COLUMNS}, {USER_COLUMNS} FROM meetings m \
                 JOIN meeting_participants p ON p.meeting_id = m.id \
                 JOIN users u ON u.id = m.organizer_id \
                 WHERE p.user_id = ?1 AND p.status = 'pending' \
                 ORDER BY m.date, m.start_time, m.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user.get()], |row| {
                    Ok((meeting_from_row(row, 0)?, user_from_row(row, MEETING_WIDTH)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Record `user`'s answer and recompute the meeting status with
    /// `resolve`, all in one transaction.
    ///
    /// Returns `Ok(None)` when the user has no pending invitation to this
    /// meeting (never invited, or already answered). Fails with
    /// [`PersistenceError::NotFound`] when the meeting does not exist.
    pub fn record_response<F>(
        &self,
        meeting: MeetingId,
        user: UserId,
        status: ParticipantStatus,
        now: DateTime<Utc>,
        resolve: F,
    ) -> Result<Option<RecordedResponse>>
    where
        F: FnOnce(&[ParticipantStatus]) -> MeetingStatus,
    {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let current = load_meeting(&tx, meeting)?.ok_or_else(|| PersistenceError::not_found("meeting", meeting))?;

            let changed = tx.execute(
                "UPDATE meeting_participants SET status = ?1, responded_at = ?2 \
                 WHERE meeting_id = ?3 AND user_id = ?4 AND status = 'pending'",
                params![status.as_str(), now, meeting.get(), user.get()],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            let statuses = participant_statuses(&tx, meeting)?;
            let next = resolve(&statuses);
            if next != current.status {
                tx.execute(
                    "UPDATE meetings SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![next.as_str(), now, meeting.get()],
                )?;
            }

            let updated = load_meeting(&tx, meeting)?.ok_or_else(|| PersistenceError::not_found("meeting", meeting))?;
            tx.commit()?;

            debug!(
                meeting_id = %meeting,
                user_id = %user,
                response = status.as_str(),
                from = current.status.as_str(),
                to = updated.status.as_str(),
                "Invitation response recorded"
            );
            Ok(Some(RecordedResponse {
                meeting: updated,
                previous_status: current.status,
            }))
        })
    }

    /// Invitations still pending that were sent before `cutoff`.
    pub fn stale_invitations(&self, cutoff: DateTime<Utc>) -> Result<Vec<(MeetingId, UserId)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT meeting_id, user_id FROM meeting_participants \
                 WHERE status = 'pending' AND invited_at < ?1 ORDER BY meeting_id, id",
            )?;
            let rows = stmt
                .query_map(params![cutoff], |row| Ok((MeetingId(row.get(0)?), UserId(row.get(1)?))))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Meetings per status for `user`, counting any role.
    pub fn meeting_counts(&self, user: UserId) -> Result<HashMap<MeetingStatus, u32>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.status, COUNT(*) FROM meetings m \
                 JOIN meeting_participants p ON p.meeting_id = m.id \
                 WHERE p.user_id = ?1 GROUP BY m.status",
            )?;
            let raw = stmt
                .query_map(params![user.get()], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            raw.into_iter()
                .map(|(status, count)| {
                    let status = status
                        .parse()
                        .map_err(|e: meetbot_models::ModelError| PersistenceError::InvalidData(e.to_string()))?;
                    Ok((status, count))
                })
                .collect()
        })
    }
}
