//! Meeting orchestrator.
//!
//! Owns the meeting lifecycle: creation with invitation fan-out, invitee
//! responses, and the derived meeting status. Everything here is
//! synchronous; callers on the async runtime go through
//! [`run_blocking`](crate::blocking::run_blocking). Every method commits its
//! writes before returning the [`Notice`]s that describe them, so the
//! caller dispatches notifications strictly after the state change.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use meetbot_models::{
    format_date, InvitationResponse, Meeting, MeetingId, MeetingPlan, MeetingStatus,
    NotificationKind, ParticipantStatus, TimeWindow, User, UserId,
};
use meetbot_persistence::{CalendarStore, PersistenceError};
use tracing::{info, warn};

use crate::availability;
use crate::error::{CoreError, Result};
use crate::notify::Notice;

/// Input of a meeting creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRequest {
    pub organizer: UserId,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Invitees as typed; duplicates and the organizer are dropped.
    pub participants: Vec<UserId>,
}

/// A created meeting and how its invitations went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingCreated {
    pub meeting: Meeting,
    /// Invitees who got an invitation and are pending.
    pub invited: Vec<UserId>,
    /// Invitees who were busy and were declined on their behalf.
    pub busy: Vec<UserId>,
    /// Ids that belong to no registered user.
    pub unknown: Vec<UserId>,
    pub notices: Vec<Notice>,
}

impl MeetingCreated {
    /// One-paragraph report for the organizer.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Meeting '{}' created for {} {}. Invitations sent to {} participant(s).",
            self.meeting.title,
            format_date(self.meeting.date),
            self.meeting.window,
            self.invited.len()
        );
        if !self.busy.is_empty() {
            text.push_str(&format!(
                "\nBusy at that time, marked as declined: {}.",
                join_ids(&self.busy)
            ));
        }
        if !self.unknown.is_empty() {
            text.push_str(&format!("\nNot registered, skipped: {}.", join_ids(&self.unknown)));
        }
        text
    }
}

/// A recorded invitation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecorded {
    /// The meeting after the status recompute.
    pub meeting: Meeting,
    pub response: InvitationResponse,
    pub previous_status: MeetingStatus,
    pub notices: Vec<Notice>,
}

impl ResponseRecorded {
    /// Reply for the responder.
    pub fn summary(&self) -> String {
        let verb = match self.response {
            InvitationResponse::Confirm => "confirmed",
            InvitationResponse::Decline => "declined",
        };
        format!(
            "You {} the meeting '{}'. Meeting status: {}.",
            verb, self.meeting.title, self.meeting.status
        )
    }
}

fn join_ids(ids: &[UserId]) -> String {
    ids.iter().map(UserId::to_string).collect::<Vec<_>>().join(", ")
}

fn describe(meeting: &Meeting) -> String {
    format!("'{}' on {} at {}", meeting.title, format_date(meeting.date), meeting.window)
}

/// Drives meeting creation and responses against the store.
pub struct MeetingOrchestrator {
    store: Arc<CalendarStore>,
}

impl MeetingOrchestrator {
    pub fn new(store: Arc<CalendarStore>) -> Self {
        Self { store }
    }

    /// Create a meeting and invite its participants.
    ///
    /// Fails without writing anything when the window is empty or the
    /// organizer is busy. Busy invitees are inserted as declined and get no
    /// notification; free invitees are pending and get an invitation.
    pub fn create_meeting(&self, request: &MeetingRequest, now: DateTime<Utc>) -> Result<MeetingCreated> {
        let window = TimeWindow::new(request.start, request.end).map_err(CoreError::InvalidWindow)?;

        if !availability::is_available(&self.store, request.organizer, request.date, &window)? {
            info!(organizer = %request.organizer, date = %request.date, window = %window, "Organizer busy, meeting rejected");
            return Err(CoreError::OrganizerBusy);
        }

        let mut seen = HashSet::from([request.organizer]);
        let mut invitees = Vec::new();
        let mut invited = Vec::new();
        let mut busy = Vec::new();
        let mut unknown = Vec::new();

        for &participant in &request.participants {
            if !seen.insert(participant) {
                continue;
            }
            let day = self.store.day_commitments(participant, request.date)?;
            match availability::evaluate(day.as_ref(), &window) {
                availability::Availability::Free => {
                    invitees.push((participant, ParticipantStatus::Pending));
                    invited.push(participant);
                }
                availability::Availability::Busy(_) => {
                    invitees.push((participant, ParticipantStatus::Declined));
                    busy.push(participant);
                }
                availability::Availability::UnknownUser => {
                    warn!(participant = %participant, "Invitee is not registered, skipping");
                    unknown.push(participant);
                }
            }
        }

        let organizer_name = self
            .store
            .get_user(request.organizer)?
            .map(|user| user.display_name())
            .unwrap_or_else(|| fallback_name(request.organizer));

        let plan = MeetingPlan {
            organizer: request.organizer,
            title: request.title.clone(),
            description: request.description.clone(),
            date: request.date,
            window,
            invitees,
        };
        let meeting = self.store.insert_meeting(&plan, now, MeetingStatus::resolve)?;

        let notices = invited
            .iter()
            .map(|&user| {
                Notice::new(
                    user,
                    meeting.id,
                    NotificationKind::Invitation,
                    format!(
                        "{} invites you to {}.\nReply /confirm_meeting_{} or /decline_meeting_{}",
                        organizer_name,
                        describe(&meeting),
                        meeting.id,
                        meeting.id
                    ),
                )
            })
            .collect();

        info!(
            meeting_id = %meeting.id,
            invited = invited.len(),
            busy = busy.len(),
            unknown = unknown.len(),
            "Invitations prepared"
        );

        Ok(MeetingCreated {
            meeting,
            invited,
            busy,
            unknown,
            notices,
        })
    }

    /// Record `user`'s answer to an invitation.
    ///
    /// Only a pending invitee can answer, and only once.
    pub fn respond(
        &self,
        user: UserId,
        meeting: MeetingId,
        response: InvitationResponse,
        now: DateTime<Utc>,
    ) -> Result<ResponseRecorded> {
        let recorded = match self
            .store
            .record_response(meeting, user, response.status(), now, MeetingStatus::resolve)
        {
            Ok(Some(recorded)) => recorded,
            Ok(None) => return Err(CoreError::NotInvited(meeting)),
            Err(PersistenceError::NotFound { .. }) => return Err(CoreError::MeetingNotFound(meeting)),
            Err(e) => return Err(e.into()),
        };

        let responder = self.display_name(user);
        let about = describe(&recorded.meeting);
        let (kind, verb) = match response {
            InvitationResponse::Confirm => (NotificationKind::Confirmation, "confirmed"),
            InvitationResponse::Decline => (NotificationKind::Cancellation, "declined"),
        };
        let notices = vec![
            Notice::new(
                recorded.meeting.organizer,
                meeting,
                kind,
                format!("{} {} your meeting {}.", responder, verb, about),
            ),
            Notice::new(user, meeting, kind, format!("You {} the meeting {}.", verb, about)),
        ];

        info!(
            meeting_id = %meeting,
            user_id = %user,
            response = verb,
            status = %recorded.meeting.status,
            "Invitation answered"
        );

        Ok(ResponseRecorded {
            meeting: recorded.meeting,
            response,
            previous_status: recorded.previous_status,
            notices,
        })
    }

    /// Decline every invitation still pending since before `cutoff`, as if
    /// the invitee had declined it.
    pub fn expire_stale_invitations(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<Vec<Notice>> {
        let mut notices = Vec::new();
        for (meeting, user) in self.store.stale_invitations(cutoff)? {
            let recorded = match self.store.record_response(
                meeting,
                user,
                ParticipantStatus::Declined,
                now,
                MeetingStatus::resolve,
            ) {
                Ok(Some(recorded)) => recorded,
                // Answered between the scan and the write.
                Ok(None) => continue,
                Err(e) => {
                    // Earlier expirations are committed and still need their notices.
                    warn!(meeting_id = %meeting, user_id = %user, error = %e, "Failed to expire invitation");
                    continue;
                }
            };

            let invitee = self.display_name(user);
            let about = describe(&recorded.meeting);
            notices.push(Notice::new(
                recorded.meeting.organizer,
                meeting,
                NotificationKind::Cancellation,
                format!("{} did not answer in time and was removed from {}.", invitee, about),
            ));
            notices.push(Notice::new(
                user,
                meeting,
                NotificationKind::Cancellation,
                format!("Your invitation to {} expired.", about),
            ));
            info!(meeting_id = %meeting, user_id = %user, status = %recorded.meeting.status, "Invitation expired");
        }
        Ok(notices)
    }

    /// Name for notices about a change that has already committed.
    fn display_name(&self, user: UserId) -> String {
        name_or_fallback(user, self.store.get_user(user))
    }
}

fn fallback_name(user: UserId) -> String {
    format!("User{}", user)
}

/// A failed lookup must not turn a committed change into an error.
fn name_or_fallback(user: UserId, found: meetbot_persistence::Result<Option<User>>) -> String {
    match found {
        Ok(Some(found)) => found.display_name(),
        Ok(None) => fallback_name(user),
        Err(e) => {
            warn!(user_id = %user, error = %e, "Name lookup failed, using fallback");
            fallback_name(user)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lookup_failure_falls_back() {
        let failed = Err(PersistenceError::LockPoisoned("writer panicked".into()));
        assert_eq!(name_or_fallback(UserId(42), failed), "User42");
        assert_eq!(name_or_fallback(UserId(7), Ok(None)), "User7");
    }
}
