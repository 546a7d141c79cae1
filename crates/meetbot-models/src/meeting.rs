//! Meetings, participants and the derived meeting status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::{MeetingId, UserId};
use crate::wire::format_time;

/// Aggregate status of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    /// At least one participant has not answered yet.
    #[default]
    Pending,
    /// Everyone answered and at least one participant confirmed.
    Confirmed,
    /// Everyone answered and nobody confirmed.
    Cancelled,
    /// Part of the stored taxonomy; [`MeetingStatus::resolve`] never yields it.
    Declined,
}

impl MeetingStatus {
    /// Derive the meeting status from its participants' statuses.
    ///
    /// Any pending participant keeps the meeting pending. Once all have
    /// answered, one confirmation is enough to confirm the meeting;
    /// otherwise it is cancelled.
    pub fn resolve(participants: &[ParticipantStatus]) -> MeetingStatus {
        if participants.contains(&ParticipantStatus::Pending) {
            MeetingStatus::Pending
        } else if participants.contains(&ParticipantStatus::Confirmed) {
            MeetingStatus::Confirmed
        } else {
            MeetingStatus::Cancelled
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Pending => "pending",
            MeetingStatus::Confirmed => "confirmed",
            MeetingStatus::Cancelled => "cancelled",
            MeetingStatus::Declined => "declined",
        }
    }

    /// Whether no further responses can change the status.
    pub fn is_final(&self) -> bool {
        !matches!(self, MeetingStatus::Pending)
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MeetingStatus::Pending),
            "confirmed" => Ok(MeetingStatus::Confirmed),
            "cancelled" => Ok(MeetingStatus::Cancelled),
            "declined" => Ok(MeetingStatus::Declined),
            other => Err(ModelError::UnknownVariant {
                kind: "meeting status",
                value: other.to_string(),
            }),
        }
    }
}

/// One participant's answer to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    #[default]
    Pending,
    Confirmed,
    Declined,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Pending => "pending",
            ParticipantStatus::Confirmed => "confirmed",
            ParticipantStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ParticipantStatus::Pending),
            "confirmed" => Ok(ParticipantStatus::Confirmed),
            "declined" => Ok(ParticipantStatus::Declined),
            other => Err(ModelError::UnknownVariant {
                kind: "participant status",
                value: other.to_string(),
            }),
        }
    }
}

/// What an invitee answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationResponse {
    Confirm,
    Decline,
}

impl InvitationResponse {
    /// Participant status the response moves the invitee to.
    pub fn status(self) -> ParticipantStatus {
        match self {
            InvitationResponse::Confirm => ParticipantStatus::Confirmed,
            InvitationResponse::Decline => ParticipantStatus::Declined,
        }
    }
}

impl FromStr for InvitationResponse {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "confirm" | "yes" | "да" | "подтвердить" => Ok(InvitationResponse::Confirm),
            "decline" | "no" | "нет" | "отклонить" => Ok(InvitationResponse::Decline),
            other => Err(ModelError::UnknownVariant {
                kind: "invitation response",
                value: other.to_string(),
            }),
        }
    }
}

/// A half-open `[start, end)` slot within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    /// Build a window, rejecting `end <= start`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ModelError> {
        if end <= start {
            return Err(ModelError::EmptyWindow {
                start: format_time(start),
                end: format_time(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Strict half-open intersection; touching windows do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_time(self.start), format_time(self.end))
    }
}

/// A meeting row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub organizer: UserId,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub window: TimeWindow,
    pub status: MeetingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A participant row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub meeting: MeetingId,
    pub user: UserId,
    pub status: ParticipantStatus,
    pub invited_at: DateTime<Utc>,
    /// Set when the status leaves pending.
    pub responded_at: Option<DateTime<Utc>>,
}

/// Everything needed to write a meeting and its participant rows at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingPlan {
    pub organizer: UserId,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub window: TimeWindow,
    /// Invitees other than the organizer and their initial status.
    pub invitees: Vec<(UserId, ParticipantStatus)>,
}

/// The caller's relation to a meeting in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingRole {
    Organizer,
    Participant(ParticipantStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_resolve_pending_while_anyone_pending() {
        use ParticipantStatus::*;
        assert_eq!(MeetingStatus::resolve(&[Confirmed, Pending]), MeetingStatus::Pending);
        assert_eq!(MeetingStatus::resolve(&[Declined, Pending, Confirmed]), MeetingStatus::Pending);
    }

    #[test]
    fn test_resolve_confirmed_with_one_confirmation() {
        use ParticipantStatus::*;
        assert_eq!(MeetingStatus::resolve(&[Confirmed, Declined, Declined]), MeetingStatus::Confirmed);
        assert_eq!(MeetingStatus::resolve(&[Confirmed]), MeetingStatus::Confirmed);
    }

    #[test]
    fn test_resolve_cancelled_when_all_declined() {
        use ParticipantStatus::*;
        assert_eq!(MeetingStatus::resolve(&[Declined, Declined]), MeetingStatus::Cancelled);
        assert_eq!(MeetingStatus::resolve(&[]), MeetingStatus::Cancelled);
    }

    #[test]
    fn test_resolve_never_yields_declined() {
        use ParticipantStatus::*;
        let all = [Pending, Confirmed, Declined];
        for a in all {
            for b in all {
                for c in all {
                    let status = MeetingStatus::resolve(&[a, b, c]);
                    assert_ne!(status, MeetingStatus::Declined);
                    if !matches!(status, MeetingStatus::Pending) {
                        assert_eq!(status == MeetingStatus::Confirmed, [a, b, c].contains(&Confirmed));
                    }
                }
            }
        }
    }

    #[test]
    fn test_window_rejects_empty_and_inverted() {
        assert!(TimeWindow::new(t(15, 0), t(15, 0)).is_err());
        assert!(TimeWindow::new(t(15, 0), t(14, 0)).is_err());
        assert!(TimeWindow::new(t(14, 0), t(15, 0)).is_ok());
    }

    #[test]
    fn test_window_overlap_is_half_open() {
        let existing = TimeWindow::new(t(14, 0), t(15, 0)).unwrap();
        assert!(existing.overlaps(&TimeWindow::new(t(14, 30), t(15, 30)).unwrap()));
        assert!(existing.overlaps(&TimeWindow::new(t(13, 0), t(16, 0)).unwrap()));
        assert!(!existing.overlaps(&TimeWindow::new(t(15, 0), t(16, 0)).unwrap()));
        assert!(!existing.overlaps(&TimeWindow::new(t(13, 0), t(14, 0)).unwrap()));
    }

    #[test]
    fn test_invitation_response_words() {
        assert_eq!("yes".parse::<InvitationResponse>().unwrap(), InvitationResponse::Confirm);
        assert_eq!("Подтвердить".parse::<InvitationResponse>().unwrap(), InvitationResponse::Confirm);
        assert_eq!("decline".parse::<InvitationResponse>().unwrap(), InvitationResponse::Decline);
        assert!("maybe".parse::<InvitationResponse>().is_err());
    }

    #[test]
    fn test_window_display() {
        let window = TimeWindow::new(t(9, 5), t(10, 0)).unwrap();
        assert_eq!(window.to_string(), "09:05-10:00");
    }
}
