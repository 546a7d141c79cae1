//! A user's commitments on one day, as read for availability checks.

use crate::event::CalendarEvent;
use crate::meeting::Meeting;

/// Everything that can make a user busy on one date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayCommitments {
    /// Calendar events on the date; each one blocks the whole day.
    pub events: Vec<CalendarEvent>,
    /// Confirmed meetings on the date that the user takes part in.
    pub confirmed_meetings: Vec<Meeting>,
}

impl DayCommitments {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.confirmed_meetings.is_empty()
    }
}
