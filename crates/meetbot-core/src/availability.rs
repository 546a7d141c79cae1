//! Availability engine.
//!
//! A user is busy in a window when they have any calendar event that day
//! (events have no time of day and occupy the whole day) or a confirmed
//! meeting whose window overlaps the requested one. Pending, declined and
//! cancelled meetings never block. Unknown users are treated as busy.

use chrono::NaiveDate;
use meetbot_models::{CalendarEvent, DayCommitments, Meeting, TimeWindow, UserId};
use meetbot_persistence::CalendarStore;

use crate::error::Result;

/// A commitment that blocks a requested window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// A calendar event occupying the whole day.
    AllDay(CalendarEvent),
    /// A confirmed meeting overlapping the window.
    Meeting(Meeting),
}

/// Outcome of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Free,
    Busy(Vec<Conflict>),
    /// The user is not registered.
    UnknownUser,
}

impl Availability {
    pub fn is_free(&self) -> bool {
        matches!(self, Availability::Free)
    }
}

/// Commitments from `day` that block `window`.
pub fn conflicts(day: &DayCommitments, window: &TimeWindow) -> Vec<Conflict> {
    let all_day = day.events.iter().cloned().map(Conflict::AllDay);
    let meetings = day
        .confirmed_meetings
        .iter()
        .filter(|meeting| meeting.window.overlaps(window))
        .cloned()
        .map(Conflict::Meeting);
    all_day.chain(meetings).collect()
}

/// Decide availability from a snapshot; `None` means the user is unknown.
pub fn evaluate(day: Option<&DayCommitments>, window: &TimeWindow) -> Availability {
    match day {
        None => Availability::UnknownUser,
        Some(day) => {
            let found = conflicts(day, window);
            if found.is_empty() {
                Availability::Free
            } else {
                Availability::Busy(found)
            }
        }
    }
}

/// Load `user`'s commitments on `date` and evaluate them.
pub fn check(store: &CalendarStore, user: UserId, date: NaiveDate, window: &TimeWindow) -> Result<Availability> {
    let day = store.day_commitments(user, date)?;
    Ok(evaluate(day.as_ref(), window))
}

/// Whether `user` is free on `date` during `window`.
pub fn is_available(store: &CalendarStore, user: UserId, date: NaiveDate, window: &TimeWindow) -> Result<bool> {
    Ok(check(store, user, date, window)?.is_free())
}
