//! Multi-step dialogs.
//!
//! A dialog collects the fields of one operation over several messages.
//! Each kind is a small state machine: [`Dialog::feed`] takes one reply,
//! validates it against the current step and either asks again, moves to
//! the next step, or hands back the finished [`Action`]. Dialogs never
//! touch the store; the caller checks ownership when a dialog starts and
//! runs the action when it completes.

mod event;
mod export;
mod meeting;
mod visibility;

use chrono::{NaiveDate, NaiveTime};
use meetbot_core::ExportRequest;
use meetbot_models::{EventId, EventPatch, NewEvent, UserId, Visibility};

pub use event::{CreateEventDialog, UpdateEventDialog};
pub use export::ExportDialog;
pub use meeting::CreateMeetingDialog;
pub use visibility::{Candidate, VisibilityDialog};

/// Reply that leaves an optional field empty.
pub const SKIP: &str = "/skip";

/// Which dialog a user is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogKind {
    Idle,
    CreatingEvent,
    CreatingMeeting,
    UpdatingEvent,
    Publishing,
    Unpublishing,
    Exporting,
}

/// The dialog in progress for one user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dialog {
    #[default]
    Idle,
    CreateEvent(CreateEventDialog),
    CreateMeeting(CreateMeetingDialog),
    UpdateEvent(UpdateEventDialog),
    Visibility(VisibilityDialog),
    Export(ExportDialog),
}

/// Result of feeding one reply to a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Accepted; ask the next question.
    Prompt(String),
    /// Rejected; the same step asks again.
    Retry(String),
    /// Last step done; run the action and go idle.
    Done(Action),
    /// The user backed out; go idle with this reply.
    Abort(String),
}

/// A fully collected operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateEvent(NewEvent),
    CreateMeeting(MeetingDraft),
    UpdateEvent { event: EventId, patch: EventPatch },
    SetVisibility { event: EventId, target: Visibility },
    Export(ExportRequest),
}

/// Meeting fields collected by the dialog; the organizer is the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub participants: Vec<UserId>,
}

impl Dialog {
    pub fn kind(&self) -> DialogKind {
        match self {
            Dialog::Idle => DialogKind::Idle,
            Dialog::CreateEvent(_) => DialogKind::CreatingEvent,
            Dialog::CreateMeeting(_) => DialogKind::CreatingMeeting,
            Dialog::UpdateEvent(_) => DialogKind::UpdatingEvent,
            Dialog::Visibility(d) => match d.target() {
                Visibility::Public => DialogKind::Publishing,
                Visibility::Private => DialogKind::Unpublishing,
            },
            Dialog::Export(_) => DialogKind::Exporting,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Dialog::Idle)
    }

    /// Feed one reply. Completing or aborting resets the dialog to idle.
    pub fn feed(&mut self, input: &str) -> Step {
        let input = input.trim();
        let step = match self {
            Dialog::Idle => return Step::Retry(String::from("There is no action in progress.")),
            Dialog::CreateEvent(d) => d.feed(input),
            Dialog::CreateMeeting(d) => d.feed(input),
            Dialog::UpdateEvent(d) => d.feed(input),
            Dialog::Visibility(d) => d.feed(input),
            Dialog::Export(d) => d.feed(input),
        };
        if matches!(step, Step::Done(_) | Step::Abort(_)) {
            *self = Dialog::Idle;
        }
        step
    }
}

/// A required free-text field.
fn required_text(input: &str, what: &str) -> Result<String, String> {
    if input.is_empty() || input == SKIP {
        Err(format!("The {} is required. Please enter it:", what))
    } else {
        Ok(input.to_string())
    }
}

/// An optional free-text field; `/skip` leaves it empty.
fn optional_text(input: &str) -> Option<String> {
    if input.is_empty() || input == SKIP {
        None
    } else {
        Some(input.to_string())
    }
}
