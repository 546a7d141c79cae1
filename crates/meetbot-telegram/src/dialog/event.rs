//! Event creation and editing dialogs.

use chrono::NaiveDate;
use meetbot_models::{format_date, parse_date, CalendarEvent, EventId, EventPatch, NewEvent};

use super::{optional_text, required_text, Action, Step, SKIP};

/// Collects date, title and description of a new event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CreateEventDialog {
    #[default]
    Date,
    Title {
        date: NaiveDate,
    },
    Description {
        date: NaiveDate,
        title: String,
    },
}

impl CreateEventDialog {
    pub fn prompt(&self) -> String {
        match self {
            CreateEventDialog::Date => "Enter the event date (DD.MM.YYYY):".to_string(),
            CreateEventDialog::Title { date } => {
                format!("Date: {}\nNow enter the event title:", format_date(*date))
            }
            CreateEventDialog::Description { title, .. } => {
                format!("Title: {}\nEnter a description, or {} to leave it empty:", title, SKIP)
            }
        }
    }

    pub(super) fn feed(&mut self, input: &str) -> Step {
        match self {
            CreateEventDialog::Date => match parse_date(input) {
                Ok(date) => *self = CreateEventDialog::Title { date },
                Err(_) => {
                    return Step::Retry("Invalid date format. Use DD.MM.YYYY, for example 25.12.2024:".into())
                }
            },
            CreateEventDialog::Title { date } => match required_text(input, "title") {
                Ok(title) => {
                    *self = CreateEventDialog::Description { date: *date, title };
                }
                Err(msg) => return Step::Retry(msg),
            },
            CreateEventDialog::Description { date, title } => {
                return Step::Done(Action::CreateEvent(NewEvent {
                    date: *date,
                    title: title.clone(),
                    description: optional_text(input),
                }));
            }
        }
        Step::Prompt(self.prompt())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum UpdateStep {
    Title,
    Description { title: Option<String> },
}

/// Collects a new title and description for an existing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEventDialog {
    event: EventId,
    step: UpdateStep,
}

impl UpdateEventDialog {
    /// Start editing `event`, which the caller has checked belongs to the user.
    pub fn new(event: &CalendarEvent) -> (Self, String) {
        let dialog = Self {
            event: event.id,
            step: UpdateStep::Title,
        };
        let intro = format!(
            "Event {}\nDate: {}\nTitle: {}\nDescription: {}\n\nEnter a new title, or {} to keep it:",
            event.id,
            format_date(event.date),
            event.title,
            event.description.as_deref().unwrap_or("none"),
            SKIP
        );
        (dialog, intro)
    }

    pub fn event(&self) -> EventId {
        self.event
    }

    pub(super) fn feed(&mut self, input: &str) -> Step {
        match &self.step {
            UpdateStep::Title => {
                self.step = UpdateStep::Description {
                    title: optional_text(input),
                };
                Step::Prompt(format!("Enter a new description, or {} to keep it:", SKIP))
            }
            UpdateStep::Description { title } => Step::Done(Action::UpdateEvent {
                event: self.event,
                patch: EventPatch {
                    title: title.clone(),
                    description: optional_text(input),
                },
            }),
        }
    }
}
