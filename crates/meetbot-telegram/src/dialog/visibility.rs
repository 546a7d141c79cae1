//! Publish and unpublish dialogs.
//!
//! Both pick one event from a list shown at the start and then ask for a
//! yes/no confirmation. Anything that is neither re-prompts.

use meetbot_models::{format_date, CalendarEvent, EventId, Visibility};

use super::{Action, Step};

const YES: &[&str] = &["yes", "y", "ok", "да", "д", "ок"];
const NO: &[&str] = &["no", "n", "нет", "н", "отмена"];

/// An event offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: EventId,
    pub title: String,
}

impl From<&CalendarEvent> for Candidate {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: event.id,
            title: format!("{} - {}", format_date(event.date), event.title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VisibilityStep {
    Select(Vec<Candidate>),
    Confirm(Candidate),
}

/// Changes one event's visibility to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityDialog {
    target: Visibility,
    step: VisibilityStep,
}

impl VisibilityDialog {
    /// Start by listing `candidates`, which must not be empty.
    pub fn select(target: Visibility, candidates: Vec<Candidate>) -> (Self, String) {
        let mut text = match target {
            Visibility::Public => String::from("Your private events:\n\n"),
            Visibility::Private => String::from("Your public events:\n\n"),
        };
        for candidate in &candidates {
            text.push_str(&format!("ID {} | {}\n", candidate.id, candidate.title));
        }
        text.push_str(&format!("\nEnter the id of the event to {}, or /cancel:", verb(target)));

        let dialog = Self {
            target,
            step: VisibilityStep::Select(candidates),
        };
        (dialog, text)
    }

    /// Start at the confirmation for an event picked up front.
    pub fn confirm(target: Visibility, id: EventId, title: String) -> Self {
        Self {
            target,
            step: VisibilityStep::Confirm(Candidate { id, title }),
        }
    }

    pub fn target(&self) -> Visibility {
        self.target
    }

    /// Question asked at the confirmation step.
    pub fn prompt(&self) -> String {
        match &self.step {
            VisibilityStep::Select(_) => format!("Enter the id of the event to {}:", verb(self.target)),
            VisibilityStep::Confirm(candidate) => {
                let effect = match self.target {
                    Visibility::Public => "Other users will see it in /shared.",
                    Visibility::Private => "Other users will no longer see it.",
                };
                format!(
                    "{} event {} ({})? {}\nAnswer yes or no:",
                    capitalized(verb(self.target)),
                    candidate.id,
                    candidate.title,
                    effect
                )
            }
        }
    }

    pub(super) fn feed(&mut self, input: &str) -> Step {
        match &self.step {
            VisibilityStep::Select(candidates) => {
                let picked = input
                    .parse::<EventId>()
                    .ok()
                    .and_then(|id| candidates.iter().find(|c| c.id == id));
                match picked {
                    Some(candidate) => {
                        self.step = VisibilityStep::Confirm(candidate.clone());
                        Step::Prompt(self.prompt())
                    }
                    None => Step::Retry("Invalid event id. Pick an id from the list above:".into()),
                }
            }
            VisibilityStep::Confirm(candidate) => {
                let answer = input.to_lowercase();
                if YES.contains(&answer.as_str()) {
                    Step::Done(Action::SetVisibility {
                        event: candidate.id,
                        target: self.target,
                    })
                } else if NO.contains(&answer.as_str()) {
                    Step::Abort(format!("Cancelled. Event {} was not changed.", candidate.id))
                } else {
                    Step::Retry("Please answer yes or no:".into())
                }
            }
        }
    }
}

fn verb(target: Visibility) -> &'static str {
    match target {
        Visibility::Public => "publish",
        Visibility::Private => "unpublish",
    }
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
