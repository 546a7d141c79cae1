//! Export dialog: scope, format, then an optional date range.

use chrono::NaiveDate;
use meetbot_core::{ExportFormat, ExportRequest, ExportScope};
use meetbot_models::{format_date, parse_date};

use super::{Action, Step};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportDialog {
    #[default]
    Scope,
    Format {
        scope: ExportScope,
    },
    Range {
        scope: ExportScope,
        format: ExportFormat,
    },
    From {
        scope: ExportScope,
        format: ExportFormat,
    },
    To {
        scope: ExportScope,
        format: ExportFormat,
        from: NaiveDate,
    },
}

impl ExportDialog {
    pub fn prompt(&self) -> String {
        match self {
            ExportDialog::Scope => "What do you want to export?\n\
                 1. Everything\n\
                 2. Calendar events\n\
                 3. Meetings\n\n\
                 Enter 1, 2 or 3:"
                .to_string(),
            ExportDialog::Format { scope } => format!(
                "Exporting {}.\nChoose a format:\n\
                 1. {}\n2. {}\n3. {}\n\nEnter 1, 2 or 3:",
                scope.label(),
                ExportFormat::Json.label(),
                ExportFormat::Csv.label(),
                ExportFormat::Ical.label()
            ),
            ExportDialog::Range { .. } => "Which dates?\n\
                 1. All dates\n\
                 2. A period\n\n\
                 Enter 1 or 2:"
                .to_string(),
            ExportDialog::From { .. } => "Enter the first date of the period (DD.MM.YYYY):".to_string(),
            ExportDialog::To { from, .. } => format!(
                "From {}. Enter the last date of the period (DD.MM.YYYY):",
                format_date(*from)
            ),
        }
    }

    pub(super) fn feed(&mut self, input: &str) -> Step {
        let choice = input.parse::<u8>().ok();
        match *self {
            ExportDialog::Scope => match choice.and_then(ExportScope::from_choice) {
                Some(scope) => *self = ExportDialog::Format { scope },
                None => return Step::Retry("Please enter 1, 2 or 3:".into()),
            },
            ExportDialog::Format { scope } => match choice.and_then(ExportFormat::from_choice) {
                Some(format) => *self = ExportDialog::Range { scope, format },
                None => return Step::Retry("Please enter 1, 2 or 3:".into()),
            },
            ExportDialog::Range { scope, format } => match choice {
                Some(1) => {
                    return Step::Done(Action::Export(ExportRequest {
                        scope,
                        format,
                        from: None,
                        to: None,
                    }))
                }
                Some(2) => *self = ExportDialog::From { scope, format },
                _ => return Step::Retry("Please enter 1 or 2:".into()),
            },
            ExportDialog::From { scope, format } => match parse_date(input) {
                Ok(from) => *self = ExportDialog::To { scope, format, from },
                Err(_) => return Step::Retry("Invalid date format. Use DD.MM.YYYY:".into()),
            },
            ExportDialog::To { scope, format, from } => {
                return match parse_date(input) {
                    Ok(to) if to >= from => Step::Done(Action::Export(ExportRequest {
                        scope,
                        format,
                        from: Some(from),
                        to: Some(to),
                    })),
                    Ok(_) => Step::Retry(format!(
                        "The last date cannot be before {}. Enter the last date:",
                        format_date(from)
                    )),
                    Err(_) => Step::Retry("Invalid date format. Use DD.MM.YYYY:".into()),
                };
            }
        }
        Step::Prompt(self.prompt())
    }
}
