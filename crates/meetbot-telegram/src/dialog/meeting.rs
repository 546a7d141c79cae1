//! Meeting creation dialog.

use chrono::{NaiveDate, NaiveTime};
use meetbot_models::{format_date, format_time, parse_date, parse_time, UserId};

use super::{optional_text, required_text, Action, MeetingDraft, Step, SKIP};

/// Fields collected before the time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    date: NaiveDate,
    title: String,
    description: Option<String>,
}

/// Collects date, title, description, window and invitees of a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CreateMeetingDialog {
    #[default]
    Date,
    Title {
        date: NaiveDate,
    },
    Description {
        date: NaiveDate,
        title: String,
    },
    Start {
        header: Header,
    },
    End {
        header: Header,
        start: NaiveTime,
    },
    Participants {
        header: Header,
        start: NaiveTime,
        end: NaiveTime,
    },
}

impl CreateMeetingDialog {
    pub fn prompt(&self) -> String {
        match self {
            CreateMeetingDialog::Date => "Enter the meeting date (DD.MM.YYYY):".to_string(),
            CreateMeetingDialog::Title { date } => {
                format!("Date: {}\nEnter the meeting title:", format_date(*date))
            }
            CreateMeetingDialog::Description { .. } => {
                format!("Enter a description, or {} to leave it empty:", SKIP)
            }
            CreateMeetingDialog::Start { .. } => "Enter the start time (HH:MM):".to_string(),
            CreateMeetingDialog::End { start, .. } => {
                format!("Start: {}\nEnter the end time (HH:MM):", format_time(*start))
            }
            CreateMeetingDialog::Participants { .. } => "Enter participant ids separated by commas, \
                 for example 123456789, 987654321.\nSend 0 to create the meeting without invitees.\n\
                 Participants can find their id with /my_id."
                .to_string(),
        }
    }

    pub(super) fn feed(&mut self, input: &str) -> Step {
        match self {
            CreateMeetingDialog::Date => match parse_date(input) {
                Ok(date) => *self = CreateMeetingDialog::Title { date },
                Err(_) => {
                    return Step::Retry("Invalid date format. Use DD.MM.YYYY, for example 25.12.2024:".into())
                }
            },
            CreateMeetingDialog::Title { date } => match required_text(input, "title") {
                Ok(title) => *self = CreateMeetingDialog::Description { date: *date, title },
                Err(msg) => return Step::Retry(msg),
            },
            CreateMeetingDialog::Description { date, title } => {
                *self = CreateMeetingDialog::Start {
                    header: Header {
                        date: *date,
                        title: std::mem::take(title),
                        description: optional_text(input),
                    },
                };
            }
            CreateMeetingDialog::Start { header } => match parse_time(input) {
                Ok(start) => {
                    *self = CreateMeetingDialog::End {
                        header: header.clone(),
                        start,
                    }
                }
                Err(_) => return Step::Retry("Invalid time format. Use HH:MM, for example 14:30:".into()),
            },
            CreateMeetingDialog::End { header, start } => match parse_time(input) {
                Ok(end) if end > *start => {
                    *self = CreateMeetingDialog::Participants {
                        header: header.clone(),
                        start: *start,
                        end,
                    }
                }
                Ok(_) => {
                    return Step::Retry(format!(
                        "The end time must be after the start time ({}). Enter the end time:",
                        format_time(*start)
                    ))
                }
                Err(_) => return Step::Retry("Invalid time format. Use HH:MM, for example 15:30:".into()),
            },
            CreateMeetingDialog::Participants { header, start, end } => {
                return match parse_participants(input) {
                    Ok(participants) => Step::Done(Action::CreateMeeting(MeetingDraft {
                        title: header.title.clone(),
                        description: header.description.clone(),
                        date: header.date,
                        start: *start,
                        end: *end,
                        participants,
                    })),
                    Err(bad) => Step::Retry(format!(
                        "'{}' is not a user id. Enter numeric ids separated by commas, or 0:",
                        bad
                    )),
                };
            }
        }
        Step::Prompt(self.prompt())
    }
}

/// Comma-separated user ids; a lone `0` means nobody.
fn parse_participants(input: &str) -> Result<Vec<UserId>, String> {
    if input == "0" {
        return Ok(Vec::new());
    }
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<UserId>().map_err(|_| part.to_string()))
        .collect::<Result<Vec<_>, _>>()
        .and_then(|ids| if ids.is_empty() { Err(input.to_string()) } else { Ok(ids) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_end_step() -> CreateMeetingDialog {
        let mut dialog = CreateMeetingDialog::default();
        dialog.feed("25.12.2024");
        dialog.feed("Planning");
        dialog.feed(SKIP);
        dialog.feed("14:00");
        dialog
    }

    #[test]
    fn test_full_meeting_dialog() {
        let mut dialog = at_end_step();
        assert!(matches!(dialog.feed("15:00"), Step::Prompt(_)));

        let step = dialog.feed("111, 222 ,333");
        assert_eq!(
            step,
            Step::Done(Action::CreateMeeting(MeetingDraft {
                title: "Planning".into(),
                description: None,
                date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
                start: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
                participants: vec![UserId(111), UserId(222), UserId(333)],
            }))
        );
    }

    #[test]
    fn test_end_not_after_start_reprompts() {
        let mut dialog = at_end_step();
        for input in ["13:00", "14:00", "25:00"] {
            assert!(matches!(dialog.feed(input), Step::Retry(_)), "{input}");
            assert!(matches!(dialog, CreateMeetingDialog::End { .. }));
        }
    }

    #[test]
    fn test_zero_means_no_participants() {
        assert_eq!(parse_participants("0"), Ok(vec![]));
        assert_eq!(parse_participants("12,abc"), Err("abc".to_string()));
        assert!(parse_participants(" , ").is_err());
    }
}
