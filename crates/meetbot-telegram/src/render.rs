//! Plain-text replies.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;
use meetbot_core::{Availability, Conflict};
use meetbot_models::{
    format_date, CalendarEvent, EventStats, Meeting, MeetingRole, MeetingStatus, NotificationFeed,
    Participant, ParticipantStatus, ShareStats, TimeWindow, User, UserId,
};

/// Longest description shown in lists.
const PREVIEW_CHARS: usize = 50;

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

pub fn event_line(event: &CalendarEvent) -> String {
    let mut line = format!("ID {} | {} - {}", event.id, format_date(event.date), event.title);
    if event.is_public() {
        line.push_str(" [public]");
    }
    line
}

pub fn event_detail(event: &CalendarEvent) -> String {
    let mut text = format!(
        "Event {}\nDate: {}\nTitle: {}\nDescription: {}\nVisibility: {}",
        event.id,
        format_date(event.date),
        event.title,
        event.description.as_deref().unwrap_or("none"),
        if event.is_public() { "public" } else { "private" }
    );
    if let Some(published) = event.published_at {
        let _ = write!(text, "\nPublished: {}", published.format("%d.%m.%Y %H:%M"));
    }
    text
}

/// Events under `header`, or `empty` when there are none.
pub fn event_list(header: &str, events: &[CalendarEvent], empty: &str) -> String {
    if events.is_empty() {
        return empty.to_string();
    }
    let mut text = format!("{}\n\n", header);
    for event in events {
        text.push_str(&event_line(event));
        text.push('\n');
        if let Some(description) = &event.description {
            let _ = writeln!(text, "   {}", preview(description));
        }
    }
    let _ = write!(text, "\nTotal: {}", events.len());
    text
}

pub fn stats(stats: &EventStats) -> String {
    let mut text = format!(
        "Your events\n\nTotal: {}\nToday: {}\nUpcoming: {}\nPast: {}",
        stats.total, stats.today, stats.future, stats.past
    );
    if let Some(closest) = &stats.closest {
        let _ = write!(text, "\n\nNext: {}", event_line(closest));
    }
    text
}

pub fn share_stats(stats: &ShareStats) -> String {
    format!(
        "Sharing\n\nPublic events: {}\nPrivate events: {}\nPublished in the last 7 days: {}\n\
         Public events of other users: {}",
        stats.public, stats.private, stats.recently_published, stats.others_public
    )
}

/// Public events of other users, grouped under their owner.
pub fn shared_events(events: &[(CalendarEvent, User)]) -> String {
    if events.is_empty() {
        return "No other user has published events yet.".to_string();
    }
    let mut text = String::from("Public events of other users:\n");
    let mut current: Option<UserId> = None;
    for (event, owner) in events {
        if current != Some(owner.id) {
            let _ = write!(text, "\n{} (id {}):\n", owner.display_name(), owner.id);
            current = Some(owner.id);
        }
        let _ = writeln!(text, "{}", event_line(event));
    }
    text
}

fn role_label(role: &MeetingRole) -> String {
    match role {
        MeetingRole::Organizer => "organizer".to_string(),
        MeetingRole::Participant(status) => format!("participant, {}", status),
    }
}

pub fn meeting_line(meeting: &Meeting) -> String {
    format!(
        "ID {} | {} {} - {} [{}]",
        meeting.id,
        format_date(meeting.date),
        meeting.window,
        meeting.title,
        meeting.status
    )
}

pub fn meetings(meetings: &[(Meeting, MeetingRole)]) -> String {
    if meetings.is_empty() {
        return "You have no meetings. Create one with /create_meeting.".to_string();
    }
    let mut text = String::from("Your meetings:\n\n");
    for (meeting, role) in meetings {
        let _ = writeln!(text, "{} ({})", meeting_line(meeting), role_label(role));
    }
    text.push_str("\nDetails: /meeting <id>");
    text
}

pub fn meeting_detail(meeting: &Meeting, participants: &[(Participant, User)]) -> String {
    let mut text = format!(
        "Meeting {}\nTitle: {}\nDate: {}\nTime: {}\nStatus: {}",
        meeting.id,
        meeting.title,
        format_date(meeting.date),
        meeting.window,
        meeting.status
    );
    if let Some(description) = &meeting.description {
        let _ = write!(text, "\nDescription: {}", description);
    }
    text.push_str("\n\nParticipants:");
    for (participant, user) in participants {
        let marker = match participant.status {
            ParticipantStatus::Confirmed => "+",
            ParticipantStatus::Declined => "-",
            ParticipantStatus::Pending => "?",
        };
        let organizer = if user.id == meeting.organizer { ", organizer" } else { "" };
        let _ = write!(
            text,
            "\n{} {} (id {}{}): {}",
            marker,
            user.display_name(),
            user.id,
            organizer,
            participant.status
        );
    }
    text
}

pub fn invitations(pending: &[(Meeting, User)]) -> String {
    if pending.is_empty() {
        return "You have no pending invitations.".to_string();
    }
    let mut text = String::from("Pending invitations:\n");
    for (meeting, organizer) in pending {
        let _ = write!(
            text,
            "\n{}\nFrom: {}\nConfirm: /confirm_meeting_{}\nDecline: /decline_meeting_{}\n",
            meeting_line(meeting),
            organizer.display_name(),
            meeting.id,
            meeting.id
        );
    }
    text
}

pub fn notifications(feed: &NotificationFeed) -> String {
    if feed.items.is_empty() {
        return "You have no notifications.".to_string();
    }
    let mut text = format!("Notifications ({} unread):\n", feed.unread);
    for item in &feed.items {
        let marker = if item.is_read() { " " } else { "*" };
        let _ = write!(
            text,
            "\n{} #{} {} [{}]\n{}\n",
            marker,
            item.id,
            item.sent_at.format("%d.%m.%Y %H:%M"),
            item.kind,
            item.message
        );
    }
    text.push_str("\nMark one as read: /read_notification <id>");
    text
}

pub fn availability(user: UserId, date: NaiveDate, window: &TimeWindow, outcome: &Availability) -> String {
    let when = format!("{} {}", format_date(date), window);
    match outcome {
        Availability::Free => format!("User {} is free on {}.", user, when),
        Availability::UnknownUser => format!("User {} is not registered, so they cannot be invited.", user),
        Availability::Busy(conflicts) => {
            let mut text = format!("User {} is busy on {}:", user, when);
            for conflict in conflicts {
                match conflict {
                    Conflict::AllDay(event) => {
                        let _ = write!(text, "\n- calendar event: {}", event.title);
                    }
                    Conflict::Meeting(meeting) => {
                        let _ = write!(text, "\n- meeting {} {}", meeting.window, meeting.title);
                    }
                }
            }
            text
        }
    }
}

pub fn profile(user: &User, events: u32, meetings: &HashMap<MeetingStatus, u32>, unread: u32) -> String {
    let count = |status: MeetingStatus| meetings.get(&status).copied().unwrap_or(0);
    let mut text = format!("Profile\n\nName: {}\nId: {}", user.display_name(), user.id);
    if let Some(username) = &user.username {
        let _ = write!(text, "\nUsername: @{}", username);
    }
    let _ = write!(
        text,
        "\nRegistered: {}\n\nEvents: {}\nMeetings: {} pending, {} confirmed, {} cancelled\nUnread notifications: {}",
        user.registered_at.format("%d.%m.%Y"),
        events,
        count(MeetingStatus::Pending),
        count(MeetingStatus::Confirmed),
        count(MeetingStatus::Cancelled),
        unread
    );
    text
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeZone, Utc};
    use meetbot_models::{EventId, MeetingId, Visibility};

    use super::*;

    fn event(description: Option<&str>, visibility: Visibility) -> CalendarEvent {
        let stamp = Utc.with_ymd_and_hms(2024, 12, 1, 8, 0, 0).unwrap();
        CalendarEvent {
            id: EventId(5),
            owner: UserId(1),
            date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
            title: "Party".into(),
            description: description.map(str::to_string),
            visibility,
            published_at: (visibility == Visibility::Public).then_some(stamp),
            created_at: stamp,
            updated_at: stamp,
        }
    }

    #[test]
    fn test_event_line_marks_public() {
        assert_eq!(event_line(&event(None, Visibility::Private)), "ID 5 | 25.12.2024 - Party");
        assert!(event_line(&event(None, Visibility::Public)).ends_with("[public]"));
    }

    #[test]
    fn test_list_truncates_long_descriptions() {
        let long = "x".repeat(80);
        let text = event_list("Your events:", &[event(Some(&long), Visibility::Private)], "none");
        assert!(text.contains(&format!("{}...", "x".repeat(50))));
        assert!(!text.contains(&"x".repeat(51)));
        assert_eq!(event_list("Your events:", &[], "none"), "none");
    }

    #[test]
    fn test_busy_availability_lists_conflicts() {
        let stamp = Utc.with_ymd_and_hms(2024, 12, 1, 8, 0, 0).unwrap();
        let window = TimeWindow::new(
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        )
        .unwrap();
        let meeting = Meeting {
            id: MeetingId(2),
            organizer: UserId(4),
            title: "Sync".into(),
            description: None,
            date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
            window,
            status: MeetingStatus::Confirmed,
            created_at: stamp,
            updated_at: stamp,
        };
        let text = availability(
            UserId(3),
            meeting.date,
            &window,
            &Availability::Busy(vec![Conflict::Meeting(meeting.clone())]),
        );
        assert!(text.starts_with("User 3 is busy on 25.12.2024 14:00-15:00"));
        assert!(text.contains("meeting 14:00-15:00 Sync"));
    }
}
