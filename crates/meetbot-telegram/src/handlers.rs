//! Command handlers for the Telegram bot.
//!
//! Handlers only translate between Telegram updates and [`BotState`]:
//! they build the sender's profile, classify the message and send back
//! the single reply.

use std::sync::{Arc, OnceLock};

use meetbot_models::{InvitationResponse, MeetingId, UserProfile};
use regex::Regex;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::state::{BotState, Inbound};

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "Register and get started")]
    Start,

    #[command(description = "Show this help")]
    Help,

    #[command(description = "Show your id, which others need to invite you")]
    MyId,

    #[command(description = "Show your profile and counters")]
    Profile,

    #[command(description = "Create an event")]
    Create,

    #[command(description = "Show an event: /read <id>")]
    Read(String),

    #[command(description = "Edit an event: /update <id> or /update <id> \"title\" \"description\"")]
    Update(String),

    #[command(description = "Delete an event: /delete <id>")]
    Delete(String),

    #[command(description = "List your events")]
    List,

    #[command(description = "Show today's events")]
    Today,

    #[command(description = "Events on a date: /events DD.MM.YYYY")]
    Events(String),

    #[command(description = "Event statistics")]
    Stats,

    #[command(description = "Create a meeting and invite participants")]
    CreateMeeting,

    #[command(description = "List your meetings")]
    Meetings,

    #[command(description = "Meeting details: /meeting <id>")]
    Meeting(String),

    #[command(description = "Show pending invitations")]
    Invitations,

    #[command(description = "Accept an invitation: /confirm <meeting id>")]
    Confirm(String),

    #[command(description = "Decline an invitation: /decline <meeting id>")]
    Decline(String),

    #[command(description = "Show your notifications")]
    Notifications,

    #[command(description = "Mark a notification read: /read_notification <id>")]
    ReadNotification(String),

    #[command(description = "Check if a user is free: /check_availability <user id> <DD.MM.YYYY> <HH:MM> [HH:MM]")]
    CheckAvailability(String),

    #[command(description = "Publish an event: /share [id]")]
    Share(String),

    #[command(description = "Make an event private again: /unshare [id]")]
    Unshare(String),

    #[command(description = "Public events of other users")]
    Shared,

    #[command(description = "Public events of one user: /shared_by <user id>")]
    SharedBy(String),

    #[command(description = "Publishing statistics")]
    ShareStats,

    #[command(description = "Export your data")]
    Export,

    #[command(description = "Export everything as JSON")]
    ExportQuick,

    #[command(description = "Skip an optional step")]
    Skip,

    #[command(description = "Cancel the current action")]
    Cancel,
}

fn respond_re() -> &'static Regex {
    static RESPOND_RE: OnceLock<Regex> = OnceLock::new();
    RESPOND_RE.get_or_init(|| {
        Regex::new(r"^/(confirm|decline)_meeting_(\d+)(?:@\w+)?$").expect("respond pattern is valid")
    })
}

/// Classify a slash command that did not parse as a [`Command`].
pub fn classify_unparsed(text: &str) -> Inbound {
    let head = text.split_whitespace().next().unwrap_or(text);
    match respond_re().captures(head) {
        Some(caps) => {
            let response = match &caps[1] {
                "confirm" => InvitationResponse::Confirm,
                _ => InvitationResponse::Decline,
            };
            match caps[2].parse::<MeetingId>() {
                Ok(meeting) => Inbound::Respond { meeting, response },
                Err(_) => Inbound::UnknownCommand(text.to_string()),
            }
        }
        None => Inbound::UnknownCommand(text.to_string()),
    }
}

/// Profile of the sender of `msg`, if it has one.
pub fn sender_profile(msg: &Message) -> Option<UserProfile> {
    let user = msg.from.as_ref()?;
    Some(UserProfile {
        id: (user.id.0 as i64).into(),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
        language_code: user.language_code.clone(),
    })
}

async fn reply(bot: &Bot, msg: &Message, state: &BotState, inbound: Inbound) -> ResponseResult<()> {
    let Some(profile) = sender_profile(msg) else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    let answer = state.handle(&profile, inbound).await;
    if let Err(e) = bot.send_message(msg.chat.id, &answer.text).await {
        warn!(chat_id = %msg.chat.id, error = %e, "Failed to send reply");
        return Err(e);
    }
    Ok(())
}

/// Handle a parsed command.
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    info!(chat_id = %msg.chat.id, command = ?cmd, "Command received");
    reply(&bot, &msg, &state, Inbound::Command(cmd)).await
}

/// Handle a slash command that did not parse: respond shortcuts or unknown.
pub async fn handle_unparsed(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let inbound = classify_unparsed(text);
    debug!(chat_id = %msg.chat.id, inbound = ?inbound, "Unparsed command classified");
    reply(&bot, &msg, &state, inbound).await
}

/// Handle a plain text message, usually a dialog answer.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let inbound = Inbound::Text(text.to_string());
    reply(&bot, &msg, &state, inbound).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_shortcuts() {
        assert_eq!(
            classify_unparsed("/confirm_meeting_42"),
            Inbound::Respond {
                meeting: MeetingId(42),
                response: InvitationResponse::Confirm,
            }
        );
        assert_eq!(
            classify_unparsed("/decline_meeting_7@meetbot"),
            Inbound::Respond {
                meeting: MeetingId(7),
                response: InvitationResponse::Decline,
            }
        );
        assert!(matches!(classify_unparsed("/confirm_meeting_x"), Inbound::UnknownCommand(_)));
        assert!(matches!(classify_unparsed("/frobnicate"), Inbound::UnknownCommand(_)));
    }

    #[test]
    fn test_commands_parse_snake_case() {
        assert_eq!(Command::parse("/my_id", "meetbot").unwrap(), Command::MyId);
        assert_eq!(
            Command::parse("/check_availability 5 25.12.2024 14:00", "meetbot").unwrap(),
            Command::CheckAvailability("5 25.12.2024 14:00".into())
        );
        assert_eq!(Command::parse("/share", "meetbot").unwrap(), Command::Share(String::new()));
    }
}
