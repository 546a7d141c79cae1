//! Shared state for the Telegram bot.
//!
//! [`BotState::handle`] is the single entry point for inbound traffic. It
//! registers the sender, takes the sender's session lock for the whole
//! message, routes the message and always produces exactly one reply.
//! Nothing in here depends on the Telegram transport, so every command can
//! be driven from tests.

use std::sync::Arc;

use chrono::Utc;
use meetbot_core::{
    availability, build_descriptor, run_blocking, CoreError, Dispatched, ExportRequest, MeetingOrchestrator,
    MeetingRequest, Messenger, NotificationDispatcher, Settings,
};
use meetbot_models::{
    format_date, parse_date, parse_time, EventId, EventPatch, InvitationResponse, MeetingId, NewEvent,
    NotificationId, TimeWindow, User, UserId, UserProfile, Visibility,
};
use meetbot_persistence::{CalendarStore, VisibilityOutcome};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dialog::{
    Action, Candidate, CreateEventDialog, CreateMeetingDialog, Dialog, ExportDialog, MeetingDraft, Step,
    UpdateEventDialog, VisibilityDialog, SKIP,
};
use crate::handlers::Command;
use crate::render;
use crate::session::{ConversationSession, SessionManager};

/// Reply for failures the user cannot act on.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";

/// Last hour:minute of a day, the default end of an availability check.
const END_OF_DAY: (u32, u32) = (23, 59);

/// One inbound message, already classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    /// `/confirm_meeting_<id>` and `/decline_meeting_<id>`.
    Respond {
        meeting: MeetingId,
        response: InvitationResponse,
    },
    /// A slash command no handler knows.
    UnknownCommand(String),
    Text(String),
}

/// The answer to one inbound message.
#[derive(Debug)]
pub struct Reply {
    pub text: String,
    /// Notification deliveries started while handling the message.
    pub deliveries: Vec<JoinHandle<bool>>,
}

impl Reply {
    fn with_dispatch(text: String, dispatched: Dispatched) -> Self {
        Self {
            text,
            deliveries: dispatched.deliveries,
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self {
            text,
            deliveries: Vec::new(),
        }
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::from(text.to_string())
    }
}

type Outcome = meetbot_core::Result<Reply>;

fn usage(example: &str) -> Outcome {
    Ok(format!("Usage: {}", example).into())
}

/// First whitespace-separated token of `arg`, parsed.
fn first_arg<T: std::str::FromStr>(arg: &str) -> Option<T> {
    arg.split_whitespace().next()?.parse().ok()
}

/// Split command arguments on whitespace, keeping double-quoted runs together.
fn split_args(arg: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in arg.chars() {
        match c {
            '"' => {
                if quoted {
                    tokens.push(std::mem::take(&mut current));
                } else if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Shared state for the bot, accessible across all handlers.
pub struct BotState {
    store: Arc<CalendarStore>,
    orchestrator: Arc<MeetingOrchestrator>,
    dispatcher: NotificationDispatcher,
    sessions: SessionManager,
    settings: Settings,
}

impl BotState {
    pub fn new(store: Arc<CalendarStore>, messenger: Arc<dyn Messenger>, settings: Settings) -> Self {
        Self {
            orchestrator: Arc::new(MeetingOrchestrator::new(Arc::clone(&store))),
            dispatcher: NotificationDispatcher::new(Arc::clone(&store), messenger),
            sessions: SessionManager::new(),
            store,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle one message from `profile`'s user.
    pub async fn handle(&self, profile: &UserProfile, inbound: Inbound) -> Reply {
        let user = match self.register(profile).await {
            Ok(user) => user,
            Err(e) => return failure(e),
        };

        let session = self.sessions.session(user.id);
        let mut session = session.lock().await;
        session.touch();

        let outcome = match inbound {
            Inbound::Command(command) => {
                debug!(user_id = %user.id, command = ?command, "Handling command");
                self.command(&user, &mut session, command).await
            }
            Inbound::Respond { meeting, response } => self.respond(&user, meeting, response).await,
            Inbound::UnknownCommand(text) => Ok(unknown_command(&session, &text)),
            Inbound::Text(text) => {
                if session.dialog.is_active() {
                    self.advance(&user, &mut session, &text).await
                } else {
                    Ok("I only understand commands here. Send /help to see them.".into())
                }
            }
        };
        outcome.unwrap_or_else(failure)
    }

    /// Run store work on the blocking pool.
    async fn with_store<T, F>(&self, work: F) -> meetbot_core::Result<T>
    where
        F: FnOnce(&CalendarStore) -> meetbot_persistence::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        run_blocking(move || work(&store)).await
    }

    /// Upsert the sender; refreshes their last-seen time.
    async fn register(&self, profile: &UserProfile) -> meetbot_core::Result<User> {
        let profile = profile.clone();
        self.with_store(move |store| store.upsert_user(&profile, Utc::now())).await
    }

    async fn command(&self, user: &User, session: &mut ConversationSession, command: Command) -> Outcome {
        match command {
            Command::Start => self.start(user).await,
            Command::Help => Ok(help_text().into()),
            Command::MyId => Ok(format!(
                "Your id: {}\nShare it so other users can invite you to meetings.",
                user.id
            )
            .into()),
            Command::Profile => self.profile(user).await,
            Command::Create => {
                let dialog = CreateEventDialog::default();
                let prompt = dialog.prompt();
                session.dialog = Dialog::CreateEvent(dialog);
                Ok(prompt.into())
            }
            Command::Read(arg) => self.read_event(user, &arg).await,
            Command::Update(arg) => self.update_event(user, session, &arg).await,
            Command::Delete(arg) => self.delete_event(user, &arg).await,
            Command::List => {
                let owner = user.id;
                let events = self.with_store(move |store| store.list_events(owner)).await?;
                Ok(render::event_list("Your events:", &events, "You have no events yet. Create one with /create.").into())
            }
            Command::Today => {
                let owner = user.id;
                let today = Utc::now().date_naive();
                let events = self.with_store(move |store| store.events_on(owner, today)).await?;
                Ok(render::event_list(
                    &format!("Today, {}:", format_date(today)),
                    &events,
                    "No events today.",
                )
                .into())
            }
            Command::Events(arg) => {
                let Ok(date) = parse_date(&arg) else {
                    return usage("/events DD.MM.YYYY");
                };
                let owner = user.id;
                let events = self.with_store(move |store| store.events_on(owner, date)).await?;
                Ok(render::event_list(
                    &format!("Events on {}:", format_date(date)),
                    &events,
                    &format!("No events on {}.", format_date(date)),
                )
                .into())
            }
            Command::Stats => {
                let owner = user.id;
                let today = Utc::now().date_naive();
                let stats = self.with_store(move |store| store.event_stats(owner, today)).await?;
                Ok(render::stats(&stats).into())
            }
            Command::CreateMeeting => {
                let dialog = CreateMeetingDialog::default();
                let prompt = dialog.prompt();
                session.dialog = Dialog::CreateMeeting(dialog);
                Ok(prompt.into())
            }
            Command::Meetings => {
                let id = user.id;
                let meetings = self.with_store(move |store| store.meetings_for(id)).await?;
                Ok(render::meetings(&meetings).into())
            }
            Command::Meeting(arg) => self.meeting_detail(user, &arg).await,
            Command::Invitations => {
                let id = user.id;
                let pending = self.with_store(move |store| store.pending_invitations(id)).await?;
                Ok(render::invitations(&pending).into())
            }
            Command::Confirm(arg) => match first_arg::<MeetingId>(&arg) {
                Some(meeting) => self.respond(user, meeting, InvitationResponse::Confirm).await,
                None => usage("/confirm <meeting id>"),
            },
            Command::Decline(arg) => match first_arg::<MeetingId>(&arg) {
                Some(meeting) => self.respond(user, meeting, InvitationResponse::Decline).await,
                None => usage("/decline <meeting id>"),
            },
            Command::Notifications => {
                let feed = self.dispatcher.feed(user.id).await?;
                Ok(render::notifications(&feed).into())
            }
            Command::ReadNotification(arg) => {
                let Some(id) = first_arg::<NotificationId>(&arg) else {
                    return usage("/read_notification <notification id>");
                };
                Ok(match self.dispatcher.mark_read(user.id, id).await? {
                    Some(_) => format!("Notification {} marked as read.", id),
                    None => format!("Notification {} not found.", id),
                }
                .into())
            }
            Command::CheckAvailability(arg) => self.check_availability(&arg).await,
            Command::Share(arg) => self.start_visibility(user, session, Visibility::Public, &arg).await,
            Command::Unshare(arg) => self.start_visibility(user, session, Visibility::Private, &arg).await,
            Command::Shared => {
                let viewer = user.id;
                let events = self.with_store(move |store| store.public_events_excluding(viewer)).await?;
                Ok(render::shared_events(&events).into())
            }
            Command::SharedBy(arg) => self.shared_by(&arg).await,
            Command::ShareStats => {
                let owner = user.id;
                let since = Utc::now() - chrono::Duration::days(7);
                let stats = self.with_store(move |store| store.share_stats(owner, since)).await?;
                Ok(render::share_stats(&stats).into())
            }
            Command::Export => self.start_export(user, session).await,
            Command::ExportQuick => {
                let descriptor = build_descriptor(&self.settings.export_base_url, user.id, ExportRequest::quick())?;
                Ok(descriptor.describe().into())
            }
            Command::Skip => {
                if session.dialog.is_active() {
                    self.advance(user, session, SKIP).await
                } else {
                    Ok("Nothing to skip right now.".into())
                }
            }
            Command::Cancel => {
                if session.dialog.is_active() {
                    info!(user_id = %user.id, dialog = ?session.dialog.kind(), "Dialog cancelled");
                    session.reset();
                    Ok("Action cancelled.".into())
                } else {
                    Ok("No active action to cancel.".into())
                }
            }
        }
    }

    /// Feed a reply to the dialog in progress.
    async fn advance(&self, user: &User, session: &mut ConversationSession, input: &str) -> Outcome {
        match session.dialog.feed(input) {
            Step::Prompt(text) | Step::Retry(text) | Step::Abort(text) => Ok(text.into()),
            Step::Done(action) => self.execute(user, action).await,
        }
    }

    /// Run the operation a finished dialog collected.
    async fn execute(&self, user: &User, action: Action) -> Outcome {
        let owner = user.id;
        match action {
            Action::CreateEvent(new) => self.create_event(owner, new).await,
            Action::CreateMeeting(draft) => self.create_meeting(owner, draft).await,
            Action::UpdateEvent { event, patch } => self.apply_patch(owner, event, patch).await,
            Action::SetVisibility { event, target } => {
                let outcome = self
                    .with_store(move |store| store.set_visibility(owner, event, target, Utc::now()))
                    .await?;
                Ok(match (outcome, target) {
                    (VisibilityOutcome::Changed(_), Visibility::Public) => {
                        format!("Event {} is now public. Other users can see it with /shared.", event)
                    }
                    (VisibilityOutcome::Changed(_), Visibility::Private) => {
                        format!("Event {} is now private.", event)
                    }
                    (VisibilityOutcome::AlreadySet(_), Visibility::Public) => {
                        format!("Event {} is already public.", event)
                    }
                    (VisibilityOutcome::AlreadySet(_), Visibility::Private) => {
                        format!("Event {} is already private.", event)
                    }
                    (VisibilityOutcome::NotFound, _) => format!("Event {} not found.", event),
                }
                .into())
            }
            Action::Export(request) => {
                let descriptor = build_descriptor(&self.settings.export_base_url, owner, request)?;
                Ok(descriptor.describe().into())
            }
        }
    }

    async fn start(&self, user: &User) -> Outcome {
        let users = self.with_store(|store| store.count_users()).await?;
        Ok(format!(
            "Hello, {}!\n\n\
             I keep your calendar and help arrange meetings with other users.\n\
             Registered users: {}\n\n\
             Your id is {}. Share it so others can invite you.\n\
             Send /help to see all commands.",
            user.display_name(),
            users,
            user.id
        )
        .into())
    }

    async fn profile(&self, user: &User) -> Outcome {
        let id = user.id;
        let (events, meetings) = self
            .with_store(move |store| Ok((store.count_events(id)?, store.meeting_counts(id)?)))
            .await?;
        let feed = self.dispatcher.feed(id).await?;
        Ok(render::profile(user, events, &meetings, feed.unread).into())
    }

    async fn create_event(&self, owner: UserId, new: NewEvent) -> Outcome {
        let event = self
            .with_store(move |store| store.insert_event(owner, &new, Utc::now()))
            .await?;
        info!(user_id = %owner, event_id = %event.id, "Event created");
        Ok(format!("Event created!\n\n{}", render::event_detail(&event)).into())
    }

    async fn read_event(&self, user: &User, arg: &str) -> Outcome {
        let Some(id) = first_arg::<EventId>(arg) else {
            return usage("/read <event id>");
        };
        let owner = user.id;
        Ok(match self.with_store(move |store| store.get_event(owner, id)).await? {
            Some(event) => render::event_detail(&event),
            None => format!("Event {} not found.", id),
        }
        .into())
    }

    async fn update_event(&self, user: &User, session: &mut ConversationSession, arg: &str) -> Outcome {
        let tokens = split_args(arg);
        let Some(id) = tokens.first().and_then(|t| t.parse::<EventId>().ok()) else {
            return usage("/update <event id> [\"new title\" \"new description\"]");
        };

        if tokens.len() >= 2 {
            let description = tokens[2..].join(" ");
            let patch = EventPatch {
                title: Some(tokens[1].clone()).filter(|title| !title.is_empty()),
                description: (!description.is_empty()).then_some(description),
            };
            return self.apply_patch(user.id, id, patch).await;
        }

        let owner = user.id;
        match self.with_store(move |store| store.get_event(owner, id)).await? {
            Some(event) => {
                let (dialog, intro) = UpdateEventDialog::new(&event);
                session.dialog = Dialog::UpdateEvent(dialog);
                Ok(intro.into())
            }
            None => Ok(format!("Event {} not found.", id).into()),
        }
    }

    async fn apply_patch(&self, owner: UserId, id: EventId, patch: EventPatch) -> Outcome {
        if patch.is_empty() {
            return Ok("Nothing to update.".into());
        }
        let updated = self
            .with_store(move |store| store.update_event(owner, id, &patch, Utc::now()))
            .await?;
        Ok(match updated {
            Some(event) => format!("Event updated.\n\n{}", render::event_detail(&event)),
            None => format!("Event {} not found.", id),
        }
        .into())
    }

    async fn delete_event(&self, user: &User, arg: &str) -> Outcome {
        let Some(id) = first_arg::<EventId>(arg) else {
            return usage("/delete <event id>");
        };
        let owner = user.id;
        let deleted = self
            .with_store(move |store| store.delete_event(owner, id, Utc::now()))
            .await?;
        Ok(match deleted {
            Some(event) => {
                info!(user_id = %owner, event_id = %id, "Event deleted");
                format!("Event {} '{}' deleted.", id, event.title)
            }
            None => format!("Event {} not found.", id),
        }
        .into())
    }

    async fn create_meeting(&self, organizer: UserId, draft: MeetingDraft) -> Outcome {
        let request = MeetingRequest {
            organizer,
            title: draft.title,
            description: draft.description,
            date: draft.date,
            start: draft.start,
            end: draft.end,
            participants: draft.participants,
        };
        let orchestrator = Arc::clone(&self.orchestrator);
        let created = run_blocking(move || orchestrator.create_meeting(&request, Utc::now())).await?;

        let text = format!("{}\nMeeting id: {}", created.summary(), created.meeting.id);
        let dispatched = self.dispatcher.dispatch(created.notices).await;
        Ok(Reply::with_dispatch(text, dispatched))
    }

    async fn respond(&self, user: &User, meeting: MeetingId, response: InvitationResponse) -> Outcome {
        let orchestrator = Arc::clone(&self.orchestrator);
        let responder = user.id;
        let recorded =
            run_blocking(move || orchestrator.respond(responder, meeting, response, Utc::now())).await?;

        let text = recorded.summary();
        let dispatched = self.dispatcher.dispatch(recorded.notices).await;
        Ok(Reply::with_dispatch(text, dispatched))
    }

    async fn meeting_detail(&self, user: &User, arg: &str) -> Outcome {
        let Some(id) = first_arg::<MeetingId>(arg) else {
            return usage("/meeting <meeting id>");
        };
        let (meeting, participants) = self
            .with_store(move |store| {
                let Some(meeting) = store.get_meeting(id)? else {
                    return Ok((None, Vec::new()));
                };
                Ok((Some(meeting), store.participants(id)?))
            })
            .await?;

        let viewer = user.id;
        match meeting {
            Some(meeting)
                if meeting.organizer == viewer || participants.iter().any(|(_, u)| u.id == viewer) =>
            {
                Ok(render::meeting_detail(&meeting, &participants).into())
            }
            _ => Err(CoreError::MeetingNotFound(id)),
        }
    }

    async fn check_availability(&self, arg: &str) -> Outcome {
        const EXAMPLE: &str = "/check_availability <user id> <DD.MM.YYYY> <HH:MM> [HH:MM]\n\
                               Example: /check_availability 123456 25.12.2024 14:00 15:00";
        let tokens: Vec<&str> = arg.split_whitespace().collect();
        if tokens.len() < 3 {
            return usage(EXAMPLE);
        }
        let Ok(target) = tokens[0].parse::<UserId>() else {
            return Ok("The user id must be a number.".into());
        };
        let Ok(date) = parse_date(tokens[1]) else {
            return Ok("Invalid date format. Use DD.MM.YYYY.".into());
        };
        let Ok(start) = parse_time(tokens[2]) else {
            return Ok("Invalid start time. Use HH:MM.".into());
        };
        let end = match tokens.get(3) {
            Some(raw) => match parse_time(raw) {
                Ok(end) => end,
                Err(_) => return Ok("Invalid end time. Use HH:MM.".into()),
            },
            None => chrono::NaiveTime::from_hms_opt(END_OF_DAY.0, END_OF_DAY.1, 0).unwrap_or(start),
        };
        let window = TimeWindow::new(start, end).map_err(CoreError::InvalidWindow)?;

        let store = Arc::clone(&self.store);
        let outcome = run_blocking(move || availability::check(&store, target, date, &window)).await?;
        Ok(render::availability(target, date, &window, &outcome).into())
    }

    async fn start_visibility(
        &self,
        user: &User,
        session: &mut ConversationSession,
        target: Visibility,
        arg: &str,
    ) -> Outcome {
        let owner = user.id;
        let command = match target {
            Visibility::Public => "/share",
            Visibility::Private => "/unshare",
        };

        if !arg.trim().is_empty() {
            let Some(id) = first_arg::<EventId>(arg) else {
                return usage(&format!("{} [event id]", command));
            };
            let Some(event) = self.with_store(move |store| store.get_event(owner, id)).await? else {
                return Ok(format!("Event {} not found.", id).into());
            };
            if event.visibility == target {
                let state = if event.is_public() { "public" } else { "private" };
                return Ok(format!("Event {} is already {}.", id, state).into());
            }
            let dialog = VisibilityDialog::confirm(target, id, Candidate::from(&event).title);
            let prompt = dialog.prompt();
            session.dialog = Dialog::Visibility(dialog);
            return Ok(prompt.into());
        }

        let source = match target {
            Visibility::Public => Visibility::Private,
            Visibility::Private => Visibility::Public,
        };
        let events = self
            .with_store(move |store| store.events_with_visibility(owner, source))
            .await?;
        if events.is_empty() {
            return Ok(match target {
                Visibility::Public => "You have no private events to publish. Create one with /create.",
                Visibility::Private => "You have no public events.",
            }
            .into());
        }

        let candidates = events.iter().map(Candidate::from).collect();
        let (dialog, listing) = VisibilityDialog::select(target, candidates);
        session.dialog = Dialog::Visibility(dialog);
        Ok(listing.into())
    }

    async fn shared_by(&self, arg: &str) -> Outcome {
        let Some(owner) = first_arg::<UserId>(arg) else {
            return usage("/shared_by <user id>");
        };
        let (user, events) = self
            .with_store(move |store| Ok((store.get_user(owner)?, store.public_events_of(owner)?)))
            .await?;
        let Some(user) = user else {
            return Ok(format!("User {} not found.", owner).into());
        };
        Ok(render::event_list(
            &format!("Public events of {}:", user.display_name()),
            &events,
            &format!("{} has no public events.", user.display_name()),
        )
        .into())
    }

    async fn start_export(&self, user: &User, session: &mut ConversationSession) -> Outcome {
        let id = user.id;
        let (events, meetings) = self
            .with_store(move |store| Ok((store.count_events(id)?, store.meetings_for(id)?.len())))
            .await?;
        if events == 0 && meetings == 0 {
            return Ok("You have no events or meetings to export yet.".into());
        }
        let dialog = ExportDialog::default();
        let prompt = dialog.prompt();
        session.dialog = Dialog::Export(dialog);
        Ok(prompt.into())
    }

    /// Drop idle sessions and expire stale invitations, as configured.
    ///
    /// Returns the number of sessions dropped and invitations expired.
    pub async fn maintain(&self) -> (usize, usize) {
        let reaped = match self.settings.session_idle_timeout {
            Some(max_idle) => self.sessions.reap_idle(max_idle),
            None => 0,
        };

        let mut expired = 0;
        if let Some(ttl) = self.settings.invitation_ttl {
            match chrono::Duration::from_std(ttl) {
                Ok(ttl) => {
                    let orchestrator = Arc::clone(&self.orchestrator);
                    let now = Utc::now();
                    match run_blocking(move || orchestrator.expire_stale_invitations(now - ttl, now)).await {
                        Ok(notices) => {
                            // Two notices per expired invitation.
                            expired = notices.len() / 2;
                            self.dispatcher.dispatch(notices).await;
                        }
                        Err(e) => warn!(error = %e, "Failed to expire stale invitations"),
                    }
                }
                Err(e) => warn!(error = %e, "Invitation TTL out of range"),
            }
        }

        if reaped > 0 || expired > 0 {
            info!(sessions = reaped, invitations = expired, "Maintenance pass");
        }
        (reaped, expired)
    }
}

fn unknown_command(session: &ConversationSession, text: &str) -> Reply {
    if session.dialog.is_active() {
        return "Finish the current action or send /cancel first.".into();
    }
    let name = text.split_whitespace().next().unwrap_or(text);
    format!("Unknown command: {}\n\nUse /help to see available commands.", name).into()
}

fn help_text() -> String {
    use teloxide::utils::command::BotCommands;

    format!(
        "{}\n\nAnswer an invitation with /confirm_meeting_<id> or /decline_meeting_<id>.\n\
         Dates are DD.MM.YYYY, times are HH:MM.",
        Command::descriptions()
    )
}

/// Map an error to the single reply the user gets.
fn failure(err: CoreError) -> Reply {
    if err.is_user_facing() {
        err.to_string().into()
    } else {
        error!(error = %err, "Request failed");
        GENERIC_FAILURE.into()
    }
}
