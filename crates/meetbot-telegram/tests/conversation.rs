use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use meetbot_core::{DeliveryError, Messenger, Settings};
use meetbot_models::{
    InvitationResponse, MeetingId, MeetingStatus, NewEvent, UserId, UserProfile, Visibility,
};
use meetbot_persistence::CalendarStore;
use meetbot_telegram::{BotState, Command, DialogKind, Inbound, Reply};

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(UserId, String)>>,
}

impl RecordingMessenger {
    fn sent_to(&self, user: UserId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, user: UserId, text: &str) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push((user, text.to_string()));
        Ok(())
    }
}

struct Harness {
    state: BotState,
    store: Arc<CalendarStore>,
    messenger: Arc<RecordingMessenger>,
}

impl Harness {
    fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(CalendarStore::open_in_memory().unwrap());
        let messenger = Arc::new(RecordingMessenger::default());
        let state = BotState::new(store.clone(), messenger.clone(), settings);
        Self {
            state,
            store,
            messenger,
        }
    }

    async fn send(&self, who: &UserProfile, inbound: Inbound) -> Reply {
        self.state.handle(who, inbound).await
    }

    async fn command(&self, who: &UserProfile, command: Command) -> String {
        self.send(who, Inbound::Command(command)).await.text
    }

    async fn text(&self, who: &UserProfile, text: &str) -> String {
        self.send(who, Inbound::Text(text.to_string())).await.text
    }

    async fn kind(&self, who: &UserProfile) -> DialogKind {
        self.state.sessions().kind(who.id).await
    }
}

fn alice() -> UserProfile {
    UserProfile::bare(100).with_first_name("Alice")
}

fn bob() -> UserProfile {
    UserProfile::bare(200).with_first_name("Bob")
}

fn carol() -> UserProfile {
    UserProfile::bare(300).with_first_name("Carol")
}

fn christmas() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()
}

async fn wait_deliveries(reply: Reply) -> usize {
    let mut delivered = 0;
    for handle in reply.deliveries {
        if handle.await.unwrap() {
            delivered += 1;
        }
    }
    delivered
}

#[tokio::test]
async fn cancel_mid_dialog_then_restart_from_first_step() {
    let h = Harness::new();
    let a = alice();

    assert!(h.command(&a, Command::Create).await.contains("event date"));
    assert!(h.text(&a, "25.12.2024").await.contains("title"));
    assert_eq!(h.command(&a, Command::Cancel).await, "Action cancelled.");
    assert_eq!(h.kind(&a).await, DialogKind::Idle);
    assert!(h.store.list_events(a.id).unwrap().is_empty());

    assert!(h.command(&a, Command::Create).await.contains("event date"));
    // Back at the date step: a title is not a date.
    assert!(h.text(&a, "Dinner").await.contains("Invalid date"));
    assert_eq!(h.kind(&a).await, DialogKind::CreatingEvent);
}

#[tokio::test]
async fn cancel_without_dialog() {
    let h = Harness::new();
    assert_eq!(h.command(&alice(), Command::Cancel).await, "No active action to cancel.");
}

#[tokio::test]
async fn starting_a_dialog_replaces_the_current_one() {
    let h = Harness::new();
    let a = alice();

    h.command(&a, Command::Create).await;
    h.text(&a, "25.12.2024").await;
    assert!(h.command(&a, Command::CreateMeeting).await.contains("meeting date"));
    assert_eq!(h.kind(&a).await, DialogKind::CreatingMeeting);

    // The meeting dialog starts at its own first step.
    assert!(h.text(&a, "Dinner").await.contains("Invalid date"));
}

#[tokio::test]
async fn other_commands_keep_the_dialog() {
    let h = Harness::new();
    let a = alice();

    h.command(&a, Command::Create).await;
    assert!(h.command(&a, Command::MyId).await.contains("100"));
    assert_eq!(
        h.send(&a, Inbound::UnknownCommand("/frobnicate".into())).await.text,
        "Finish the current action or send /cancel first."
    );
    assert_eq!(h.kind(&a).await, DialogKind::CreatingEvent);

    h.command(&a, Command::Cancel).await;
    assert!(h
        .send(&a, Inbound::UnknownCommand("/frobnicate now".into()))
        .await
        .text
        .starts_with("Unknown command: /frobnicate"));
}

#[tokio::test]
async fn create_event_with_skipped_description() {
    let h = Harness::new();
    let a = alice();

    h.command(&a, Command::Create).await;
    h.text(&a, "25.12.2024").await;
    h.text(&a, "Dinner").await;
    let reply = h.command(&a, Command::Skip).await;

    assert!(reply.starts_with("Event created!"));
    let events = h.store.list_events(a.id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Dinner");
    assert_eq!(events[0].description, None);
    assert_eq!(h.kind(&a).await, DialogKind::Idle);
}

#[tokio::test]
async fn update_inline_and_through_dialog() {
    let h = Harness::new();
    let a = alice();
    h.command(&a, Command::Start).await;
    let event = h
        .store
        .insert_event(
            a.id,
            &NewEvent {
                date: christmas(),
                title: "Dinner".into(),
                description: None,
            },
            Utc::now(),
        )
        .unwrap();

    let reply = h
        .command(&a, Command::Update(format!("{} \"Family dinner\" \"At grandma's\"", event.id)))
        .await;
    assert!(reply.starts_with("Event updated."));
    let stored = h.store.get_event(a.id, event.id).unwrap().unwrap();
    assert_eq!(stored.title, "Family dinner");
    assert_eq!(stored.description.as_deref(), Some("At grandma's"));

    assert!(h.command(&a, Command::Update(event.id.to_string())).await.contains("Family dinner"));
    h.command(&a, Command::Skip).await;
    assert_eq!(h.command(&a, Command::Skip).await, "Nothing to update.");

    assert_eq!(
        h.command(&bob(), Command::Update(event.id.to_string())).await,
        format!("Event {} not found.", event.id)
    );
}

#[tokio::test]
async fn publish_then_unpublish_keeps_publish_time() {
    let h = Harness::new();
    let a = alice();
    assert!(h
        .command(&a, Command::Share(String::new()))
        .await
        .starts_with("You have no private events"));

    let event = h
        .store
        .insert_event(
            a.id,
            &NewEvent {
                date: christmas(),
                title: "Party".into(),
                description: None,
            },
            Utc::now(),
        )
        .unwrap();

    let listing = h.command(&a, Command::Share(String::new())).await;
    assert!(listing.contains(&format!("ID {}", event.id)));
    assert!(h.text(&a, "999").await.contains("Invalid event id"));
    assert!(h.text(&a, &event.id.to_string()).await.contains("yes or no"));
    assert_eq!(h.text(&a, "maybe").await, "Please answer yes or no:");
    assert!(h.text(&a, "yes").await.contains("is now public"));

    let published = h.store.get_event(a.id, event.id).unwrap().unwrap();
    assert_eq!(published.visibility, Visibility::Public);
    let stamp = published.published_at;
    assert!(stamp.is_some());

    let shared = h.command(&bob(), Command::Shared).await;
    assert!(shared.contains("Party"));
    assert!(shared.contains("Alice"));

    assert!(h.command(&a, Command::Unshare(event.id.to_string())).await.contains("yes or no"));
    assert!(h.text(&a, "да").await.contains("is now private"));

    let private = h.store.get_event(a.id, event.id).unwrap().unwrap();
    assert_eq!(private.visibility, Visibility::Private);
    assert_eq!(private.published_at, stamp);
    assert!(h.command(&bob(), Command::Shared).await.starts_with("No other user"));
}

#[tokio::test]
async fn declining_the_confirmation_changes_nothing() {
    let h = Harness::new();
    let a = alice();
    h.command(&a, Command::Start).await;
    let event = h
        .store
        .insert_event(
            a.id,
            &NewEvent {
                date: christmas(),
                title: "Party".into(),
                description: None,
            },
            Utc::now(),
        )
        .unwrap();

    h.command(&a, Command::Share(event.id.to_string())).await;
    assert!(h.text(&a, "нет").await.starts_with("Cancelled."));
    assert_eq!(h.kind(&a).await, DialogKind::Idle);
    assert_eq!(
        h.store.get_event(a.id, event.id).unwrap().unwrap().visibility,
        Visibility::Private
    );
    assert_eq!(
        h.command(&a, Command::Unshare(event.id.to_string())).await,
        format!("Event {} is already private.", event.id)
    );
}

#[tokio::test]
async fn export_dialog_builds_link() {
    let h = Harness::new();
    let a = alice();
    assert_eq!(
        h.command(&a, Command::Export).await,
        "You have no events or meetings to export yet."
    );

    h.store
        .insert_event(
            a.id,
            &NewEvent {
                date: christmas(),
                title: "Dinner".into(),
                description: None,
            },
            Utc::now(),
        )
        .unwrap();

    h.command(&a, Command::Export).await;
    h.text(&a, "2").await;
    h.text(&a, "3").await;
    h.text(&a, "2").await;
    h.text(&a, "01.12.2024").await;
    assert!(h.text(&a, "30.11.2024").await.contains("cannot be before"));
    let reply = h.text(&a, "31.12.2024").await;

    assert!(reply.contains("http://localhost:8000/api/export/100/ical/?from=2024-12-01&to=2024-12-31&type=calendar"));
    assert_eq!(h.kind(&a).await, DialogKind::Idle);

    let quick = h.command(&a, Command::ExportQuick).await;
    assert!(quick.contains("http://localhost:8000/api/export/100/json/"));
}

async fn create_meeting(h: &Harness, organizer: &UserProfile, participants: &str) -> Reply {
    h.command(organizer, Command::CreateMeeting).await;
    h.text(organizer, "25.12.2024").await;
    h.text(organizer, "Planning").await;
    h.command(organizer, Command::Skip).await;
    h.text(organizer, "14:00").await;
    h.text(organizer, "15:00").await;
    h.send(organizer, Inbound::Text(participants.to_string())).await
}

fn only_meeting(h: &Harness, user: UserId) -> MeetingId {
    let meetings = h.store.meetings_for(user).unwrap();
    assert_eq!(meetings.len(), 1);
    meetings[0].0.id
}

#[tokio::test]
async fn meeting_negotiation_over_the_bot() {
    let h = Harness::new();
    let (a, b) = (alice(), bob());
    h.command(&b, Command::Start).await;

    let reply = create_meeting(&h, &a, "200, 999").await;
    assert!(reply.text.contains("Invitations sent to 1 participant(s)"));
    assert!(reply.text.contains("Not registered, skipped: 999."));
    assert_eq!(wait_deliveries(reply).await, 1);

    let meeting = only_meeting(&h, a.id);
    let invitation = h.messenger.sent_to(b.id);
    assert_eq!(invitation.len(), 1);
    assert!(invitation[0].contains(&format!("/confirm_meeting_{}", meeting)));
    assert!(h.command(&b, Command::Invitations).await.contains("Planning"));

    let answer = h
        .send(
            &b,
            Inbound::Respond {
                meeting,
                response: InvitationResponse::Confirm,
            },
        )
        .await;
    assert!(answer.text.contains("Meeting status: confirmed"));
    assert_eq!(wait_deliveries(answer).await, 2);
    assert_eq!(h.messenger.sent_to(a.id).len(), 1);

    assert_eq!(
        h.store.get_meeting(meeting).unwrap().unwrap().status,
        MeetingStatus::Confirmed
    );
    assert!(h.command(&a, Command::Meeting(meeting.to_string())).await.contains("Status: confirmed"));
    assert_eq!(
        h.command(&carol(), Command::Meeting(meeting.to_string())).await,
        format!("Meeting {} not found", meeting)
    );

    // Answering twice is refused.
    let again = h.command(&b, Command::Decline(meeting.to_string())).await;
    assert_eq!(
        again,
        format!("You are not invited to meeting {} or have already responded", meeting)
    );

    let busy = h
        .command(&a, Command::CheckAvailability("200 25.12.2024 14:30 15:30".into()))
        .await;
    assert!(busy.starts_with("User 200 is busy"));
    let free = h
        .command(&a, Command::CheckAvailability("200 25.12.2024 15:00".into()))
        .await;
    assert_eq!(free, "User 200 is free on 25.12.2024 15:00-23:59.");
}

#[tokio::test]
async fn busy_organizer_gets_one_reply_and_dialog_ends() {
    let h = Harness::new();
    let a = alice();
    h.command(&a, Command::Start).await;
    h.store
        .insert_event(
            a.id,
            &NewEvent {
                date: christmas(),
                title: "Holiday".into(),
                description: None,
            },
            Utc::now(),
        )
        .unwrap();

    let reply = create_meeting(&h, &a, "0").await;
    assert_eq!(reply.text, "You already have plans at this time");
    assert!(reply.deliveries.is_empty());
    assert!(h.store.meetings_for(a.id).unwrap().is_empty());
    assert_eq!(h.kind(&a).await, DialogKind::Idle);
}

#[tokio::test]
async fn meeting_without_participants_is_confirmed_at_once() {
    let h = Harness::new();
    let a = alice();

    let reply = create_meeting(&h, &a, "0").await;
    assert!(reply.text.contains("Invitations sent to 0 participant(s)"));
    assert!(reply.deliveries.is_empty());

    let meeting = only_meeting(&h, a.id);
    assert!(h.command(&a, Command::Meeting(meeting.to_string())).await.contains("Status: confirmed"));
    let busy = h
        .command(&a, Command::CheckAvailability("100 25.12.2024 14:30 15:30".into()))
        .await;
    assert!(busy.starts_with("User 100 is busy"));
}

#[tokio::test]
async fn notifications_can_be_marked_read() {
    let h = Harness::new();
    let (a, b) = (alice(), bob());
    h.command(&b, Command::Start).await;
    wait_deliveries(create_meeting(&h, &a, "200").await).await;

    let feed = h.command(&b, Command::Notifications).await;
    assert!(feed.contains("(1 unread)"));
    let id = h.store.recent_notifications(b.id, 10).unwrap().items[0].id;

    assert_eq!(
        h.command(&b, Command::ReadNotification(id.to_string())).await,
        format!("Notification {} marked as read.", id)
    );
    assert_eq!(
        h.command(&a, Command::ReadNotification(id.to_string())).await,
        format!("Notification {} not found.", id)
    );
    assert!(h.command(&b, Command::Notifications).await.contains("(0 unread)"));
}

#[tokio::test]
async fn maintenance_expires_invitations_and_drops_sessions() {
    let settings = Settings {
        session_idle_timeout: Some(Duration::ZERO),
        invitation_ttl: Some(Duration::ZERO),
        ..Settings::default()
    };
    let h = Harness::with_settings(settings);
    let (a, b) = (alice(), bob());
    h.command(&b, Command::Start).await;
    wait_deliveries(create_meeting(&h, &a, "200").await).await;
    h.command(&a, Command::Create).await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    let (sessions, invitations) = h.state.maintain().await;

    assert_eq!(sessions, 2);
    assert_eq!(invitations, 1);
    assert_eq!(h.kind(&a).await, DialogKind::Idle);
    let meeting = only_meeting(&h, a.id);
    assert_eq!(
        h.store.get_meeting(meeting).unwrap().unwrap().status,
        MeetingStatus::Confirmed
    );
}

#[tokio::test]
async fn read_and_delete_are_scoped_to_owner() {
    let h = Harness::new();
    let a = alice();
    h.command(&a, Command::Start).await;
    let event = h
        .store
        .insert_event(
            a.id,
            &NewEvent {
                date: christmas(),
                title: "Dinner".into(),
                description: None,
            },
            Utc::now(),
        )
        .unwrap();

    assert!(h.command(&a, Command::Read(event.id.to_string())).await.contains("Dinner"));
    assert_eq!(
        h.command(&bob(), Command::Delete(event.id.to_string())).await,
        format!("Event {} not found.", event.id)
    );
    assert_eq!(h.command(&a, Command::Read("abc".into())).await, "Usage: /read <event id>");
    assert!(h.command(&a, Command::Delete(event.id.to_string())).await.contains("deleted"));
    assert_eq!(
        h.command(&a, Command::Read(event.id.to_string())).await,
        format!("Event {} not found.", event.id)
    );
}
