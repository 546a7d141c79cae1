mod common;

use std::sync::Arc;

use common::{now, register, request, store, RecordingMessenger};
use meetbot_core::{MeetingOrchestrator, Notice, NotificationDispatcher};
use meetbot_models::{InvitationResponse, MeetingId, NotificationId, NotificationKind};

#[tokio::test]
async fn invitation_is_recorded_and_delivered() {
    let store = store();
    let organizer = register(&store, 1, "Olga");
    let participant = register(&store, 2, "Pavel");
    let messenger = Arc::new(RecordingMessenger::default());
    let dispatcher = NotificationDispatcher::new(store.clone(), messenger.clone());
    let orchestrator = MeetingOrchestrator::new(store.clone());

    let created = orchestrator
        .create_meeting(&request(organizer, (14, 0), (15, 0), vec![participant]), now())
        .unwrap();
    let dispatched = dispatcher.dispatch(created.notices).await;

    assert_eq!(dispatched.recorded.len(), 1);
    assert_eq!(dispatched.recorded[0].kind, NotificationKind::Invitation);
    assert_eq!(dispatched.delivered().await, 1);

    let texts = messenger.sent_to(participant);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains(&format!("/confirm_meeting_{}", created.meeting.id)));
    assert!(messenger.sent_to(organizer).is_empty());

    let feed = dispatcher.feed(participant).await.unwrap();
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.unread, 1);
}

#[tokio::test]
async fn delivery_failure_keeps_state_and_rows() {
    let store = store();
    let organizer = register(&store, 1, "Olga");
    let participant = register(&store, 2, "Pavel");
    let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(RecordingMessenger::failing()));
    let orchestrator = MeetingOrchestrator::new(store.clone());

    let created = orchestrator
        .create_meeting(&request(organizer, (14, 0), (15, 0), vec![participant]), now())
        .unwrap();
    let answered = orchestrator
        .respond(participant, created.meeting.id, InvitationResponse::Confirm, now())
        .unwrap();
    let dispatched = dispatcher.dispatch(answered.notices).await;

    assert_eq!(dispatched.recorded.len(), 2);
    assert_eq!(dispatched.delivered().await, 0);
    assert_eq!(dispatcher.feed(organizer).await.unwrap().items.len(), 1);
    assert_eq!(
        store.get_meeting(created.meeting.id).unwrap().unwrap().status,
        meetbot_models::MeetingStatus::Confirmed
    );
}

#[tokio::test]
async fn mark_read_is_scoped_and_keeps_first_timestamp() {
    let store = store();
    let organizer = register(&store, 1, "Olga");
    let other = register(&store, 2, "Pavel");
    let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(RecordingMessenger::default()));
    let created = MeetingOrchestrator::new(store.clone())
        .create_meeting(&request(organizer, (9, 0), (10, 0), vec![]), now())
        .unwrap();

    let (recorded, delivery) = dispatcher
        .notify(Notice::new(organizer, created.meeting.id, NotificationKind::Reminder, "Standup soon"))
        .await;
    assert!(delivery.await.unwrap());
    let id = recorded.unwrap().id;

    assert!(dispatcher.mark_read(other, id).await.unwrap().is_none());
    assert!(dispatcher.mark_read(organizer, NotificationId(404)).await.unwrap().is_none());

    let first = dispatcher.mark_read(organizer, id).await.unwrap().unwrap();
    let second = dispatcher.mark_read(organizer, id).await.unwrap().unwrap();
    assert!(first.read_at.is_some());
    assert_eq!(first.read_at, second.read_at);
    assert_eq!(dispatcher.feed(organizer).await.unwrap().unread, 0);
}

#[tokio::test]
async fn unrecordable_notice_is_still_delivered() {
    let store = store();
    let organizer = register(&store, 1, "Olga");
    let messenger = Arc::new(RecordingMessenger::default());
    let dispatcher = NotificationDispatcher::new(store, messenger.clone());

    let dispatched = dispatcher
        .dispatch(vec![Notice::new(organizer, MeetingId(404), NotificationKind::Update, "Moved")])
        .await;

    assert!(dispatched.recorded.is_empty());
    assert_eq!(dispatched.delivered().await, 1);
    assert_eq!(messenger.sent_to(organizer), vec!["Moved".to_string()]);
}
