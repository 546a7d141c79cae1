#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use meetbot_core::{DeliveryError, MeetingRequest, Messenger};
use meetbot_models::{UserId, UserProfile};
use meetbot_persistence::CalendarStore;

pub fn store() -> Arc<CalendarStore> {
    Arc::new(CalendarStore::open_in_memory().unwrap())
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 20, 9, 0, 0).unwrap()
}

pub fn christmas() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn register(store: &CalendarStore, id: i64, name: &str) -> UserId {
    store
        .upsert_user(&UserProfile::bare(id).with_first_name(name), now())
        .unwrap()
        .id
}

pub fn request(organizer: UserId, start: (u32, u32), end: (u32, u32), participants: Vec<UserId>) -> MeetingRequest {
    MeetingRequest {
        organizer,
        title: "Planning".into(),
        description: None,
        date: christmas(),
        start: time(start.0, start.1),
        end: time(end.0, end.1),
        participants,
    }
}

/// Messenger double that records every send and can be told to fail.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<(UserId, String)>>,
    pub fail: bool,
}

impl RecordingMessenger {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent_to(&self, user: UserId) -> Vec<String> {
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
        if self.fail {
            return Err(DeliveryError {
                user,
                reason: "chat not found".into(),
            });
        }
        self.sent.lock().unwrap().push((user, text.to_string()));
        Ok(())
    }
}
