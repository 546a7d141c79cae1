//! Core data models for the meeting calendar bot.
//!
//! This crate holds the entities shared by the store, the negotiation core
//! and the chat front end: users, calendar events, meetings with their
//! participants, and notifications. It also owns the wire formats for
//! dates and times and the pure rule that derives a meeting's status.

pub mod commitment;
pub mod error;
pub mod event;
pub mod ids;
pub mod meeting;
pub mod notification;
pub mod user;
pub mod wire;

// Re-export main types
pub use commitment::DayCommitments;
pub use error::{ModelError, Result};
pub use event::{
    CalendarEvent, ChangeAction, EventPatch, EventStats, NewEvent, ShareStats, Visibility,
};
pub use ids::{EventId, MeetingId, NotificationId, UserId};
pub use meeting::{
    InvitationResponse, Meeting, MeetingPlan, MeetingRole, MeetingStatus, Participant,
    ParticipantStatus, TimeWindow,
};
pub use notification::{Notification, NotificationFeed, NotificationKind};
pub use user::{User, UserProfile};
pub use wire::{format_date, format_time, parse_date, parse_time};
