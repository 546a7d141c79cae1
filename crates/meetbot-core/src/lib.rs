//! Meeting negotiation core.
//!
//! Business logic shared by every front end of the meeting bot:
//!
//! - **availability**: decide whether a user is free in a window
//! - **orchestrator**: create meetings, fan out invitations, record answers
//! - **notify**: persist notifications and deliver them best-effort
//! - **export**: build export links for the reporting service
//! - **config**: paths and runtime settings
//!
//! Store access is synchronous. Async callers wrap it in
//! [`run_blocking`], the single point where the runtime waits on the
//! database.

pub mod availability;
pub mod blocking;
pub mod config;
pub mod error;
pub mod export;
pub mod notify;
pub mod orchestrator;

pub use availability::{Availability, Conflict};
pub use blocking::run_blocking;
pub use config::Settings;
pub use error::{CoreError, Result};
pub use export::{build_descriptor, ExportDescriptor, ExportFormat, ExportRequest, ExportScope};
pub use notify::{DeliveryError, Dispatched, Messenger, Notice, NotificationDispatcher};
pub use orchestrator::{MeetingCreated, MeetingOrchestrator, MeetingRequest, ResponseRecorded};
