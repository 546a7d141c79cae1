//! Error types for the negotiation core.

use meetbot_models::{MeetingId, ModelError};
use meetbot_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur while negotiating meetings.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested window is empty or inverted.
    #[error("{0}")]
    InvalidWindow(ModelError),

    /// The organizer already has a commitment in the requested window.
    #[error("You already have plans at this time")]
    OrganizerBusy,

    /// No meeting with this id.
    #[error("Meeting {0} not found")]
    MeetingNotFound(MeetingId),

    /// The caller has no pending invitation to the meeting.
    #[error("You are not invited to meeting {0} or have already responded")]
    NotInvited(MeetingId),

    /// Export base URL or parameters could not form a URL.
    #[error("invalid export URL: {0}")]
    InvalidExportUrl(#[from] url::ParseError),

    /// The store failed.
    #[error("storage error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl CoreError {
    /// Whether the error comes from user input or state rather than from
    /// the infrastructure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidWindow(_)
                | CoreError::OrganizerBusy
                | CoreError::MeetingNotFound(_)
                | CoreError::NotInvited(_)
        )
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
