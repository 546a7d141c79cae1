//! Error types for model parsing and validation.

use thiserror::Error;

/// Errors raised while parsing wire input or validating model invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A numeric id could not be parsed.
    #[error("invalid {kind} id: {value}")]
    InvalidId { kind: &'static str, value: String },

    /// A date did not match DD.MM.YYYY.
    #[error("invalid date '{0}', expected DD.MM.YYYY")]
    InvalidDate(String),

    /// A time did not match HH:MM.
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    /// A time window whose end is not after its start.
    #[error("end time {end} must be after start time {start}")]
    EmptyWindow { start: String, end: String },

    /// A stored enum value that no variant matches.
    #[error("unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
