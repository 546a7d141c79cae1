//! Type-safe numeric ID wrappers.
//!
//! Users are keyed by the id the chat platform assigns them. Every other
//! entity gets a sequential id from the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Macro to generate ID newtypes with common functionality.
macro_rules! define_id {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| ModelError::InvalidId {
                        kind: $label,
                        value: s.to_string(),
                    })
            }
        }
    };
}

define_id!(UserId, "user");
define_id!(EventId, "event");
define_id!(MeetingId, "meeting");
define_id!(NotificationId, "notification");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parse_trims_whitespace() {
        let id: MeetingId = " 42 ".parse().unwrap();
        assert_eq!(id, MeetingId(42));
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn test_id_parse_rejects_text() {
        let err = "abc".parse::<EventId>().unwrap_err();
        assert!(err.to_string().contains("event"));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(UserId(123456789).to_string(), "123456789");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&NotificationId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
