//! Shared primitive types for the webpilot agent stack.
//!
//! Every subsystem addresses tasks, model sessions, browser tabs and page
//! snapshots through these opaque ids rather than raw strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Minimal shared error for id parsing and cross-crate plumbing.
#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("{message}")]
    Message { message: String },
}

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Mint a fresh random id.
            pub fn new() -> Self {
                Self(format!("{}-{}", $prefix, Uuid::new_v4()))
            }

            /// Wrap an externally supplied id verbatim.
            pub fn from_raw(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// One user task run through the agent loop.
    TaskId,
    "task"
);

string_id!(
    /// One conversation session with the model transport.
    SessionId,
    "session"
);

string_id!(
    /// One browser tab owned by the adapter.
    TabId,
    "tab"
);

string_id!(
    /// One extraction of the page into an element map or snapshot.
    SnapshotId,
    "snap"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("task-"));
        assert!(SessionId::new().as_str().starts_with("session-"));
        assert!(TabId::new().as_str().starts_with("tab-"));
        assert!(SnapshotId::new().as_str().starts_with("snap-"));
    }

    #[test]
    fn ids_round_trip_through_serde() {
        let id = SnapshotId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: SnapshotId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn from_raw_preserves_value() {
        let id = TabId::from_raw("tab-fixed");
        assert_eq!(id.as_str(), "tab-fixed");
        assert_eq!(id.to_string(), "tab-fixed");
    }
}
