//! Sensitive-data redaction for text bound for the model transport.
//!
//! Every prompt the agent emits passes through a [`Redactor`] first. Matches
//! are replaced with a typed marker so downstream consumers can still tell
//! *what kind* of secret was removed without ever seeing the value.

mod patterns;
mod redactor;

pub use patterns::builtin_rules;
pub use redactor::{RedactRule, Redactor};

use thiserror::Error;

/// Errors raised while assembling a redactor.
#[derive(Debug, Error)]
pub enum RedactError {
    /// A user-supplied pattern failed to compile.
    #[error("invalid redaction pattern for '{kind}': {source}")]
    InvalidPattern {
        kind: String,
        #[source]
        source: regex::Error,
    },
}
