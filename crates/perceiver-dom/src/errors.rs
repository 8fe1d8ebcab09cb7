use thiserror::Error;

/// Errors emitted while turning raw page output into an element map.
#[derive(Debug, Error)]
pub enum PerceiverError {
    /// The in-page script returned something that is not the expected payload.
    #[error("malformed extraction payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The script returned an empty string or no payload at all.
    #[error("extraction script produced no payload")]
    EmptyPayload,
}
