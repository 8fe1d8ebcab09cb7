use thiserror::Error;

/// Errors surfaced by browser adapter implementations.
///
/// The dispatcher maps most of these to `success=false` tool results rather
/// than aborting the task; only `BrowserClosed` and `Cancelled` are treated
/// as terminal by callers.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("browser is closed")]
    BrowserClosed,

    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("element {index} not found in current map")]
    ElementNotFound { index: u32 },

    #[error("element {index} is not visible or not interactable")]
    ElementNotVisible { index: u32 },

    #[error("script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("page extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("tab {0} not found")]
    TabNotFound(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl AdapterError {
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NavigationFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the agent loop may keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::BrowserClosed | Self::Cancelled)
    }
}
