//! Task-level error taxonomy.

use browser_adapter::AdapterError;
use thiserror::Error;

/// Everything that can terminate or refuse a task.
///
/// Argument-validation and transient browser problems never surface here;
/// they become `success=false` tool results and the loop keeps running.
/// These variants are reserved for conditions that end the task or reject
/// the call outright.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("model credential missing: {0}")]
    MissingCredential(String),

    #[error("agent not started")]
    NotStarted,

    #[error("agent already started")]
    AlreadyStarted,

    #[error("Max steps ({0}) reached")]
    MaxStepsReached(u32),

    #[error("consecutive failure limit ({0}) reached")]
    ConsecutiveFailureLimitReached(u32),

    #[error("browser closed")]
    BrowserClosed,

    #[error("element {0} not found")]
    ElementNotFound(u32),

    #[error("element {0} not visible")]
    ElementNotVisible(u32),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("human takeover request timed out")]
    HumanTakeoverTimeout,

    #[error("page extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("model transport error: {0}")]
    Transport(String),

    #[error("task cancelled")]
    Cancelled,
}

impl From<AdapterError> for TaskError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::BrowserClosed => TaskError::BrowserClosed,
            AdapterError::NavigationFailed { url, reason } => {
                TaskError::NavigationFailed(format!("{url}: {reason}"))
            }
            AdapterError::Timeout { ms } => TaskError::Timeout(format!("{ms}ms")),
            AdapterError::ElementNotFound { index } => TaskError::ElementNotFound(index),
            AdapterError::ElementNotVisible { index } => TaskError::ElementNotVisible(index),
            AdapterError::EvaluationFailed(msg) => TaskError::ToolExecutionFailed(msg),
            AdapterError::ExtractionFailed(msg) => TaskError::ExtractionFailed(msg),
            AdapterError::TabNotFound(id) => {
                TaskError::ToolExecutionFailed(format!("tab {id} not found"))
            }
            AdapterError::Cancelled => TaskError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_steps_message_names_the_budget() {
        let err = TaskError::MaxStepsReached(3);
        assert!(err.to_string().contains("Max steps (3)"));
    }

    #[test]
    fn adapter_errors_map_to_task_kinds() {
        let err: TaskError = AdapterError::BrowserClosed.into();
        assert!(matches!(err, TaskError::BrowserClosed));
        let err: TaskError = AdapterError::ElementNotFound { index: 7 }.into();
        assert!(matches!(err, TaskError::ElementNotFound(7)));
        let err: TaskError = AdapterError::Cancelled.into();
        assert!(matches!(err, TaskError::Cancelled));
    }
}
