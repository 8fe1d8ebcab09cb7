//! Model transport contract.
//!
//! The agent core is model-vendor agnostic: any transport that can open a
//! conversation session and stream per-turn events (text, function calls,
//! function responses, then a final-response marker) can drive the loop.
//! Tool results flow back into the stream through
//! [`ModelEventStream::push_tool_response`], after which the transport
//! echoes a `FunctionResponse` part the loop observes.

mod scripted;

pub use scripted::ScriptedTransport;

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use webpilot_core_types::SessionId;

use crate::tools::ToolDeclaration;

/// Errors from the model collaborator; these end the task.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("model transport failed: {0}")]
    Failed(String),

    #[error("model stream cancelled")]
    Cancelled,
}

/// Inline image attached to a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime: String,
    pub data_base64: String,
}

/// Content of one user turn: text, optionally with an inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContent {
    pub text: String,
    pub image: Option<ImagePart>,
}

impl UserContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    /// Attach JPEG bytes as an inline `image/jpeg` part.
    pub fn with_jpeg(mut self, bytes: &[u8]) -> Self {
        self.image = Some(ImagePart {
            mime: "image/jpeg".to_string(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        });
        self
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// One piece of an event's content.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelPart {
    /// Free-form model text (reasoning); never drives control flow.
    Text(String),
    /// The model selected a tool.
    FunctionCall { name: String, args: Value },
    /// Echo of a tool result previously pushed into the stream.
    FunctionResponse { name: String, response: Value },
}

/// One event from the per-turn stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvent {
    pub parts: Vec<ModelPart>,
    final_response: bool,
}

impl ModelEvent {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            parts: vec![ModelPart::Text(content.into())],
            final_response: false,
        }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            parts: vec![ModelPart::FunctionCall {
                name: name.into(),
                args,
            }],
            final_response: false,
        }
    }

    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            parts: vec![ModelPart::FunctionResponse {
                name: name.into(),
                response,
            }],
            final_response: false,
        }
    }

    /// The turn-terminating event, optionally carrying closing text.
    pub fn final_text(content: impl Into<String>) -> Self {
        Self {
            parts: vec![ModelPart::Text(content.into())],
            final_response: true,
        }
    }

    pub fn mark_final(mut self) -> Self {
        self.final_response = true;
        self
    }

    /// Whether this event terminates the turn.
    pub fn is_final_response(&self) -> bool {
        self.final_response
    }
}

/// Pull-based event stream for one model turn.
///
/// `next_event` returns `None` once the stream is exhausted; a well-formed
/// turn ends with an event whose `is_final_response()` is true before that.
#[async_trait]
pub trait ModelEventStream: Send {
    async fn next_event(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<ModelEvent>, TransportError>;

    /// Feed the result of a dispatched tool call back to the model.
    async fn push_tool_response(
        &mut self,
        name: &str,
        response: Value,
    ) -> Result<(), TransportError>;
}

/// A conversation-capable model endpoint.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Whether credentials and endpoint configuration are present.
    fn is_configured(&self) -> bool {
        true
    }

    /// Open a conversation session with the given system prompt and tool
    /// vocabulary.
    async fn create_session(
        &self,
        system_prompt: &str,
        tools: &[ToolDeclaration],
    ) -> Result<SessionId, TransportError>;

    /// Run one turn; events stream until the final-response marker.
    async fn run_turn(
        &self,
        session: &SessionId,
        content: UserContent,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn ModelEventStream>, TransportError>;
}
