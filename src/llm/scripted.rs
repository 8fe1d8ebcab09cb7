//! Deterministic transport used for tests and offline development.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use webpilot_core_types::SessionId;

use crate::tools::ToolDeclaration;

use super::{ModelEvent, ModelEventStream, ModelTransport, TransportError, UserContent};

#[derive(Debug, Default)]
struct Shared {
    turns: VecDeque<Vec<ModelEvent>>,
    received: Vec<UserContent>,
    sessions: Vec<SessionId>,
    declared_tools: Vec<String>,
}

/// Replays pre-programmed turns and records everything it was sent.
///
/// Each scripted turn is a list of events; when the dispatcher pushes a
/// tool response mid-turn the stream echoes it as the next event, exactly
/// like a live transport relaying the model runner's function responses.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    shared: Arc<Mutex<Shared>>,
    configured: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            configured: true,
        }
    }

    /// A transport that reports missing credentials.
    pub fn unconfigured() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            configured: false,
        }
    }

    /// Queue one turn's worth of events.
    pub fn push_turn(&self, events: Vec<ModelEvent>) {
        self.shared.lock().turns.push_back(events);
    }

    /// Every user content the agent sent, in order.
    pub fn received(&self) -> Vec<UserContent> {
        self.shared.lock().received.clone()
    }

    /// Tool names declared at session creation.
    pub fn declared_tools(&self) -> Vec<String> {
        self.shared.lock().declared_tools.clone()
    }

    /// Sessions created so far.
    pub fn sessions(&self) -> Vec<SessionId> {
        self.shared.lock().sessions.clone()
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn create_session(
        &self,
        _system_prompt: &str,
        tools: &[ToolDeclaration],
    ) -> Result<SessionId, TransportError> {
        let session = SessionId::new();
        let mut shared = self.shared.lock();
        shared.sessions.push(session.clone());
        shared.declared_tools = tools.iter().map(|t| t.name.clone()).collect();
        Ok(session)
    }

    async fn run_turn(
        &self,
        _session: &SessionId,
        content: UserContent,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn ModelEventStream>, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let mut shared = self.shared.lock();
        shared.received.push(content);
        let events = shared
            .turns
            .pop_front()
            .ok_or_else(|| TransportError::Failed("no scripted turn remaining".to_string()))?;
        Ok(Box::new(ScriptedStream {
            pending: events.into(),
        }))
    }
}

struct ScriptedStream {
    pending: VecDeque<ModelEvent>,
}

#[async_trait]
impl ModelEventStream for ScriptedStream {
    async fn next_event(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<ModelEvent>, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        Ok(self.pending.pop_front())
    }

    async fn push_tool_response(
        &mut self,
        name: &str,
        response: Value,
    ) -> Result<(), TransportError> {
        self.pending
            .push_front(ModelEvent::function_response(name, response));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cancel() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn replays_turns_in_order() {
        let transport = ScriptedTransport::new();
        transport.push_turn(vec![
            ModelEvent::function_call("navigate", json!({"url": "https://example.com"})),
            ModelEvent::final_text("navigating"),
        ]);
        let session = transport.create_session("prompt", &[]).await.unwrap();
        let mut stream = transport
            .run_turn(&session, UserContent::text("go"), &cancel())
            .await
            .unwrap();

        let first = stream.next_event(&cancel()).await.unwrap().unwrap();
        assert!(!first.is_final_response());
        let last = stream.next_event(&cancel()).await.unwrap().unwrap();
        assert!(last.is_final_response());
        assert!(stream.next_event(&cancel()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tool_responses_echo_before_remaining_events() {
        let transport = ScriptedTransport::new();
        transport.push_turn(vec![
            ModelEvent::function_call("click", json!({"element_index": 0})),
            ModelEvent::final_text("clicked"),
        ]);
        let session = transport.create_session("prompt", &[]).await.unwrap();
        let mut stream = transport
            .run_turn(&session, UserContent::text("go"), &cancel())
            .await
            .unwrap();

        let _call = stream.next_event(&cancel()).await.unwrap().unwrap();
        stream
            .push_tool_response("click", json!({"success": true}))
            .await
            .unwrap();
        let echo = stream.next_event(&cancel()).await.unwrap().unwrap();
        assert_eq!(
            echo,
            ModelEvent::function_response("click", json!({"success": true}))
        );
        let last = stream.next_event(&cancel()).await.unwrap().unwrap();
        assert!(last.is_final_response());
    }

    #[tokio::test]
    async fn exhausted_script_is_a_transport_error() {
        let transport = ScriptedTransport::new();
        let session = transport.create_session("prompt", &[]).await.unwrap();
        let err = transport
            .run_turn(&session, UserContent::text("go"), &cancel())
            .await
            .err()
            .expect("should fail");
        assert!(matches!(err, TransportError::Failed(_)));
    }
}
