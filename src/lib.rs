//! webpilot: natural-language browser automation.
//!
//! A bounded agent loop drives a real browser toward a user-stated goal:
//! each iteration snapshots the live page into an indexed element map,
//! sends that state (plus bounded history) to a multimodal model with a
//! fixed tool vocabulary, executes the tool call the model emits, then
//! verifies the resulting page change and scores confidence before the
//! next observation.
//!
//! The crate is the orchestration layer; perception, verification,
//! redaction and the browser contract live in the workspace member crates
//! and are re-exported here for convenience.
//!
//! ```no_run
//! use std::sync::Arc;
//! use webpilot::{Agent, AgentConfig, FakeBrowser, ScriptedTransport};
//!
//! # async fn demo() -> Result<(), webpilot::TaskError> {
//! let agent = Agent::new(
//!     Arc::new(FakeBrowser::new()),
//!     Arc::new(ScriptedTransport::new()),
//!     AgentConfig::default(),
//! );
//! agent.start()?;
//! let result = agent.run("Open example.com and find the docs link").await?;
//! println!("success: {} in {} steps", result.success, result.steps.len());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod errors;
pub mod llm;
pub mod observation;
pub mod telemetry;
pub mod tools;

pub use agent::{Agent, AgentHistory, HistoryItem, StepRecord, TaskResult, SYSTEM_PROMPT};
pub use config::{AgentConfig, ElementBudget};
pub use errors::TaskError;
pub use llm::{
    ImagePart, ModelEvent, ModelEventStream, ModelPart, ModelTransport, ScriptedTransport,
    TransportError, UserContent,
};
pub use observation::{detect_obstruction, Obstruction};
pub use tools::{
    DispatchOutcome, TakeoverHandle, ToolArgs, ToolDeclaration, ToolDispatcher, ToolParseError,
    ToolRegistry, ToolResult,
};

// Re-export the subsystem crates' primary types.
pub use action_verify::{
    detect_changes, verify_action, ActionKind, ConfidenceLevel, ConfidenceScore, PageSnapshot,
    StateChange, TaskConfidence, Verification,
};
pub use browser_adapter::{
    extract_element_map, AdapterError, BrowserAdapter, FakeBrowser, FakePage, PageEffect,
    ScrollDirection, TabInfo,
};
pub use perceiver_dom::{Element, ElementMap, ElementMapBuilder, PAGE_EXTRACT_SCRIPT};
pub use privacy_guard::Redactor;
pub use webpilot_core_types::{SessionId, TabId, TaskId};
