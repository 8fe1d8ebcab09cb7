//! Verification and confidence engine.
//!
//! Decides whether a tool call achieved the page change its semantics
//! implied, and quantifies how sure the agent should be about each action
//! and about the task as a whole. Snapshots are captured strictly
//! pre → execute → post around every mutating tool call; an unverified
//! action is retried, never treated as fatal on its own.

mod confidence;
mod differ;
mod policy;
mod snapshot;

pub use confidence::{
    action_confidence, element_confidence, task_confidence, ActionConfidence, ConfidenceFactor,
    ConfidenceLevel, ConfidenceScore, ElementConfidence, TaskConfidence, TaskContext,
};
pub use differ::{detect_changes, summarize_changes, StateChange};
pub use policy::{verify_action, ActionKind, Verification, MODAL_COUNT_JUMP};
pub use snapshot::{PageSnapshot, SnapshotEntry};
