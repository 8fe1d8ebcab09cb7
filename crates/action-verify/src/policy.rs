//! Per-action verification policy.
//!
//! Each action kind implies a different notion of "it worked": clicks must
//! change *something*, typing must land in the target's value, navigation
//! must move the URL, scrolling is legitimately allowed to be a no-op at
//! the page edge.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::differ::{detect_changes, summarize_changes, StateChange};
use crate::snapshot::PageSnapshot;

/// Element-count jump on a click that suggests a modal or overlay opened.
pub const MODAL_COUNT_JUMP: i64 = 20;

/// Coarse action classes with distinct verification rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Scroll,
    Wait,
    /// Reads and other actions with no page-change expectation.
    Neutral,
}

impl ActionKind {
    /// Expected page-change level, used by the confidence engine.
    pub fn expected_change(&self) -> f64 {
        match self {
            ActionKind::Navigate => 0.8,
            ActionKind::Click => 0.5,
            ActionKind::Type => 0.3,
            ActionKind::Scroll => 0.2,
            ActionKind::Wait | ActionKind::Neutral => 0.0,
        }
    }
}

/// Outcome of verifying one executed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub verified: bool,
    pub message: String,
    pub changes: Vec<StateChange>,
}

impl Verification {
    fn ok(message: impl Into<String>, changes: Vec<StateChange>) -> Self {
        Self {
            verified: true,
            message: message.into(),
            changes,
        }
    }

    fn failed(message: impl Into<String>, changes: Vec<StateChange>) -> Self {
        Self {
            verified: false,
            message: message.into(),
            changes,
        }
    }
}

/// Decide whether an action of `kind` achieved its intended effect.
///
/// `target` is the element index the action addressed (when any) and
/// `typed_text` the text a type-style action entered.
pub fn verify_action(
    kind: ActionKind,
    target: Option<u32>,
    typed_text: Option<&str>,
    pre: &PageSnapshot,
    post: &PageSnapshot,
) -> Verification {
    let changes = detect_changes(pre, post);
    debug!(?kind, changes = changes.len(), "verifying action");

    match kind {
        ActionKind::Click => verify_click(changes),
        ActionKind::Type => verify_type(target, typed_text, pre, post, changes),
        ActionKind::Navigate => verify_navigation(pre, post, changes),
        ActionKind::Scroll => Verification::ok(
            format!("scroll applied; {}", summarize_changes(&changes)),
            changes,
        ),
        ActionKind::Wait | ActionKind::Neutral => {
            Verification::ok(summarize_changes(&changes), changes)
        }
    }
}

fn verify_click(changes: Vec<StateChange>) -> Verification {
    if changes.is_empty() {
        return Verification::failed("click produced no observable page change", changes);
    }

    let count_jump = changes.iter().find_map(StateChange::count_delta);
    if let Some(delta) = count_jump.filter(|d| *d >= MODAL_COUNT_JUMP) {
        let message = format!(
            "click verified; MODAL DETECTED (element count {delta:+}): a dialog or overlay \
             likely opened. Scroll with auto_detect=true or scope the scroll to an element_id \
             inside the modal."
        );
        return Verification::ok(message, changes);
    }

    Verification::ok(
        format!("click verified; {}", summarize_changes(&changes)),
        changes,
    )
}

fn verify_type(
    target: Option<u32>,
    typed_text: Option<&str>,
    pre: &PageSnapshot,
    post: &PageSnapshot,
    changes: Vec<StateChange>,
) -> Verification {
    let Some(index) = target else {
        return Verification::failed("type action without a target element", changes);
    };
    let text = typed_text.unwrap_or("");

    match (pre.entry(index), post.entry(index)) {
        (Some(_), Some(after)) => {
            if after.value.contains(text) {
                Verification::ok(format!("value at [{index}] now contains typed text"), changes)
            } else {
                Verification::failed(
                    format!("value at [{index}] does not contain the typed text"),
                    changes,
                )
            }
        }
        // The field disappearing usually means the form submitted.
        (Some(_), None) => Verification::ok(
            format!("element [{index}] left the page after typing (form likely submitted)"),
            changes,
        ),
        (None, _) => Verification::failed(
            format!("element [{index}] was not present before the action"),
            changes,
        ),
    }
}

fn verify_navigation(
    pre: &PageSnapshot,
    post: &PageSnapshot,
    changes: Vec<StateChange>,
) -> Verification {
    if pre.url != post.url {
        Verification::ok(format!("navigated to {}", post.url), changes)
    } else {
        Verification::failed("URL did not change", changes)
    }
}
