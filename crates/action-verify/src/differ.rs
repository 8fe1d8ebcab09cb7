//! Snapshot diffing.
//!
//! `detect_changes` compares the pre- and post-action snapshots and emits
//! typed change descriptors. Matching is by index: indices are only
//! comparable between two snapshots taken without an extraction in between,
//! which is exactly the pre/post window the dispatcher uses.

use serde::{Deserialize, Serialize};

use crate::snapshot::PageSnapshot;

/// One observed difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateChange {
    UrlChanged {
        from: String,
        to: String,
    },
    TitleChanged {
        from: String,
        to: String,
    },
    ElementCountChanged {
        before: usize,
        after: usize,
        delta: i64,
    },
    TextChanged {
        index: u32,
        from: String,
        to: String,
    },
    ValueChanged {
        index: u32,
        from: String,
        to: String,
    },
    IndexAdded {
        index: u32,
        tag: String,
    },
    IndexRemoved {
        index: u32,
        tag: String,
    },
}

impl StateChange {
    /// Signed element-count delta, when this change carries one.
    pub fn count_delta(&self) -> Option<i64> {
        match self {
            StateChange::ElementCountChanged { delta, .. } => Some(*delta),
            _ => None,
        }
    }
}

/// Compare two snapshots; an empty result means nothing observable changed.
pub fn detect_changes(pre: &PageSnapshot, post: &PageSnapshot) -> Vec<StateChange> {
    let mut changes = Vec::new();

    if pre.url != post.url {
        changes.push(StateChange::UrlChanged {
            from: pre.url.clone(),
            to: post.url.clone(),
        });
    }
    if pre.title != post.title {
        changes.push(StateChange::TitleChanged {
            from: pre.title.clone(),
            to: post.title.clone(),
        });
    }
    if pre.element_count != post.element_count {
        changes.push(StateChange::ElementCountChanged {
            before: pre.element_count,
            after: post.element_count,
            delta: post.element_count as i64 - pre.element_count as i64,
        });
    }

    for (index, before) in &pre.entries {
        match post.entries.get(index) {
            Some(after) => {
                if before.text != after.text {
                    changes.push(StateChange::TextChanged {
                        index: *index,
                        from: before.text.clone(),
                        to: after.text.clone(),
                    });
                }
                if before.value != after.value {
                    changes.push(StateChange::ValueChanged {
                        index: *index,
                        from: before.value.clone(),
                        to: after.value.clone(),
                    });
                }
            }
            None => changes.push(StateChange::IndexRemoved {
                index: *index,
                tag: before.tag.clone(),
            }),
        }
    }

    for (index, after) in &post.entries {
        if !pre.entries.contains_key(index) {
            changes.push(StateChange::IndexAdded {
                index: *index,
                tag: after.tag.clone(),
            });
        }
    }

    changes
}

/// Human-readable digest of a change list for tool-result messages.
pub fn summarize_changes(changes: &[StateChange]) -> String {
    if changes.is_empty() {
        return "no page changes detected".to_string();
    }
    let mut parts = Vec::new();
    for change in changes {
        match change {
            StateChange::UrlChanged { to, .. } => parts.push(format!("url -> {to}")),
            StateChange::TitleChanged { to, .. } => parts.push(format!("title -> {to:?}")),
            StateChange::ElementCountChanged { delta, after, .. } => {
                parts.push(format!("element count {delta:+} (now {after})"))
            }
            StateChange::TextChanged { index, .. } => parts.push(format!("text changed at [{index}]")),
            StateChange::ValueChanged { index, .. } => {
                parts.push(format!("value changed at [{index}]"))
            }
            StateChange::IndexAdded { index, .. } => parts.push(format!("new element [{index}]")),
            StateChange::IndexRemoved { index, .. } => {
                parts.push(format!("element [{index}] gone"))
            }
        }
    }
    parts.join(", ")
}
