//! Bounded execution history.
//!
//! The ring keeps step 1 (how the task began) plus the most recent
//! `capacity - 1` items; everything in between is elided with a count.
//! Consecutive failures and the accumulated model memory live here because
//! both are derived from the same stream of items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Truncation applied to rendered results in the digest.
const DIGEST_RESULT_LIMIT: usize = 200;

/// One executed tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    /// 1-based, strictly increasing.
    pub step_number: u32,
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub arguments: Value,
    pub result: Value,
    pub success: bool,
    pub duration_ms: u64,
    /// Model commentary attached after its next turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_goal: Option<String>,
}

impl HistoryItem {
    pub fn new(step_number: u32, tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            step_number,
            timestamp: Utc::now(),
            tool: tool.into(),
            arguments,
            result: Value::Null,
            success: true,
            duration_ms: 0,
            evaluation: None,
            next_goal: None,
        }
    }

    pub fn with_result(mut self, result: Value, success: bool, duration_ms: u64) -> Self {
        self.result = result;
        self.success = success;
        self.duration_ms = duration_ms;
        self
    }
}

/// The task-scoped history ring plus derived statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHistory {
    task: String,
    capacity: usize,
    items: Vec<HistoryItem>,
    omitted: usize,
    memory: String,
    consecutive_failures: u32,
    total: usize,
    successes: usize,
}

impl AgentHistory {
    pub fn new(task: impl Into<String>, capacity: usize) -> Self {
        Self {
            task: task.into(),
            capacity: capacity.max(2),
            items: Vec::new(),
            omitted: 0,
            memory: String::new(),
            consecutive_failures: 0,
            total: 0,
            successes: 0,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Append one executed call, evicting the oldest non-first item when
    /// the ring is full.
    pub fn push(&mut self, item: HistoryItem) {
        self.total += 1;
        if item.success {
            self.successes += 1;
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
        if self.items.len() >= self.capacity {
            self.items.remove(1);
            self.omitted += 1;
        }
        self.items.push(item);
    }

    /// Items currently retained (step 1 plus the recent tail).
    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn last(&self) -> Option<&HistoryItem> {
        self.items.last()
    }

    /// Total calls ever recorded, including evicted ones.
    pub fn total_steps(&self) -> usize {
        self.total
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successes as f64 / self.total as f64
        }
    }

    /// Accumulated free-form model memory.
    pub fn memory(&self) -> &str {
        &self.memory
    }

    /// Append new memory content from the model.
    pub fn update_memory(&mut self, content: &str) {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return;
        }
        if !self.memory.is_empty() {
            self.memory.push('\n');
        }
        self.memory.push_str(trimmed);
    }

    /// Attach the model's post-hoc commentary to the most recent item.
    pub fn annotate_last(&mut self, evaluation: Option<String>, next_goal: Option<String>) {
        if let Some(item) = self.items.last_mut() {
            if evaluation.is_some() {
                item.evaluation = evaluation;
            }
            if next_goal.is_some() {
                item.next_goal = next_goal;
            }
        }
    }

    /// Render the digest block for continuation prompts.
    pub fn digest(&self) -> String {
        if self.items.is_empty() {
            return String::new();
        }
        let mut lines = Vec::new();
        for (position, item) in self.items.iter().enumerate() {
            if position == 1 && self.omitted > 0 {
                lines.push(format!("({} steps omitted)", self.omitted));
            }
            lines.push(render_item(item));
        }
        lines.join("\n")
    }
}

fn render_item(item: &HistoryItem) -> String {
    let status = if item.success { "✓" } else { "✗" };
    let result = item.result.to_string();
    let result = if result.chars().count() > DIGEST_RESULT_LIMIT {
        let kept: String = result.chars().take(DIGEST_RESULT_LIMIT - 3).collect();
        format!("{kept}...")
    } else {
        result
    };
    let mut line = format!("Step {} {status} {} -> {result}", item.step_number, item.tool);
    if let Some(evaluation) = &item.evaluation {
        line.push_str(&format!(" | eval: {evaluation}"));
    }
    if let Some(next_goal) = &item.next_goal {
        line.push_str(&format!(" | next: {next_goal}"));
    }
    line
}
