//! Agent configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Wait-tool duration clamp, in milliseconds.
pub const WAIT_CLAMP_MS: (u64, u64) = (1, 10_000);

/// Cap applied to `extract_content` results, in characters.
pub const EXTRACT_CONTENT_LIMIT: usize = 10_000;

/// How many elements one extraction may index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementBudget {
    /// 30 elements; tight token budgets.
    Minimal,
    /// 100 elements.
    #[default]
    Standard,
    /// 300 elements; content-heavy pages.
    Rich,
    /// 500 elements.
    Max,
}

impl ElementBudget {
    pub fn cap(&self) -> usize {
        match self {
            ElementBudget::Minimal => 30,
            ElementBudget::Standard => 100,
            ElementBudget::Rich => 300,
            ElementBudget::Max => 500,
        }
    }
}

/// Configuration for one agent instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum executed tool calls before forcing stop.
    /// Default: 50
    pub max_steps: u32,

    /// Consecutive failed tool calls before aborting the task.
    /// Default: 5
    pub max_consecutive_failures: u32,

    /// Re-executions of an unverified action.
    /// Default: 2
    pub max_retries: u32,

    /// Delay before each retry, in milliseconds.
    /// Default: 500
    pub retry_delay_ms: u64,

    /// Settle time between executing a mutating tool and the post-snapshot.
    /// Default: 300
    pub stabilization_delay_ms: u64,

    /// DOM-quiet window required before extraction.
    /// Default: 500
    pub stability_window_ms: u64,

    /// History ring capacity; step 1 plus the most recent `capacity - 1`
    /// items are always retained.
    /// Default: 20
    pub history_capacity: usize,

    /// Element cap per extraction.
    pub element_budget: ElementBudget,

    /// Whether to capture screenshots and attach them to model turns.
    /// Default: true
    pub enable_vision: bool,

    /// Directory screenshots are written to.
    pub screenshot_dir: PathBuf,

    /// Scroll distance when the model omits an amount.
    /// Default: 300
    pub default_scroll_amount: i64,

    /// How long to wait for an operator acknowledgment after
    /// `request_human_takeover`, in milliseconds.
    /// Default: 30000
    pub takeover_wait_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            max_consecutive_failures: 5,
            max_retries: 2,
            retry_delay_ms: 500,
            stabilization_delay_ms: 300,
            stability_window_ms: 500,
            history_capacity: 20,
            element_budget: ElementBudget::Standard,
            enable_vision: true,
            screenshot_dir: PathBuf::from("screenshots"),
            default_scroll_amount: 300,
            takeover_wait_ms: 30_000,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small, fast, vision-less config for tests.
    pub fn minimal() -> Self {
        Self {
            max_steps: 10,
            max_consecutive_failures: 2,
            max_retries: 1,
            retry_delay_ms: 10,
            stabilization_delay_ms: 0,
            stability_window_ms: 0,
            history_capacity: 5,
            element_budget: ElementBudget::Minimal,
            enable_vision: false,
            takeover_wait_ms: 100,
            ..Default::default()
        }
    }

    /// Builder: set the step budget.
    pub fn max_steps(mut self, steps: u32) -> Self {
        self.max_steps = steps;
        self
    }

    /// Builder: set the consecutive-failure budget.
    pub fn max_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures;
        self
    }

    /// Builder: set the retry budget for unverified actions.
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Builder: toggle vision mode.
    pub fn vision(mut self, enabled: bool) -> Self {
        self.enable_vision = enabled;
        self
    }

    /// Builder: set the element budget.
    pub fn elements(mut self, budget: ElementBudget) -> Self {
        self.element_budget = budget;
        self
    }

    /// Builder: set the history ring capacity.
    pub fn history(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Builder: set the screenshot directory.
    pub fn screenshots(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Clamp a requested wait duration into the allowed range.
    pub fn clamp_wait(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(1000)
            .clamp(WAIT_CLAMP_MS.0, WAIT_CLAMP_MS.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig::default();
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.max_consecutive_failures, 5);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_delay_ms, 500);
        assert_eq!(config.stabilization_delay_ms, 300);
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.element_budget.cap(), 100);
        assert!(config.enable_vision);
    }

    #[test]
    fn builder_chains() {
        let config = AgentConfig::new()
            .max_steps(3)
            .max_failures(1)
            .vision(false)
            .elements(ElementBudget::Max);
        assert_eq!(config.max_steps, 3);
        assert_eq!(config.max_consecutive_failures, 1);
        assert!(!config.enable_vision);
        assert_eq!(config.element_budget.cap(), 500);
    }

    #[test]
    fn element_budget_presets() {
        assert_eq!(ElementBudget::Minimal.cap(), 30);
        assert_eq!(ElementBudget::Standard.cap(), 100);
        assert_eq!(ElementBudget::Rich.cap(), 300);
        assert_eq!(ElementBudget::Max.cap(), 500);
    }

    #[test]
    fn wait_durations_are_clamped() {
        let config = AgentConfig::default();
        assert_eq!(config.clamp_wait(None), 1000);
        assert_eq!(config.clamp_wait(Some(0)), 1);
        assert_eq!(config.clamp_wait(Some(99_999)), 10_000);
        assert_eq!(config.clamp_wait(Some(250)), 250);
    }
}
