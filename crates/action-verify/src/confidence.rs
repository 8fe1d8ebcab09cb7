//! Confidence scoring.
//!
//! Scores are weighted means over named factors, so a recorded score can
//! always be explained back to the operator factor by factor. Three layers
//! build on each other: element targeting, single action, whole task.

use perceiver_dom::{is_interactive_role, Element, ElementMap};
use serde::{Deserialize, Serialize};

use crate::differ::StateChange;
use crate::policy::ActionKind;

/// Categorical confidence bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    /// Thresholds: 0.3 / 0.5 / 0.7 / 0.9.
    pub fn from_value(value: f64) -> Self {
        if value < 0.3 {
            ConfidenceLevel::VeryLow
        } else if value < 0.5 {
            ConfidenceLevel::Low
        } else if value < 0.7 {
            ConfidenceLevel::Medium
        } else if value < 0.9 {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::VeryHigh
        }
    }
}

/// One named, weighted contribution to a score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceFactor {
    pub name: String,
    pub weight: f64,
    pub score: f64,
    pub reason: String,
}

impl ConfidenceFactor {
    pub fn new(name: &str, weight: f64, score: f64, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            weight,
            score: score.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }
}

/// A value in [0, 1] with its factor breakdown and categorical level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub value: f64,
    pub level: ConfidenceLevel,
    pub factors: Vec<ConfidenceFactor>,
}

impl ConfidenceScore {
    /// Weighted mean of the factors. Deterministic: the same factors always
    /// produce the same value.
    pub fn from_factors(factors: Vec<ConfidenceFactor>) -> Self {
        let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
        let value = if total_weight > 0.0 {
            factors
                .iter()
                .map(|f| f.weight * f.score)
                .sum::<f64>()
                / total_weight
        } else {
            0.0
        };
        let value = value.clamp(0.0, 1.0);
        Self {
            value,
            level: ConfidenceLevel::from_value(value),
            factors,
        }
    }

    /// A factor-less fixed score.
    pub fn fixed(value: f64) -> Self {
        let value = value.clamp(0.0, 1.0);
        Self {
            value,
            level: ConfidenceLevel::from_value(value),
            factors: Vec::new(),
        }
    }
}

/// How well a chosen element fits the action about to run on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementConfidence {
    pub index: u32,
    pub score: ConfidenceScore,
}

/// Tags preferred per action, best first.
fn preferred_tags(kind: ActionKind) -> &'static [&'static str] {
    match kind {
        ActionKind::Click => &["button", "a", "input", "summary", "label"],
        ActionKind::Type => &["input", "textarea"],
        ActionKind::Scroll | ActionKind::Navigate | ActionKind::Wait | ActionKind::Neutral => &[],
    }
}

/// Score how appropriate `element` is as the target of `kind`.
pub fn element_confidence(element: &Element, map: &ElementMap, kind: ActionKind) -> ElementConfidence {
    let type_match = {
        let preferred = preferred_tags(kind);
        let (score, reason) = match preferred.iter().position(|t| *t == element.tag) {
            Some(0) => (1.0, format!("{} is the preferred tag", element.tag)),
            Some(1) => (0.8, format!("{} is a good tag for this action", element.tag)),
            Some(_) => (0.6, format!("{} is an acceptable tag", element.tag)),
            None if preferred.is_empty() => (1.0, "action has no tag preference".to_string()),
            None => (0.3, format!("{} is unusual for this action", element.tag)),
        };
        ConfidenceFactor::new("type_match", 0.3, score, reason)
    };

    let text_presence = {
        let description = element.description();
        let len = description.chars().count();
        let (score, reason) = if len == 0 {
            (0.2, "element has no descriptive text".to_string())
        } else if len < 4 {
            (0.5, "very short description".to_string())
        } else if len <= 40 {
            (1.0, "clear descriptive text".to_string())
        } else {
            (0.8, "long description".to_string())
        };
        ConfidenceFactor::new("text_presence", 0.2, score, reason)
    };

    let visibility = {
        let mut score: f64 = 0.0;
        if element.visible {
            score += 0.5;
            let area = element.bounds.area();
            if (100.0..=500_000.0).contains(&area) {
                score += 0.3;
            }
            if is_interactive_role(&element.role) {
                score += 0.2;
            }
        }
        let reason = if element.visible {
            "visible with plausible geometry"
        } else {
            "element not visible"
        };
        ConfidenceFactor::new("visibility", 0.2, score, reason)
    };

    let uniqueness = {
        let equivalents = map.equivalent_count(element).max(1);
        let score = (1.0 / equivalents as f64).max(0.2);
        ConfidenceFactor::new(
            "uniqueness",
            0.2,
            score,
            format!("{equivalents} element(s) share this tag and description"),
        )
    };

    let position = {
        let (x, y) = (element.bounds.x, element.bounds.y);
        let (score, reason) = if x < 0.0 || y < 0.0 {
            (0.4, "element starts off-screen".to_string())
        } else if x > 4000.0 || y > 4000.0 {
            (0.3, "element sits at extreme coordinates".to_string())
        } else {
            (1.0, "element is within the usual viewport range".to_string())
        };
        ConfidenceFactor::new("position", 0.1, score, reason)
    };

    ElementConfidence {
        index: element.index,
        score: ConfidenceScore::from_factors(vec![
            type_match,
            text_presence,
            visibility,
            uniqueness,
            position,
        ]),
    }
}

/// Confidence in one executed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfidence {
    pub kind: ActionKind,
    pub verified: bool,
    pub retries: u32,
    pub score: ConfidenceScore,
}

/// Magnitude of an observed change list on the same 0–1 scale the
/// expectation table uses.
fn observed_change_level(changes: &[StateChange]) -> f64 {
    if changes.is_empty() {
        return 0.0;
    }
    if changes
        .iter()
        .any(|c| matches!(c, StateChange::UrlChanged { .. }))
    {
        return 1.0;
    }
    let big_delta = changes
        .iter()
        .filter_map(StateChange::count_delta)
        .any(|d| d.abs() > 5);
    if big_delta || changes.len() > 5 {
        0.7
    } else {
        0.5
    }
}

/// Combine verification, retry count, targeting and page-change fit.
pub fn action_confidence(
    kind: ActionKind,
    verified: bool,
    retries: u32,
    targeting: Option<&ElementConfidence>,
    changes: &[StateChange],
) -> ActionConfidence {
    let verification = ConfidenceFactor::new(
        "verification",
        0.4,
        if verified { 1.0 } else { 0.3 },
        if verified {
            "action effect verified"
        } else {
            "action effect not verified"
        },
    );

    let retry_factor = ConfidenceFactor::new(
        "retries",
        0.2,
        (1.0 - 0.2 * retries as f64).max(0.2),
        format!("{retries} retr{}", if retries == 1 { "y" } else { "ies" }),
    );

    let targeting_factor = match targeting {
        Some(element) => ConfidenceFactor::new(
            "targeting",
            0.2,
            element.score.value,
            format!("element [{}] targeting score", element.index),
        ),
        None => ConfidenceFactor::new("targeting", 0.2, 1.0, "action targets no element"),
    };

    let expected = kind.expected_change();
    let observed = observed_change_level(changes);
    let page_change = ConfidenceFactor::new(
        "page_change",
        0.2,
        1.0 - (observed - expected).abs(),
        format!("observed change {observed:.1} vs expected {expected:.1}"),
    );

    ActionConfidence {
        kind,
        verified,
        retries,
        score: ConfidenceScore::from_factors(vec![
            verification,
            retry_factor,
            targeting_factor,
            page_change,
        ]),
    }
}

/// Task-level aggregate over every recorded action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfidence {
    pub average: f64,
    pub minimum: f64,
    pub success_rate: f64,
    pub score: ConfidenceScore,
}

/// Context fed into the task-level adjustment.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskContext {
    pub step: u32,
    pub total_steps: u32,
    pub consecutive_failures: u32,
}

pub fn task_confidence(actions: &[ActionConfidence], context: TaskContext) -> TaskConfidence {
    if actions.is_empty() {
        return TaskConfidence {
            average: 0.0,
            minimum: 0.0,
            success_rate: 0.0,
            score: ConfidenceScore::fixed(0.0),
        };
    }

    let values: Vec<f64> = actions.iter().map(|a| a.score.value).collect();
    let average = values.iter().sum::<f64>() / values.len() as f64;
    let minimum = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let success_rate =
        actions.iter().filter(|a| a.verified).count() as f64 / actions.len() as f64;

    let base = ConfidenceScore::from_factors(vec![
        ConfidenceFactor::new("average", 0.4, average, "mean action confidence"),
        ConfidenceFactor::new("minimum", 0.4, minimum, "weakest action"),
        ConfidenceFactor::new("success_rate", 0.2, success_rate, "verified / total"),
    ]);

    let adjusted = apply_context(base.value, context);
    TaskConfidence {
        average,
        minimum,
        success_rate,
        score: ConfidenceScore {
            value: adjusted,
            level: ConfidenceLevel::from_value(adjusted),
            factors: base.factors,
        },
    }
}

/// Long tasks decay, failure streaks penalize, near-complete tasks get a
/// small bonus; the result stays in [0, 1].
fn apply_context(mut value: f64, context: TaskContext) -> f64 {
    let step = context.step;
    if step > 10 {
        let decayed_steps = step.min(20) - 10;
        value *= 0.99_f64.powi(decayed_steps as i32);
    }
    if step > 20 {
        value *= 0.98_f64.powi((step - 20) as i32);
    }
    value *= 0.9_f64.powi(context.consecutive_failures as i32);
    if context.total_steps > 0 && step as f64 / context.total_steps as f64 > 0.8 {
        value *= 1.05;
    }
    value.clamp(0.0, 1.0)
}
