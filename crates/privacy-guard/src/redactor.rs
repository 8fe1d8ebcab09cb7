use regex::Regex;

use crate::patterns::builtin_rules;
use crate::RedactError;

/// One named redaction rule.
#[derive(Debug, Clone)]
pub struct RedactRule {
    /// Kind label emitted in the redaction marker, e.g. `api_key`.
    pub kind: String,
    /// Compiled pattern; must match the whole secret-bearing phrase.
    pub regex: Regex,
}

/// Replaces secret-bearing phrases with typed `[REDACTED]` markers.
///
/// Rules run in registration order; built-ins first, then any patterns added
/// at construction time. Redaction is idempotent: markers produced by one
/// pass are never matched by a later pass.
#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Vec<RedactRule>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Redactor {
    /// A redactor with the built-in rule set.
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    /// A redactor with no rules at all; useful when the embedder supplies
    /// every pattern.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a custom rule. `kind` appears verbatim in the marker.
    pub fn with_pattern(
        mut self,
        kind: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, RedactError> {
        let kind = kind.into();
        let regex = Regex::new(pattern).map_err(|source| RedactError::InvalidPattern {
            kind: kind.clone(),
            source,
        })?;
        self.rules.push(RedactRule { kind, regex });
        Ok(self)
    }

    /// Kinds of all registered rules, in application order.
    pub fn kinds(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.kind.as_str()).collect()
    }

    /// Replace every match of every rule with its typed marker.
    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for rule in &self.rules {
            if rule.regex.is_match(&out) {
                let marker = marker_for(&rule.kind);
                out = rule.regex.replace_all(&out, marker.as_str()).into_owned();
            }
        }
        out
    }

    /// True when `redact` would alter the input.
    pub fn contains_secrets(&self, text: &str) -> bool {
        self.rules.iter().any(|r| r.regex.is_match(text))
    }
}

fn marker_for(kind: &str) -> String {
    format!("<secret type=\"{kind}\">[REDACTED]</secret>")
}
