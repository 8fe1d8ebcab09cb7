//! Built-in secret patterns.
//!
//! Each pattern swallows the whole `key = value` phrase, not just the value,
//! so a second pass over already-redacted text finds nothing to match. The
//! marker text itself (`<secret type="...">[REDACTED]</secret>`) never
//! satisfies any rule: every key-style rule demands `:` or `=` right after
//! the keyword, and the value-style rules demand digits.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::redactor::RedactRule;

static BUILTINS: Lazy<Vec<RedactRule>> = Lazy::new(|| {
    vec![
        rule(
            "api_key",
            r#"(?i)\bapi[_-]?key\b\s*[:=]\s*["']?[A-Za-z0-9][A-Za-z0-9_\-]{7,}["']?"#,
        ),
        rule("bearer_token", r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]{8,}=*"),
        rule(
            "password",
            r#"(?i)\bpassword\b\s*[:=]\s*["']?[^\s"']+["']?"#,
        ),
        rule("secret", r#"(?i)\bsecret\b\s*[:=]\s*["']?[^\s"']+["']?"#),
        rule("credit_card", r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{1,4}\b"),
        rule("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
    ]
});

fn rule(kind: &str, pattern: &str) -> RedactRule {
    RedactRule {
        kind: kind.to_string(),
        regex: Regex::new(pattern).expect("builtin redaction pattern must compile"),
    }
}

/// The default rule set applied by [`crate::Redactor::new`].
pub fn builtin_rules() -> Vec<RedactRule> {
    BUILTINS.clone()
}
