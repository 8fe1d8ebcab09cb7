//! Page obstruction heuristics.
//!
//! Scans the extracted page for signs the agent is blocked: consent walls,
//! captchas, anti-bot interstitials, login gates, or a page with nothing on
//! it. The result is surfaced in the prompt so the model can decide whether
//! to push through or hand control to a human.

use perceiver_dom::ElementMap;

const CONSENT_HINTS: &[&str] = &[
    "before you continue",
    "accept all cookies",
    "cookie consent",
    "we use cookies",
];
const CAPTCHA_HINTS: &[&str] = &[
    "captcha",
    "are you a robot",
    "human verification",
    "verify you are human",
];
const TRAFFIC_HINTS: &[&str] = &[
    "unusual traffic",
    "automated queries",
    "unusual activity",
    "access denied",
];
const LOGIN_HINTS: &[&str] = &["log in to continue", "sign in to continue", "login required"];

/// Known ways a page blocks automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Obstruction {
    ConsentGate,
    Captcha,
    UnusualTraffic,
    LoginWall,
    BlankPage,
}

impl Obstruction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Obstruction::ConsentGate => "consent_gate",
            Obstruction::Captcha => "captcha",
            Obstruction::UnusualTraffic => "unusual_traffic",
            Obstruction::LoginWall => "login_wall",
            Obstruction::BlankPage => "blank_page",
        }
    }

    /// Whether the obstruction usually needs a human.
    pub fn needs_human(&self) -> bool {
        matches!(self, Obstruction::Captcha | Obstruction::UnusualTraffic)
    }
}

/// Inspect an extracted page for obstructions.
///
/// `page_text` is the extract-text output when the caller already has it;
/// element names and the title are always scanned.
pub fn detect_obstruction(map: &ElementMap, page_text: Option<&str>) -> Option<Obstruction> {
    let mut blob = String::new();
    blob.push_str(&map.title);
    blob.push(' ');
    for element in map.elements() {
        blob.push_str(element.description());
        blob.push(' ');
        blob.push_str(&element.text);
        blob.push(' ');
    }
    if let Some(text) = page_text {
        blob.push_str(text);
    }
    let blob = blob.to_lowercase();

    if contains_any(&blob, CAPTCHA_HINTS) {
        return Some(Obstruction::Captcha);
    }
    if contains_any(&blob, TRAFFIC_HINTS) {
        return Some(Obstruction::UnusualTraffic);
    }
    if contains_any(&blob, CONSENT_HINTS) {
        return Some(Obstruction::ConsentGate);
    }
    if contains_any(&blob, LOGIN_HINTS) {
        return Some(Obstruction::LoginWall);
    }
    if map.is_empty() && blob.trim().is_empty() {
        return Some(Obstruction::BlankPage);
    }
    if map.is_empty() && map.url.starts_with("about:blank") {
        return Some(Obstruction::BlankPage);
    }
    None
}

fn contains_any(blob: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| blob.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use perceiver_dom::{Element, BoundingBox, ElementMap};

    fn element(index: u32, text: &str) -> Element {
        Element {
            index,
            tag: "div".to_string(),
            role: "generic".to_string(),
            name: String::new(),
            text: text.to_string(),
            input_type: None,
            href: None,
            placeholder: None,
            value: None,
            aria_label: None,
            bounds: BoundingBox::new(0.0, 0.0, 100.0, 40.0),
            visible: true,
            enabled: true,
            focusable: false,
            interactive: true,
            selector: None,
            backend_node_id: None,
        }
    }

    #[test]
    fn detects_captcha_from_element_text() {
        let map = ElementMap::new(
            "https://example.com",
            "Check",
            vec![element(0, "Please complete the CAPTCHA to continue")],
        );
        assert_eq!(detect_obstruction(&map, None), Some(Obstruction::Captcha));
        assert!(Obstruction::Captcha.needs_human());
    }

    #[test]
    fn detects_login_wall_from_page_text() {
        let map = ElementMap::new("https://example.com", "Members", vec![]);
        let found = detect_obstruction(&map, Some("Please log in to continue reading"));
        assert_eq!(found, Some(Obstruction::LoginWall));
    }

    #[test]
    fn detects_consent_gate_from_title() {
        let map = ElementMap::new(
            "https://example.com",
            "Before you continue to our site",
            vec![element(0, "Accept")],
        );
        assert_eq!(
            detect_obstruction(&map, None),
            Some(Obstruction::ConsentGate)
        );
    }

    #[test]
    fn blank_pages_are_flagged() {
        let map = ElementMap::new("about:blank", "", vec![]);
        assert_eq!(detect_obstruction(&map, None), Some(Obstruction::BlankPage));
    }

    #[test]
    fn ordinary_pages_pass_clean() {
        let map = ElementMap::new(
            "https://example.com",
            "Example Domain",
            vec![element(0, "More information")],
        );
        assert_eq!(detect_obstruction(&map, None), None);
    }
}
