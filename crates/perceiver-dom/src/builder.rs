//! Turns the raw script payload into a validated [`ElementMap`].

use tracing::debug;

use crate::errors::PerceiverError;
use crate::model::{Element, ElementMap, ScrollInfo};
use crate::payload::{RawElement, RawPage};
use crate::roles::infer_role;

const STORED_TEXT_LIMIT: usize = 200;

/// Builder applying caps, invariant checks and role inference on top of the
/// in-page filtering.
#[derive(Debug, Clone)]
pub struct ElementMapBuilder {
    max_elements: usize,
    max_text_length: usize,
}

impl Default for ElementMapBuilder {
    fn default() -> Self {
        Self {
            max_elements: 100,
            max_text_length: STORED_TEXT_LIMIT,
        }
    }
}

impl ElementMapBuilder {
    pub fn new(max_elements: usize) -> Self {
        Self {
            max_elements,
            ..Default::default()
        }
    }

    pub fn with_max_text_length(mut self, len: usize) -> Self {
        self.max_text_length = len;
        self
    }

    /// Parse the JSON string the extraction script returned and build a map.
    pub fn build_from_json(&self, payload: &str) -> Result<ElementMap, PerceiverError> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return Err(PerceiverError::EmptyPayload);
        }
        let raw: RawPage = serde_json::from_str(trimmed)?;
        Ok(self.build(raw))
    }

    /// Build a map from an already-parsed payload.
    ///
    /// Elements arrive in DOM-traversal order; survivors are re-indexed into
    /// the contiguous prefix `[0, N)` after dropping anything that violates
    /// the geometry invariant and after applying the element cap.
    pub fn build(&self, raw: RawPage) -> ElementMap {
        let total = raw.elements.len();
        let mut elements = Vec::with_capacity(total.min(self.max_elements));

        for candidate in raw.elements {
            if elements.len() >= self.max_elements {
                debug!(
                    kept = elements.len(),
                    dropped = total - elements.len(),
                    "element cap reached"
                );
                break;
            }
            if candidate.bounds.width <= 0.0 || candidate.bounds.height <= 0.0 {
                continue;
            }
            elements.push(self.finish(elements.len() as u32, candidate));
        }

        let scroll = ScrollInfo {
            pixels_from_top: raw.scroll.pixels_from_top,
            total_height: raw.scroll.total_height,
            viewport_height: raw.scroll.viewport_height,
        };
        ElementMap::new(raw.url, raw.title, elements).with_scroll(scroll)
    }

    fn finish(&self, index: u32, raw: RawElement) -> Element {
        let tag = raw.tag.to_lowercase();
        let role = if raw.role.is_empty() {
            infer_role(&tag, raw.input_type.as_deref()).to_string()
        } else {
            raw.role.to_lowercase()
        };
        Element {
            index,
            role,
            name: truncate_chars(&raw.name, self.max_text_length),
            text: truncate_chars(&raw.text, self.max_text_length),
            input_type: raw.input_type,
            href: raw.href,
            placeholder: raw.placeholder,
            value: raw.value,
            aria_label: raw.aria_label,
            bounds: raw.bounds,
            visible: raw.visible,
            enabled: raw.enabled,
            focusable: raw.focusable,
            interactive: raw.interactive,
            selector: raw.selector,
            backend_node_id: raw.backend_node_id,
            tag,
        }
    }
}

/// Character-based truncation with a trailing ellipsis marker.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let kept: String = trimmed.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
