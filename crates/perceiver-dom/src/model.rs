//! Core data types for page perception.
//!
//! An [`ElementMap`] is the unit of exchange between the extractor, the
//! prompt builder and the tool dispatcher: one immutable, densely indexed
//! view of the interactive elements on a page. Maps are replaced, never
//! mutated, on refresh; indices are meaningless outside the map that
//! assigned them.

use serde::{Deserialize, Serialize};
use webpilot_core_types::SnapshotId;

/// Axis-aligned box in CSS pixels of the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Geometric center, used for pointer dispatch.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Scroll offsets reported alongside an extraction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScrollInfo {
    /// Pixels scrolled from the top of the document.
    pub pixels_from_top: i64,
    /// Total scrollable document height.
    pub total_height: i64,
    /// Viewport height.
    pub viewport_height: i64,
}

impl ScrollInfo {
    pub fn scroll_percentage(&self) -> f64 {
        if self.total_height <= self.viewport_height {
            100.0
        } else {
            let scrollable = (self.total_height - self.viewport_height) as f64;
            (self.pixels_from_top as f64 / scrollable * 100.0).min(100.0)
        }
    }

    pub fn is_at_bottom(&self) -> bool {
        self.scroll_percentage() >= 95.0
    }
}

/// One interactive node on the page.
///
/// The `index` is dense within the owning [`ElementMap`] and assigned in
/// DOM-traversal order at extraction time. If `visible` is true the bounding
/// box has positive area and the computed-style checks passed in-page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub index: u32,
    /// Lowercased tag name.
    pub tag: String,
    /// Resolved accessibility role (explicit, fused, or inferred from tag).
    pub role: String,
    /// Accessible name, possibly filled from the accessibility tree.
    #[serde(default)]
    pub name: String,
    /// Visible text, truncated to at most 200 characters.
    #[serde(default)]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Current value for form controls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    pub bounds: BoundingBox,
    pub visible: bool,
    pub enabled: bool,
    pub focusable: bool,
    pub interactive: bool,
    /// Best-effort stable CSS selector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Devtools backend node id, when the driver exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,
}

impl Element {
    /// First non-empty of aria-label, accessible name, placeholder, text.
    pub fn description(&self) -> &str {
        if let Some(label) = self.aria_label.as_deref() {
            if !label.is_empty() {
                return label;
            }
        }
        if !self.name.is_empty() {
            return &self.name;
        }
        if let Some(placeholder) = self.placeholder.as_deref() {
            if !placeholder.is_empty() {
                return placeholder;
            }
        }
        &self.text
    }
}

/// The indexed element collection produced by one extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementMap {
    pub id: SnapshotId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub scroll: ScrollInfo,
    elements: Vec<Element>,
}

impl ElementMap {
    /// Build a map from already-indexed elements.
    ///
    /// Callers must hand elements whose indices form the contiguous prefix
    /// `[0, len)`; [`crate::ElementMapBuilder`] guarantees this.
    pub fn new(url: impl Into<String>, title: impl Into<String>, elements: Vec<Element>) -> Self {
        debug_assert!(elements
            .iter()
            .enumerate()
            .all(|(i, e)| e.index as usize == i));
        Self {
            id: SnapshotId::new(),
            url: url.into(),
            title: title.into(),
            scroll: ScrollInfo::default(),
            elements,
        }
    }

    pub fn with_scroll(mut self, scroll: ScrollInfo) -> Self {
        self.scroll = scroll;
        self
    }

    /// O(1) lookup by index; `None` for anything outside `[0, len)`.
    pub fn lookup(&self, index: u32) -> Option<&Element> {
        self.elements.get(index as usize)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub(crate) fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements sharing this element's (tag, description) shape;
    /// feeds the uniqueness confidence factor.
    pub fn equivalent_count(&self, element: &Element) -> usize {
        self.elements
            .iter()
            .filter(|e| e.tag == element.tag && e.description() == element.description())
            .count()
    }

    /// An empty map for pages where extraction failed outright.
    pub fn empty(url: impl Into<String>) -> Self {
        Self::new(url, "", Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn element(index: u32, tag: &str, text: &str) -> Element {
        Element {
            index,
            tag: tag.to_string(),
            role: String::new(),
            name: String::new(),
            text: text.to_string(),
            input_type: None,
            href: None,
            placeholder: None,
            value: None,
            aria_label: None,
            bounds: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            visible: true,
            enabled: true,
            focusable: true,
            interactive: true,
            selector: None,
            backend_node_id: None,
        }
    }

    #[test]
    fn lookup_respects_dense_indices() {
        let map = ElementMap::new(
            "https://example.com",
            "Example",
            vec![element(0, "a", "Home"), element(1, "button", "Go")],
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup(0).unwrap().index, 0);
        assert_eq!(map.lookup(1).unwrap().tag, "button");
        assert!(map.lookup(2).is_none());
    }

    #[test]
    fn description_prefers_aria_label() {
        let mut el = element(0, "button", "visible text");
        el.aria_label = Some("Close dialog".to_string());
        assert_eq!(el.description(), "Close dialog");
        el.aria_label = None;
        el.placeholder = Some("Search".to_string());
        assert_eq!(el.description(), "Search");
        el.placeholder = None;
        assert_eq!(el.description(), "visible text");
    }

    #[test]
    fn equivalent_count_groups_by_tag_and_description() {
        let map = ElementMap::new(
            "https://example.com",
            "",
            vec![
                element(0, "a", "More"),
                element(1, "a", "More"),
                element(2, "a", "Less"),
            ],
        );
        assert_eq!(map.equivalent_count(map.lookup(0).unwrap()), 2);
        assert_eq!(map.equivalent_count(map.lookup(2).unwrap()), 1);
    }

    #[test]
    fn scroll_percentage_clamps() {
        let scroll = ScrollInfo {
            pixels_from_top: 500,
            total_height: 2000,
            viewport_height: 1000,
        };
        assert!((scroll.scroll_percentage() - 50.0).abs() < 0.01);
        let short = ScrollInfo {
            pixels_from_top: 0,
            total_height: 400,
            viewport_height: 1000,
        };
        assert_eq!(short.scroll_percentage(), 100.0);
        assert!(short.is_at_bottom());
    }
}
