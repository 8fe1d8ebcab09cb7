//! Lightweight page snapshots for verification diffing.

use std::collections::BTreeMap;

use perceiver_dom::ElementMap;
use serde::{Deserialize, Serialize};

/// Per-index record kept in a snapshot; tag, text and value are enough to
/// decide whether an action changed the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub tag: String,
    pub text: String,
    pub value: String,
}

/// Verification-oriented view of one page state.
///
/// Captured immediately before and after every mutating tool call. Equality
/// is structural; two captures of an unchanged page compare equal even
/// though they came from different element maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub element_count: usize,
    pub entries: BTreeMap<u32, SnapshotEntry>,
}

impl PageSnapshot {
    /// Capture the current element map.
    pub fn capture(map: &ElementMap) -> Self {
        let entries = map
            .elements()
            .iter()
            .map(|el| {
                (
                    el.index,
                    SnapshotEntry {
                        tag: el.tag.clone(),
                        text: el.text.clone(),
                        value: el.value.clone().unwrap_or_default(),
                    },
                )
            })
            .collect();
        Self {
            url: map.url.clone(),
            title: map.title.clone(),
            element_count: map.len(),
            entries,
        }
    }

    pub fn entry(&self, index: u32) -> Option<&SnapshotEntry> {
        self.entries.get(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perceiver_dom::{ElementMapBuilder, RawElement, RawPage};

    fn map_with(tags: &[&str]) -> ElementMap {
        let elements = tags
            .iter()
            .map(|tag| RawElement {
                tag: tag.to_string(),
                role: String::new(),
                name: String::new(),
                text: format!("{tag} text"),
                input_type: None,
                href: None,
                placeholder: None,
                value: Some("v".to_string()),
                aria_label: None,
                bounds: perceiver_dom::BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                visible: true,
                enabled: true,
                focusable: true,
                interactive: true,
                selector: None,
                backend_node_id: None,
            })
            .collect();
        ElementMapBuilder::default().build(RawPage {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            scroll: Default::default(),
            elements,
        })
    }

    #[test]
    fn captures_per_index_records() {
        let snapshot = PageSnapshot::capture(&map_with(&["a", "input"]));
        assert_eq!(snapshot.element_count, 2);
        assert_eq!(snapshot.entry(1).unwrap().tag, "input");
        assert_eq!(snapshot.entry(1).unwrap().value, "v");
        assert!(snapshot.entry(2).is_none());
    }

    #[test]
    fn captures_of_identical_maps_compare_equal() {
        let a = PageSnapshot::capture(&map_with(&["a", "button"]));
        let b = PageSnapshot::capture(&map_with(&["a", "button"]));
        assert_eq!(a, b);
    }
}
