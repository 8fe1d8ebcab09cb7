//! Accessibility-tree fusion.
//!
//! The DOM extraction is authoritative; accessibility data only enriches
//! attributes the DOM pass left empty. Matching prefers the devtools
//! backend node id and falls back to an accessible-name/text heuristic.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::model::ElementMap;
use crate::roles::is_interactive_role;

#[derive(Debug, Clone)]
struct AxNode {
    role: String,
    name: String,
}

/// Enrich `map` in place from a raw `Accessibility.getFullAXTree`-shaped
/// payload. Returns how many elements gained a role or name.
pub fn fuse_accessibility(map: &mut ElementMap, ax_raw: &Value) -> usize {
    let by_backend_id = index_ax_nodes(ax_raw);
    if by_backend_id.is_empty() {
        return 0;
    }

    let mut enriched = 0;
    for element in map.elements_mut() {
        let matched = element
            .backend_node_id
            .and_then(|id| by_backend_id.get(&id))
            .cloned()
            .or_else(|| {
                // Name heuristic: an AX node whose accessible name equals the
                // element's visible text.
                let text = element.text.trim();
                if text.is_empty() {
                    return None;
                }
                by_backend_id.values().find(|node| node.name == text).cloned()
            });

        let Some(ax) = matched else { continue };

        let mut changed = false;
        if element.role == "generic" && is_interactive_role(&ax.role) {
            element.role = ax.role.clone();
            changed = true;
        }
        if element.name.is_empty() && !ax.name.is_empty() {
            element.name = ax.name.clone();
            changed = true;
        }
        if changed {
            enriched += 1;
        }
    }

    debug!(enriched, "accessibility fusion complete");
    enriched
}

fn index_ax_nodes(ax_raw: &Value) -> HashMap<i64, AxNode> {
    let mut index = HashMap::new();
    let Some(nodes) = ax_raw.get("nodes").and_then(Value::as_array) else {
        return index;
    };

    for node in nodes {
        if node
            .get("ignored")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            continue;
        }
        let role = node
            .get("role")
            .and_then(|r| r.get("value"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        if !is_interactive_role(&role) {
            continue;
        }
        let name = node
            .get("name")
            .and_then(|n| n.get("value"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let Some(backend_id) = node.get("backendDOMNodeId").and_then(Value::as_i64) else {
            continue;
        };
        index.insert(backend_id, AxNode { role, name });
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ElementMapBuilder;
    use crate::payload::{RawElement, RawPage};
    use crate::model::BoundingBox;
    use serde_json::json;

    fn raw_div(text: &str, backend_id: Option<i64>) -> RawElement {
        RawElement {
            tag: "div".to_string(),
            role: String::new(),
            name: String::new(),
            text: text.to_string(),
            input_type: None,
            href: None,
            placeholder: None,
            value: None,
            aria_label: None,
            bounds: BoundingBox::new(0.0, 0.0, 40.0, 20.0),
            visible: true,
            enabled: true,
            focusable: true,
            interactive: true,
            selector: None,
            backend_node_id: backend_id,
        }
    }

    fn build(elements: Vec<RawElement>) -> ElementMap {
        ElementMapBuilder::default().build(RawPage {
            url: "https://example.com".to_string(),
            title: String::new(),
            scroll: Default::default(),
            elements,
        })
    }

    #[test]
    fn fills_role_and_name_by_backend_id() {
        let mut map = build(vec![raw_div("", Some(42))]);
        let ax = json!({
            "nodes": [{
                "backendDOMNodeId": 42,
                "role": {"value": "button"},
                "name": {"value": "Submit order"}
            }]
        });
        // Backend-id matching does not depend on visible text.
        let enriched = fuse_accessibility(&mut map, &ax);
        assert_eq!(enriched, 1);
        let el = map.lookup(0).unwrap();
        assert_eq!(el.role, "button");
        assert_eq!(el.name, "Submit order");
    }

    #[test]
    fn falls_back_to_name_text_heuristic() {
        let mut map = build(vec![raw_div("Open menu", None)]);
        let ax = json!({
            "nodes": [{
                "backendDOMNodeId": 7,
                "role": {"value": "button"},
                "name": {"value": "Open menu"}
            }]
        });
        fuse_accessibility(&mut map, &ax);
        assert_eq!(map.lookup(0).unwrap().role, "button");
    }

    #[test]
    fn dom_fields_stay_authoritative() {
        let mut explicit = raw_div("Save", Some(9));
        explicit.role = "tab".to_string();
        explicit.name = "Existing".to_string();
        let mut map = build(vec![explicit]);
        let ax = json!({
            "nodes": [{
                "backendDOMNodeId": 9,
                "role": {"value": "button"},
                "name": {"value": "From AX"}
            }]
        });
        let enriched = fuse_accessibility(&mut map, &ax);
        assert_eq!(enriched, 0);
        let el = map.lookup(0).unwrap();
        assert_eq!(el.role, "tab");
        assert_eq!(el.name, "Existing");
    }

    #[test]
    fn ignores_non_interactive_and_ignored_nodes() {
        let mut map = build(vec![raw_div("Paragraph", Some(3))]);
        let ax = json!({
            "nodes": [
                {"backendDOMNodeId": 3, "role": {"value": "paragraph"}, "name": {"value": "Paragraph"}},
                {"backendDOMNodeId": 4, "ignored": true, "role": {"value": "button"}, "name": {"value": "X"}}
            ]
        });
        assert_eq!(fuse_accessibility(&mut map, &ax), 0);
        assert_eq!(map.lookup(0).unwrap().role, "generic");
    }
}
