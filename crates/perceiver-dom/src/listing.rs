//! Token-efficient element listing for model prompts.
//!
//! One line per element:
//! `[<index>] <tag>[<type>] role=<role> "<description>" href=<href>
//! value="<value>" (<x>,<y>) [disabled]`
//! with every part after the tag optional. Roles the tag already implies
//! are omitted, descriptions are capped at 40 characters.

use crate::builder::truncate_chars;
use crate::model::{Element, ElementMap};
use crate::roles::implied_role;

const DESCRIPTION_LIMIT: usize = 40;

/// Render the whole map, one element per line.
pub fn render_listing(map: &ElementMap) -> String {
    map.elements()
        .iter()
        .map(listing_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a single element line.
pub fn listing_line(element: &Element) -> String {
    let mut line = format!("[{}] {}", element.index, element.tag);

    if let Some(input_type) = element.input_type.as_deref() {
        line.push_str(&format!("[{input_type}]"));
    }

    if implied_role(&element.tag) != Some(element.role.as_str()) && element.role != "generic" {
        line.push_str(&format!(" role={}", element.role));
    }

    let description = truncate_chars(element.description(), DESCRIPTION_LIMIT);
    line.push_str(&format!(" \"{description}\""));

    if let Some(href) = element.href.as_deref() {
        line.push_str(&format!(" href={href}"));
    }

    if let Some(value) = element.value.as_deref() {
        if !value.is_empty() {
            line.push_str(&format!(" value=\"{value}\""));
        }
    }

    line.push_str(&format!(
        " ({},{})",
        element.bounds.x.round() as i64,
        element.bounds.y.round() as i64
    ));

    if !element.enabled {
        line.push_str(" [disabled]");
    }

    line
}
