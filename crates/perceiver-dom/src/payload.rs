//! Serde mirror of the extraction script's JSON payload.

use serde::{Deserialize, Serialize};

use crate::model::BoundingBox;

/// Whole-page payload returned by `PAGE_EXTRACT_SCRIPT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub scroll: RawScroll,
    #[serde(default)]
    pub elements: Vec<RawElement>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScroll {
    #[serde(default)]
    pub pixels_from_top: i64,
    #[serde(default)]
    pub total_height: i64,
    #[serde(default)]
    pub viewport_height: i64,
}

/// One surviving candidate, in DOM-traversal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    pub tag: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub bounds: BoundingBox,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub focusable: bool,
    #[serde(default = "default_true")]
    pub interactive: bool,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub backend_node_id: Option<i64>,
}

fn default_true() -> bool {
    true
}
