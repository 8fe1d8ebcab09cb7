//! The browser adapter contract.
//!
//! A concrete driver (a devtools-protocol client in production, the
//! [`crate::FakeBrowser`] in tests) implements this trait; everything above
//! it is driver-agnostic. Element-addressing operations take the
//! [`ElementMap`] that minted the index so the adapter can resolve it to a
//! selector, backend node id or coordinates without holding element
//! references across extractions.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use webpilot_core_types::TabId;

use perceiver_dom::ElementMap;

use crate::error::AdapterError;

/// Scroll directions accepted by the scroll operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// One entry from the adapter's tab table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub active: bool,
}

/// Operations the agent core consumes from a browser driver.
///
/// Every method observes the supplied cancellation token and returns
/// [`AdapterError::Cancelled`] promptly once it fires. Implementations own
/// the tab table and guard mutation of it with a single lock.
#[async_trait]
pub trait BrowserAdapter: Send + Sync {
    async fn navigate(&self, url: &str, cancel: &CancellationToken) -> Result<(), AdapterError>;
    async fn go_back(&self, cancel: &CancellationToken) -> Result<(), AdapterError>;
    async fn go_forward(&self, cancel: &CancellationToken) -> Result<(), AdapterError>;
    async fn reload(&self, cancel: &CancellationToken) -> Result<(), AdapterError>;

    async fn click(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;
    async fn double_click(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;
    async fn hover(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;
    async fn focus(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;

    /// Append `text` to the element's current value.
    async fn type_text(
        &self,
        index: u32,
        text: &str,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;

    /// Replace the element's value with `text`.
    async fn clear_and_type(
        &self,
        index: u32,
        text: &str,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;

    /// Scroll the page, or the container holding `element`, by `pixels`.
    async fn scroll(
        &self,
        direction: ScrollDirection,
        pixels: i64,
        element: Option<u32>,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;

    /// Instant scroll bringing the element into the viewport; returns only
    /// after the offset is applied.
    async fn scroll_to_element(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;

    /// Dispatch a key sequence (e.g. `"Enter"`, `"Control+a"`) to the
    /// focused element.
    async fn send_keys(&self, keys: &str, cancel: &CancellationToken) -> Result<(), AdapterError>;

    /// Evaluate JavaScript in the page, returning its stringified result.
    async fn evaluate(
        &self,
        script: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AdapterError>;

    /// Full visible text of the page.
    async fn extract_text(&self, cancel: &CancellationToken) -> Result<String, AdapterError>;

    /// JPEG-encoded screenshot of the viewport (or full page).
    async fn screenshot(
        &self,
        full_page: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AdapterError>;

    async fn current_url(&self, cancel: &CancellationToken) -> Result<String, AdapterError>;
    async fn current_title(&self, cancel: &CancellationToken) -> Result<String, AdapterError>;

    /// Raw accessibility tree in `Accessibility.getFullAXTree` shape.
    async fn accessibility_tree(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Value, AdapterError>;

    async fn new_tab(
        &self,
        url: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<TabId, AdapterError>;
    async fn switch_tab(&self, tab: &TabId, cancel: &CancellationToken)
        -> Result<(), AdapterError>;
    async fn close_tab(&self, tab: &TabId, cancel: &CancellationToken)
        -> Result<(), AdapterError>;
    async fn list_tabs(&self, cancel: &CancellationToken) -> Result<Vec<TabInfo>, AdapterError>;

    /// Resolve once the DOM has been quiet for `window`.
    async fn wait_stable(
        &self,
        window: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError>;

    /// Tear down the browser; subsequent operations fail with
    /// [`AdapterError::BrowserClosed`].
    async fn close(&self, cancel: &CancellationToken) -> Result<(), AdapterError>;

    fn is_open(&self) -> bool;
}
