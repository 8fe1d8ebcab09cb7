//! An in-memory browser for tests and offline development.
//!
//! `FakeBrowser` implements the full adapter contract over a scripted page
//! model: pages are registered by URL, and effects can be attached to
//! clicks or key presses so multi-step flows (search → submit → results)
//! run without a real browser. It recognizes the extraction script and
//! answers with the exact payload shape a live page would produce, so the
//! parsing/fusion pipeline is identical in tests and production.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;
use webpilot_core_types::TabId;

use perceiver_dom::{BoundingBox, ElementMap, RawElement, RawPage, RawScroll, PAGE_EXTRACT_SCRIPT};

use crate::adapter::{BrowserAdapter, ScrollDirection, TabInfo};
use crate::error::AdapterError;

/// Minimal JPEG header so screenshot bytes look like what a driver returns.
const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// One scripted page.
#[derive(Debug, Clone)]
pub struct FakePage {
    pub url: String,
    pub title: String,
    pub elements: Vec<RawElement>,
    pub text: String,
    pub ax_tree: Value,
    pub scroll: RawScroll,
}

impl FakePage {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            elements: Vec::new(),
            text: String::new(),
            ax_tree: Value::Null,
            scroll: RawScroll {
                pixels_from_top: 0,
                total_height: 2000,
                viewport_height: 800,
            },
        }
    }

    pub fn with_element(mut self, element: RawElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_ax_tree(mut self, ax_tree: Value) -> Self {
        self.ax_tree = ax_tree;
        self
    }

    pub fn with_height(mut self, total_height: i64) -> Self {
        self.scroll.total_height = total_height;
        self
    }

    /// A visible anchor element.
    pub fn link(text: &str, href: &str) -> RawElement {
        let mut el = Self::blank_element("a");
        el.text = text.to_string();
        el.href = Some(href.to_string());
        el
    }

    /// A visible button element.
    pub fn button(text: &str) -> RawElement {
        let mut el = Self::blank_element("button");
        el.text = text.to_string();
        el
    }

    /// A visible text input.
    pub fn text_input(placeholder: &str) -> RawElement {
        let mut el = Self::blank_element("input");
        el.input_type = Some("text".to_string());
        el.placeholder = Some(placeholder.to_string());
        el.value = Some(String::new());
        el
    }

    fn blank_element(tag: &str) -> RawElement {
        RawElement {
            tag: tag.to_string(),
            role: String::new(),
            name: String::new(),
            text: String::new(),
            input_type: None,
            href: None,
            placeholder: None,
            value: None,
            aria_label: None,
            bounds: BoundingBox::new(20.0, 20.0, 160.0, 28.0),
            visible: true,
            enabled: true,
            focusable: true,
            interactive: true,
            selector: None,
            backend_node_id: None,
        }
    }

    fn payload(&self) -> String {
        let raw = RawPage {
            url: self.url.clone(),
            title: self.title.clone(),
            scroll: self.scroll,
            elements: self.elements.clone(),
        };
        serde_json::to_string(&raw).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Scripted reaction to a click or key press.
#[derive(Debug, Clone)]
pub enum PageEffect {
    /// Load the registered page at this URL (or a blank one).
    NavigateTo(String),
    /// Replace the current page content in place.
    ShowPage(FakePage),
    /// Append elements to the current page (modal/overlay style).
    AddElements(Vec<RawElement>),
    /// Remove the element at this position.
    RemoveElement(u32),
}

#[derive(Debug)]
struct TabState {
    id: TabId,
    page: FakePage,
    back_stack: Vec<FakePage>,
    forward_stack: Vec<FakePage>,
}

#[derive(Debug, Default)]
struct Inner {
    tabs: Vec<TabState>,
    active: usize,
    registry: HashMap<String, FakePage>,
    click_effects: HashMap<(String, u32), PageEffect>,
    key_effects: HashMap<(String, String), PageEffect>,
    eval_results: HashMap<String, String>,
    operations: Vec<String>,
    closed: bool,
}

/// The in-memory adapter. All state sits behind one mutex, mirroring the
/// single-lock tab-table rule real drivers follow.
#[derive(Debug)]
pub struct FakeBrowser {
    inner: Mutex<Inner>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBrowser {
    /// A browser with a single blank tab.
    pub fn new() -> Self {
        Self::with_page(FakePage::new("about:blank", ""))
    }

    /// A browser whose first tab shows `page`; the page is also registered
    /// under its URL for later navigation.
    pub fn with_page(page: FakePage) -> Self {
        let mut inner = Inner::default();
        inner.registry.insert(page.url.clone(), page.clone());
        inner.tabs.push(TabState {
            id: TabId::new(),
            page,
            back_stack: Vec::new(),
            forward_stack: Vec::new(),
        });
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Register a page reachable through navigation or effects.
    pub fn register_page(&self, page: FakePage) {
        self.inner.lock().registry.insert(page.url.clone(), page);
    }

    /// Attach an effect to clicking element `index` while on `url`.
    pub fn on_click(&self, url: &str, index: u32, effect: PageEffect) {
        self.inner
            .lock()
            .click_effects
            .insert((url.to_string(), index), effect);
    }

    /// Attach an effect to sending `keys` while on `url`.
    pub fn on_keys(&self, url: &str, keys: &str, effect: PageEffect) {
        self.inner
            .lock()
            .key_effects
            .insert((url.to_string(), keys.to_string()), effect);
    }

    /// Pre-program the result of a non-extraction script.
    pub fn set_eval_result(&self, script: &str, result: &str) {
        self.inner
            .lock()
            .eval_results
            .insert(script.to_string(), result.to_string());
    }

    /// Every operation performed so far, as `name:detail` strings.
    pub fn operations(&self) -> Vec<String> {
        self.inner.lock().operations.clone()
    }

    /// How many recorded operations start with `prefix`.
    pub fn operation_count(&self, prefix: &str) -> usize {
        self.inner
            .lock()
            .operations
            .iter()
            .filter(|op| op.starts_with(prefix))
            .count()
    }

    fn guard(&self, cancel: &CancellationToken) -> Result<(), AdapterError> {
        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        if self.inner.lock().closed {
            return Err(AdapterError::BrowserClosed);
        }
        Ok(())
    }

    fn log(&self, entry: String) {
        self.inner.lock().operations.push(entry);
    }

    fn with_active<R>(
        &self,
        f: impl FnOnce(&mut Inner, usize) -> Result<R, AdapterError>,
    ) -> Result<R, AdapterError> {
        let mut inner = self.inner.lock();
        let active = inner.active;
        f(&mut inner, active)
    }

    fn resolve_element(
        inner: &Inner,
        active: usize,
        index: u32,
        map: &ElementMap,
    ) -> Result<(), AdapterError> {
        if map.lookup(index).is_none() {
            return Err(AdapterError::ElementNotFound { index });
        }
        let page = &inner.tabs[active].page;
        let element = page
            .elements
            .get(index as usize)
            .ok_or(AdapterError::ElementNotFound { index })?;
        if !element.enabled {
            return Err(AdapterError::ElementNotVisible { index });
        }
        Ok(())
    }

    fn apply_effect(inner: &mut Inner, active: usize, effect: PageEffect) {
        match effect {
            PageEffect::NavigateTo(url) => {
                let next = inner
                    .registry
                    .get(&url)
                    .cloned()
                    .unwrap_or_else(|| FakePage::new(url.clone(), ""));
                let tab = &mut inner.tabs[active];
                let previous = std::mem::replace(&mut tab.page, next);
                tab.back_stack.push(previous);
                tab.forward_stack.clear();
            }
            PageEffect::ShowPage(page) => {
                inner.tabs[active].page = page;
            }
            PageEffect::AddElements(elements) => {
                inner.tabs[active].page.elements.extend(elements);
            }
            PageEffect::RemoveElement(index) => {
                let elements = &mut inner.tabs[active].page.elements;
                if (index as usize) < elements.len() {
                    elements.remove(index as usize);
                }
            }
        }
    }
}

#[async_trait]
impl BrowserAdapter for FakeBrowser {
    async fn navigate(&self, url: &str, cancel: &CancellationToken) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        Url::parse(url).map_err(|err| AdapterError::navigation(url, err.to_string()))?;
        self.log(format!("navigate:{url}"));
        self.with_active(|inner, active| {
            Self::apply_effect(inner, active, PageEffect::NavigateTo(url.to_string()));
            Ok(())
        })
    }

    async fn go_back(&self, cancel: &CancellationToken) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log("go_back".to_string());
        self.with_active(|inner, active| {
            let tab = &mut inner.tabs[active];
            if let Some(previous) = tab.back_stack.pop() {
                let current = std::mem::replace(&mut tab.page, previous);
                tab.forward_stack.push(current);
            }
            Ok(())
        })
    }

    async fn go_forward(&self, cancel: &CancellationToken) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log("go_forward".to_string());
        self.with_active(|inner, active| {
            let tab = &mut inner.tabs[active];
            if let Some(next) = tab.forward_stack.pop() {
                let current = std::mem::replace(&mut tab.page, next);
                tab.back_stack.push(current);
            }
            Ok(())
        })
    }

    async fn reload(&self, cancel: &CancellationToken) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log("reload".to_string());
        self.with_active(|inner, active| {
            let url = inner.tabs[active].page.url.clone();
            if let Some(fresh) = inner.registry.get(&url).cloned() {
                inner.tabs[active].page = fresh;
            }
            Ok(())
        })
    }

    async fn click(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("click:{index}"));
        self.with_active(|inner, active| {
            Self::resolve_element(inner, active, index, map)?;
            let url = inner.tabs[active].page.url.clone();
            if let Some(effect) = inner.click_effects.get(&(url, index)).cloned() {
                Self::apply_effect(inner, active, effect);
            }
            Ok(())
        })
    }

    async fn double_click(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("double_click:{index}"));
        self.with_active(|inner, active| Self::resolve_element(inner, active, index, map))
    }

    async fn hover(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("hover:{index}"));
        self.with_active(|inner, active| Self::resolve_element(inner, active, index, map))
    }

    async fn focus(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("focus:{index}"));
        self.with_active(|inner, active| Self::resolve_element(inner, active, index, map))
    }

    async fn type_text(
        &self,
        index: u32,
        text: &str,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("type:{index}:{text}"));
        self.with_active(|inner, active| {
            Self::resolve_element(inner, active, index, map)?;
            let element = &mut inner.tabs[active].page.elements[index as usize];
            let mut value = element.value.clone().unwrap_or_default();
            value.push_str(text);
            element.value = Some(value);
            Ok(())
        })
    }

    async fn clear_and_type(
        &self,
        index: u32,
        text: &str,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("clear_and_type:{index}:{text}"));
        self.with_active(|inner, active| {
            Self::resolve_element(inner, active, index, map)?;
            inner.tabs[active].page.elements[index as usize].value = Some(text.to_string());
            Ok(())
        })
    }

    async fn scroll(
        &self,
        direction: ScrollDirection,
        pixels: i64,
        element: Option<u32>,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("scroll:{direction:?}:{pixels}"));
        self.with_active(|inner, active| {
            if let Some(index) = element {
                Self::resolve_element(inner, active, index, map)?;
            }
            let scroll = &mut inner.tabs[active].page.scroll;
            let max = (scroll.total_height - scroll.viewport_height).max(0);
            match direction {
                ScrollDirection::Down => {
                    scroll.pixels_from_top = (scroll.pixels_from_top + pixels).min(max)
                }
                ScrollDirection::Up => {
                    scroll.pixels_from_top = (scroll.pixels_from_top - pixels).max(0)
                }
                ScrollDirection::Left | ScrollDirection::Right => {}
            }
            Ok(())
        })
    }

    async fn scroll_to_element(
        &self,
        index: u32,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("scroll_to_element:{index}"));
        self.with_active(|inner, active| {
            Self::resolve_element(inner, active, index, map)?;
            let scroll = &mut inner.tabs[active].page.scroll;
            let target = map
                .lookup(index)
                .map(|el| el.bounds.y as i64)
                .unwrap_or_default();
            let max = (scroll.total_height - scroll.viewport_height).max(0);
            scroll.pixels_from_top = target.clamp(0, max);
            Ok(())
        })
    }

    async fn send_keys(&self, keys: &str, cancel: &CancellationToken) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        self.log(format!("send_keys:{keys}"));
        self.with_active(|inner, active| {
            let url = inner.tabs[active].page.url.clone();
            if let Some(effect) = inner.key_effects.get(&(url, keys.to_string())).cloned() {
                Self::apply_effect(inner, active, effect);
            }
            Ok(())
        })
    }

    async fn evaluate(
        &self,
        script: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AdapterError> {
        self.guard(cancel)?;
        let inner = self.inner.lock();
        if script == PAGE_EXTRACT_SCRIPT {
            return Ok(inner.tabs[inner.active].page.payload());
        }
        if let Some(result) = inner.eval_results.get(script) {
            return Ok(result.clone());
        }
        Ok("null".to_string())
    }

    async fn extract_text(&self, cancel: &CancellationToken) -> Result<String, AdapterError> {
        self.guard(cancel)?;
        let inner = self.inner.lock();
        Ok(inner.tabs[inner.active].page.text.clone())
    }

    async fn screenshot(
        &self,
        full_page: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AdapterError> {
        self.guard(cancel)?;
        self.log(format!("screenshot:{full_page}"));
        let mut bytes = FAKE_JPEG.to_vec();
        bytes.extend(std::iter::repeat(0u8).take(64));
        Ok(bytes)
    }

    async fn current_url(&self, cancel: &CancellationToken) -> Result<String, AdapterError> {
        self.guard(cancel)?;
        let inner = self.inner.lock();
        Ok(inner.tabs[inner.active].page.url.clone())
    }

    async fn current_title(&self, cancel: &CancellationToken) -> Result<String, AdapterError> {
        self.guard(cancel)?;
        let inner = self.inner.lock();
        Ok(inner.tabs[inner.active].page.title.clone())
    }

    async fn accessibility_tree(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Value, AdapterError> {
        self.guard(cancel)?;
        let inner = self.inner.lock();
        Ok(inner.tabs[inner.active].page.ax_tree.clone())
    }

    async fn new_tab(
        &self,
        url: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<TabId, AdapterError> {
        self.guard(cancel)?;
        let mut inner = self.inner.lock();
        let page = match url {
            Some(url) => inner
                .registry
                .get(url)
                .cloned()
                .unwrap_or_else(|| FakePage::new(url, "")),
            None => FakePage::new("about:blank", ""),
        };
        let id = TabId::new();
        self_log(&mut inner, format!("new_tab:{}", page.url));
        inner.tabs.push(TabState {
            id: id.clone(),
            page,
            back_stack: Vec::new(),
            forward_stack: Vec::new(),
        });
        inner.active = inner.tabs.len() - 1;
        Ok(id)
    }

    async fn switch_tab(
        &self,
        tab: &TabId,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        let mut inner = self.inner.lock();
        let position = inner
            .tabs
            .iter()
            .position(|t| &t.id == tab)
            .ok_or_else(|| AdapterError::TabNotFound(tab.to_string()))?;
        inner.active = position;
        self_log(&mut inner, format!("switch_tab:{tab}"));
        Ok(())
    }

    async fn close_tab(
        &self,
        tab: &TabId,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        self.guard(cancel)?;
        let mut inner = self.inner.lock();
        let position = inner
            .tabs
            .iter()
            .position(|t| &t.id == tab)
            .ok_or_else(|| AdapterError::TabNotFound(tab.to_string()))?;
        inner.tabs.remove(position);
        if inner.tabs.is_empty() {
            inner.tabs.push(TabState {
                id: TabId::new(),
                page: FakePage::new("about:blank", ""),
                back_stack: Vec::new(),
                forward_stack: Vec::new(),
            });
        }
        if inner.active >= inner.tabs.len() {
            inner.active = inner.tabs.len() - 1;
        }
        self_log(&mut inner, format!("close_tab:{tab}"));
        Ok(())
    }

    async fn list_tabs(&self, cancel: &CancellationToken) -> Result<Vec<TabInfo>, AdapterError> {
        self.guard(cancel)?;
        let inner = self.inner.lock();
        Ok(inner
            .tabs
            .iter()
            .enumerate()
            .map(|(i, tab)| TabInfo {
                id: tab.id.clone(),
                url: tab.page.url.clone(),
                title: tab.page.title.clone(),
                active: i == inner.active,
            })
            .collect())
    }

    async fn wait_stable(
        &self,
        _window: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        // The fake page is always stable; only honor cancellation.
        self.guard(cancel)
    }

    async fn close(&self, cancel: &CancellationToken) -> Result<(), AdapterError> {
        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        self.inner.lock().closed = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.inner.lock().closed
    }
}

fn self_log(inner: &mut Inner, entry: String) {
    inner.operations.push(entry);
}
