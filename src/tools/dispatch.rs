//! Tool dispatch: validate → pre-snapshot → execute → post-snapshot →
//! verify → retry → score.
//!
//! Argument problems (missing index, unknown direction) never touch the
//! browser and come back as `success=false` results. Unverified mutating
//! actions are re-executed up to the retry budget; only after the budget is
//! spent does the call count as failed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use action_verify::{
    action_confidence, element_confidence, verify_action, ActionConfidence, PageSnapshot,
    Verification,
};
use browser_adapter::{extract_element_map, AdapterError, BrowserAdapter, ScrollDirection};
use perceiver_dom::{render_listing, ElementMap};
use webpilot_core_types::TabId;

use crate::config::{AgentConfig, EXTRACT_CONTENT_LIMIT};
use crate::tools::{ToolArgs, ToolResult};

/// Everything the loop wants to know about one dispatched call.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub result: ToolResult,
    pub verification: Option<Verification>,
    pub confidence: Option<ActionConfidence>,
    pub retries: u32,
}

impl DispatchOutcome {
    fn plain(result: ToolResult) -> Self {
        Self {
            result,
            verification: None,
            confidence: None,
            retries: 0,
        }
    }
}

/// Coordination point for `request_human_takeover`.
///
/// The embedder holds a [`TakeoverHandle`]; the dispatcher blocks (bounded)
/// until it is acknowledged.
#[derive(Debug, Default)]
pub struct TakeoverGate {
    notify: Notify,
}

/// Embedder-side handle acknowledging takeover requests.
#[derive(Debug, Clone)]
pub struct TakeoverHandle {
    gate: Arc<TakeoverGate>,
}

impl TakeoverHandle {
    pub fn new(gate: Arc<TakeoverGate>) -> Self {
        Self { gate }
    }

    /// Signal that a human has taken over (or finished taking over).
    pub fn acknowledge(&self) {
        self.gate.notify.notify_one();
    }
}

/// Executes validated tool calls against the browser adapter.
pub struct ToolDispatcher {
    browser: Arc<dyn BrowserAdapter>,
    config: AgentConfig,
    takeover: Arc<TakeoverGate>,
}

impl ToolDispatcher {
    pub fn new(
        browser: Arc<dyn BrowserAdapter>,
        config: AgentConfig,
        takeover: Arc<TakeoverGate>,
    ) -> Self {
        Self {
            browser,
            config,
            takeover,
        }
    }

    /// Dispatch one parsed tool call against the current element map.
    pub async fn dispatch(
        &self,
        args: &ToolArgs,
        map: &ElementMap,
        step: u32,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        if let Some(reasoning) = args.reasoning() {
            debug!(tool = args.name(), reasoning, "tool call reasoning");
        }

        // Index validation happens before any browser effect.
        if let Some(index) = args.element_index() {
            if map.lookup(index).is_none() {
                return DispatchOutcome::plain(ToolResult::fail("element not found"));
            }
        }
        if let ToolArgs::Scroll(scroll) = args {
            if ScrollDirection::parse(&scroll.direction).is_none() {
                return DispatchOutcome::plain(ToolResult::fail(format!(
                    "unknown scroll direction '{}'",
                    scroll.direction
                )));
            }
        }

        if args.is_mutating() {
            self.dispatch_mutating(args, map, cancel).await
        } else {
            DispatchOutcome::plain(self.dispatch_read(args, map, step, cancel).await)
        }
    }

    /// Full snapshot/verify/retry treatment for state-changing calls.
    async fn dispatch_mutating(
        &self,
        args: &ToolArgs,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let kind = args.action_kind();
        let targeting = args
            .element_index()
            .and_then(|index| map.lookup(index))
            .map(|element| element_confidence(element, map, kind));

        let pre = PageSnapshot::capture(map);
        let mut retries = 0;
        let mut verification;
        let mut result;

        loop {
            result = match self.execute(args, map, cancel).await {
                Ok(result) => result,
                Err(err) => return DispatchOutcome::plain(adapter_failure(err)),
            };

            tokio::time::sleep(Duration::from_millis(self.config.stabilization_delay_ms)).await;

            let post = match self.capture_post(cancel).await {
                Ok(post) => post,
                Err(err) => {
                    warn!(error = %err, "post-snapshot failed; accepting action unverified");
                    return DispatchOutcome {
                        result,
                        verification: None,
                        confidence: Some(action_confidence(
                            kind,
                            false,
                            retries,
                            targeting.as_ref(),
                            &[],
                        )),
                        retries,
                    };
                }
            };

            verification = verify_action(kind, args.element_index(), args.typed_text(), &pre, &post);
            if verification.verified || retries >= self.config.max_retries {
                break;
            }

            retries += 1;
            debug!(
                tool = args.name(),
                retries, "action unverified; retrying after delay"
            );
            tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
        }

        let confidence = action_confidence(
            kind,
            verification.verified,
            retries,
            targeting.as_ref(),
            &verification.changes,
        );

        let mut message = result.message.clone();
        if !verification.message.is_empty() {
            message = format!("{message}; {}", verification.message);
        }
        result.message = message;
        // Exhausting the retry budget without verification counts as a
        // failed action and feeds the consecutive-failure budget.
        if !verification.verified {
            result.success = false;
        }

        DispatchOutcome {
            result,
            verification: Some(verification),
            confidence: Some(confidence),
            retries,
        }
    }

    /// One raw execution of a mutating call.
    async fn execute(
        &self,
        args: &ToolArgs,
        map: &ElementMap,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, AdapterError> {
        let browser = self.browser.as_ref();
        match args {
            ToolArgs::Navigate(nav) => {
                browser.navigate(&nav.url, cancel).await?;
                let url = browser.current_url(cancel).await?;
                Ok(ToolResult::ok("navigated").with("url", json!(url)))
            }
            ToolArgs::GoBack(_) => {
                browser.go_back(cancel).await?;
                let url = browser.current_url(cancel).await?;
                Ok(ToolResult::ok("went back").with("url", json!(url)))
            }
            ToolArgs::GoForward(_) => {
                browser.go_forward(cancel).await?;
                let url = browser.current_url(cancel).await?;
                Ok(ToolResult::ok("went forward").with("url", json!(url)))
            }
            ToolArgs::Reload(_) => {
                browser.reload(cancel).await?;
                Ok(ToolResult::ok("reloaded"))
            }
            ToolArgs::Click(click) => {
                browser.click(click.element_index, map, cancel).await?;
                Ok(ToolResult::ok(format!(
                    "clicked element [{}]",
                    click.element_index
                )))
            }
            ToolArgs::DoubleClick(click) => {
                browser
                    .double_click(click.element_index, map, cancel)
                    .await?;
                Ok(ToolResult::ok(format!(
                    "double-clicked element [{}]",
                    click.element_index
                )))
            }
            ToolArgs::TypeText(type_args) => {
                browser
                    .type_text(type_args.element_index, &type_args.text, map, cancel)
                    .await?;
                Ok(ToolResult::ok(format!(
                    "typed into element [{}]",
                    type_args.element_index
                )))
            }
            ToolArgs::ClearAndType(type_args) => {
                browser
                    .clear_and_type(type_args.element_index, &type_args.text, map, cancel)
                    .await?;
                Ok(ToolResult::ok(format!(
                    "replaced value of element [{}]",
                    type_args.element_index
                )))
            }
            ToolArgs::Scroll(scroll) => {
                let direction = ScrollDirection::parse(&scroll.direction)
                    .unwrap_or(ScrollDirection::Down);
                let amount = scroll.amount.unwrap_or(self.config.default_scroll_amount);
                browser
                    .scroll(direction, amount, scroll.element_index, map, cancel)
                    .await?;
                Ok(ToolResult::ok(format!("scrolled {} {amount}px", scroll.direction)))
            }
            ToolArgs::ScrollToElement(target) => {
                browser
                    .scroll_to_element(target.element_index, map, cancel)
                    .await?;
                Ok(ToolResult::ok(format!(
                    "scrolled element [{}] into view",
                    target.element_index
                )))
            }
            ToolArgs::SendKeys(keys) => {
                browser.send_keys(&keys.keys, cancel).await?;
                Ok(ToolResult::ok(format!("sent keys '{}'", keys.keys)))
            }
            other => Err(AdapterError::EvaluationFailed(format!(
                "tool '{}' is not a mutating action",
                other.name()
            ))),
        }
    }

    /// Read-style calls: no snapshots, no retries.
    async fn dispatch_read(
        &self,
        args: &ToolArgs,
        map: &ElementMap,
        step: u32,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let browser = self.browser.as_ref();
        let outcome: Result<ToolResult, AdapterError> = match args {
            ToolArgs::Hover(target) => browser
                .hover(target.element_index, map, cancel)
                .await
                .map(|()| ToolResult::ok(format!("hovering element [{}]", target.element_index))),
            ToolArgs::Focus(target) => browser
                .focus(target.element_index, map, cancel)
                .await
                .map(|()| ToolResult::ok(format!("focused element [{}]", target.element_index))),
            ToolArgs::ExtractContent(_) => browser.extract_text(cancel).await.map(|text| {
                let truncated: String = text.chars().take(EXTRACT_CONTENT_LIMIT).collect();
                ToolResult::ok("extracted page text").with("content", json!(truncated))
            }),
            ToolArgs::Screenshot(shot) => match browser.screenshot(shot.full_page, cancel).await {
                Ok(bytes) => {
                    let saved = self.save_screenshot(step, &bytes).await;
                    let mut result =
                        ToolResult::ok("screenshot captured").with("bytes", json!(bytes.len()));
                    if let Some(path) = saved {
                        result = result.with("path", json!(path));
                    }
                    Ok(result)
                }
                Err(err) => Err(err),
            },
            ToolArgs::EvaluateJs(eval) => browser
                .evaluate(&eval.script, cancel)
                .await
                .map(|value| ToolResult::ok("evaluated").with("result", json!(value))),
            ToolArgs::Wait(wait) => {
                let ms = self.config.clamp_wait(wait.duration_ms);
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {
                        Ok(ToolResult::ok(format!("waited {ms}ms")))
                    }
                    _ = cancel.cancelled() => Err(AdapterError::Cancelled),
                }
            }
            ToolArgs::NewTab(tab) => browser
                .new_tab(tab.url.as_deref(), cancel)
                .await
                .map(|id| ToolResult::ok("opened tab").with("tab_id", json!(id.to_string()))),
            ToolArgs::SwitchTab(tab) => browser
                .switch_tab(&TabId::from_raw(tab.tab_id.clone()), cancel)
                .await
                .map(|()| ToolResult::ok(format!("switched to tab {}", tab.tab_id))),
            ToolArgs::CloseTab(tab) => browser
                .close_tab(&TabId::from_raw(tab.tab_id.clone()), cancel)
                .await
                .map(|()| ToolResult::ok(format!("closed tab {}", tab.tab_id))),
            ToolArgs::ListTabs(_) => browser.list_tabs(cancel).await.map(|tabs| {
                let listing: Vec<_> = tabs
                    .iter()
                    .map(|tab| {
                        json!({
                            "id": tab.id.to_string(),
                            "url": tab.url,
                            "title": tab.title,
                            "active": tab.active,
                        })
                    })
                    .collect();
                ToolResult::ok(format!("{} open tab(s)", tabs.len())).with("tabs", json!(listing))
            }),
            ToolArgs::GetPageState(_) => Ok(ToolResult::ok("page state captured")
                .with("url", json!(map.url))
                .with("title", json!(map.title))
                .with("element_count", json!(map.len()))
                .with("elements", json!(render_listing(map)))),
            ToolArgs::RequestHumanTakeover(takeover) => {
                warn!(reason = %takeover.reason, "human takeover requested");
                let timeout = Duration::from_millis(self.config.takeover_wait_ms);
                tokio::select! {
                    _ = self.takeover.notify.notified() => Ok(ToolResult::ok(
                        "human takeover acknowledged; continuing",
                    )),
                    _ = tokio::time::sleep(timeout) => Ok(ToolResult::fail(
                        "human takeover request timed out",
                    )),
                    _ = cancel.cancelled() => Err(AdapterError::Cancelled),
                }
            }
            ToolArgs::Done(_) => Ok(ToolResult::fail(
                "'done' is handled by the agent loop, not the dispatcher",
            )),
            other => Err(AdapterError::EvaluationFailed(format!(
                "tool '{}' routed to the wrong dispatcher",
                other.name()
            ))),
        };

        outcome.unwrap_or_else(adapter_failure)
    }

    async fn capture_post(&self, cancel: &CancellationToken) -> Result<PageSnapshot, AdapterError> {
        let map = extract_element_map(
            self.browser.as_ref(),
            self.config.element_budget.cap(),
            Duration::from_millis(self.config.stability_window_ms),
            cancel,
        )
        .await?;
        Ok(PageSnapshot::capture(&map))
    }

    async fn save_screenshot(&self, step: u32, bytes: &[u8]) -> Option<String> {
        let name = format!(
            "step_{step:03}_{}.jpg",
            chrono::Utc::now().timestamp_millis()
        );
        let path = self.config.screenshot_dir.join(name);
        if let Err(err) = tokio::fs::create_dir_all(&self.config.screenshot_dir).await {
            warn!(error = %err, "cannot create screenshot directory");
            return None;
        }
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => Some(path.to_string_lossy().into_owned()),
            Err(err) => {
                warn!(error = %err, "cannot write screenshot");
                None
            }
        }
    }
}

/// Map adapter failures onto tool results per the propagation policy.
fn adapter_failure(err: AdapterError) -> ToolResult {
    match &err {
        AdapterError::ElementNotFound { .. } => ToolResult::fail("element not found"),
        AdapterError::ElementNotVisible { index } => {
            ToolResult::fail(format!("element {index} is not visible"))
        }
        _ => ToolResult::fail(err.to_string()),
    }
}
