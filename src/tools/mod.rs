//! The fixed tool vocabulary exposed to the model.
//!
//! Every tool carries a typed argument struct with a derived JSON schema;
//! the registry parses incoming `(name, args)` pairs into the [`ToolArgs`]
//! tagged union and rejects unknown names with a structured error instead
//! of a panic or a silent fallback.

mod dispatch;

pub use dispatch::{DispatchOutcome, TakeoverGate, TakeoverHandle, ToolDispatcher};

use action_verify::ActionKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from parsing a model-emitted tool call.
#[derive(Debug, Error)]
pub enum ToolParseError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for '{name}': {source}")]
    InvalidArgs {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One tool as declared to the model transport.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NavigateArgs {
    /// Absolute URL to open.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ElementArgs {
    /// Index from the current element listing.
    pub element_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypeTextArgs {
    /// Index from the current element listing.
    pub element_index: u32,
    /// Text to enter.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScrollArgs {
    /// One of `up`, `down`, `left`, `right`.
    pub direction: String,
    /// Pixels to scroll; defaults to the configured amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// Scope the scroll to the container holding this element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SendKeysArgs {
    /// Key sequence, e.g. `Enter` or `Control+a`.
    pub keys: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SimpleArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScreenshotArgs {
    /// Capture the full page instead of the viewport.
    #[serde(default)]
    pub full_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EvaluateJsArgs {
    /// JavaScript to evaluate in the page.
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WaitArgs {
    /// Duration in milliseconds, clamped to [1, 10000].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NewTabArgs {
    /// URL to open in the new tab; blank when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TabArgs {
    /// Tab id from `list_tabs`.
    pub tab_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TakeoverArgs {
    /// Why the agent cannot proceed (captcha, login wall, ...).
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DoneArgs {
    /// Whether the task was accomplished.
    pub success: bool,
    /// Human-readable outcome summary.
    pub summary: String,
    /// Structured payload extracted for the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A parsed, validated tool call.
#[derive(Debug, Clone)]
pub enum ToolArgs {
    Navigate(NavigateArgs),
    Click(ElementArgs),
    TypeText(TypeTextArgs),
    ClearAndType(TypeTextArgs),
    Scroll(ScrollArgs),
    ScrollToElement(ElementArgs),
    SendKeys(SendKeysArgs),
    GoBack(SimpleArgs),
    GoForward(SimpleArgs),
    Reload(SimpleArgs),
    Hover(ElementArgs),
    DoubleClick(ElementArgs),
    Focus(ElementArgs),
    ExtractContent(SimpleArgs),
    Screenshot(ScreenshotArgs),
    EvaluateJs(EvaluateJsArgs),
    Wait(WaitArgs),
    NewTab(NewTabArgs),
    SwitchTab(TabArgs),
    CloseTab(TabArgs),
    ListTabs(SimpleArgs),
    GetPageState(SimpleArgs),
    RequestHumanTakeover(TakeoverArgs),
    Done(DoneArgs),
}

impl ToolArgs {
    pub fn name(&self) -> &'static str {
        match self {
            ToolArgs::Navigate(_) => "navigate",
            ToolArgs::Click(_) => "click",
            ToolArgs::TypeText(_) => "type_text",
            ToolArgs::ClearAndType(_) => "clear_and_type",
            ToolArgs::Scroll(_) => "scroll",
            ToolArgs::ScrollToElement(_) => "scroll_to_element",
            ToolArgs::SendKeys(_) => "send_keys",
            ToolArgs::GoBack(_) => "go_back",
            ToolArgs::GoForward(_) => "go_forward",
            ToolArgs::Reload(_) => "reload",
            ToolArgs::Hover(_) => "hover",
            ToolArgs::DoubleClick(_) => "double_click",
            ToolArgs::Focus(_) => "focus",
            ToolArgs::ExtractContent(_) => "extract_content",
            ToolArgs::Screenshot(_) => "screenshot",
            ToolArgs::EvaluateJs(_) => "evaluate_js",
            ToolArgs::Wait(_) => "wait",
            ToolArgs::NewTab(_) => "new_tab",
            ToolArgs::SwitchTab(_) => "switch_tab",
            ToolArgs::CloseTab(_) => "close_tab",
            ToolArgs::ListTabs(_) => "list_tabs",
            ToolArgs::GetPageState(_) => "get_page_state",
            ToolArgs::RequestHumanTakeover(_) => "request_human_takeover",
            ToolArgs::Done(_) => "done",
        }
    }

    /// The element index this call targets, when it targets one.
    pub fn element_index(&self) -> Option<u32> {
        match self {
            ToolArgs::Click(args)
            | ToolArgs::ScrollToElement(args)
            | ToolArgs::Hover(args)
            | ToolArgs::DoubleClick(args)
            | ToolArgs::Focus(args) => Some(args.element_index),
            ToolArgs::TypeText(args) | ToolArgs::ClearAndType(args) => Some(args.element_index),
            ToolArgs::Scroll(args) => args.element_index,
            _ => None,
        }
    }

    /// The `reasoning` string, when supplied. Logged, never persisted.
    pub fn reasoning(&self) -> Option<&str> {
        match self {
            ToolArgs::Navigate(a) => a.reasoning.as_deref(),
            ToolArgs::Click(a)
            | ToolArgs::ScrollToElement(a)
            | ToolArgs::Hover(a)
            | ToolArgs::DoubleClick(a)
            | ToolArgs::Focus(a) => a.reasoning.as_deref(),
            ToolArgs::TypeText(a) | ToolArgs::ClearAndType(a) => a.reasoning.as_deref(),
            ToolArgs::Scroll(a) => a.reasoning.as_deref(),
            ToolArgs::SendKeys(a) => a.reasoning.as_deref(),
            ToolArgs::GoBack(a)
            | ToolArgs::GoForward(a)
            | ToolArgs::Reload(a)
            | ToolArgs::ExtractContent(a)
            | ToolArgs::ListTabs(a)
            | ToolArgs::GetPageState(a) => a.reasoning.as_deref(),
            ToolArgs::Screenshot(a) => a.reasoning.as_deref(),
            ToolArgs::EvaluateJs(a) => a.reasoning.as_deref(),
            ToolArgs::Wait(a) => a.reason.as_deref(),
            ToolArgs::NewTab(a) => a.reasoning.as_deref(),
            ToolArgs::SwitchTab(a) | ToolArgs::CloseTab(a) => a.reasoning.as_deref(),
            ToolArgs::RequestHumanTakeover(a) => Some(&a.reason),
            ToolArgs::Done(_) => None,
        }
    }

    /// Verification class for this call.
    pub fn action_kind(&self) -> ActionKind {
        match self {
            ToolArgs::Navigate(_)
            | ToolArgs::GoBack(_)
            | ToolArgs::GoForward(_)
            | ToolArgs::Reload(_) => ActionKind::Navigate,
            ToolArgs::Click(_) | ToolArgs::DoubleClick(_) => ActionKind::Click,
            ToolArgs::TypeText(_) | ToolArgs::ClearAndType(_) => ActionKind::Type,
            ToolArgs::Scroll(_) | ToolArgs::ScrollToElement(_) => ActionKind::Scroll,
            ToolArgs::Wait(_) => ActionKind::Wait,
            ToolArgs::SendKeys(_) | ToolArgs::Hover(_) | ToolArgs::Focus(_) => ActionKind::Neutral,
            _ => ActionKind::Neutral,
        }
    }

    /// Whether this call can change page state and therefore gets the full
    /// pre/post snapshot treatment.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ToolArgs::Navigate(_)
                | ToolArgs::GoBack(_)
                | ToolArgs::GoForward(_)
                | ToolArgs::Reload(_)
                | ToolArgs::Click(_)
                | ToolArgs::DoubleClick(_)
                | ToolArgs::TypeText(_)
                | ToolArgs::ClearAndType(_)
                | ToolArgs::Scroll(_)
                | ToolArgs::ScrollToElement(_)
                | ToolArgs::SendKeys(_)
        )
    }

    /// Text a type-style call enters, for verification.
    pub fn typed_text(&self) -> Option<&str> {
        match self {
            ToolArgs::TypeText(args) | ToolArgs::ClearAndType(args) => Some(&args.text),
            _ => None,
        }
    }
}

/// Result of one tool execution, serialized into the function response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    /// Tool-specific fields (url, tab_id, content, tabs, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "success": self.success, "message": self.message })
        })
    }
}

/// The static tool registry.
pub struct ToolRegistry;

impl ToolRegistry {
    /// Declarations for every registered tool, in a stable order.
    pub fn declarations() -> Vec<ToolDeclaration> {
        vec![
            declare::<NavigateArgs>("navigate", "Open an absolute URL in the active tab"),
            declare::<ElementArgs>("click", "Click the element at the given index"),
            declare::<TypeTextArgs>("type_text", "Type text into the element at the given index"),
            declare::<TypeTextArgs>(
                "clear_and_type",
                "Clear the element's value, then type the given text",
            ),
            declare::<ScrollArgs>("scroll", "Scroll the page or a specific element's container"),
            declare::<ElementArgs>("scroll_to_element", "Scroll until the element is in view"),
            declare::<SendKeysArgs>("send_keys", "Send a key sequence to the focused element"),
            declare::<SimpleArgs>("go_back", "Navigate back in tab history"),
            declare::<SimpleArgs>("go_forward", "Navigate forward in tab history"),
            declare::<SimpleArgs>("reload", "Reload the current page"),
            declare::<ElementArgs>("hover", "Hover the element at the given index"),
            declare::<ElementArgs>("double_click", "Double-click the element at the given index"),
            declare::<ElementArgs>("focus", "Focus the element at the given index"),
            declare::<SimpleArgs>("extract_content", "Extract the visible text of the page"),
            declare::<ScreenshotArgs>("screenshot", "Capture a screenshot of the page"),
            declare::<EvaluateJsArgs>("evaluate_js", "Evaluate JavaScript in the page"),
            declare::<WaitArgs>("wait", "Pause before the next observation"),
            declare::<NewTabArgs>("new_tab", "Open a new tab, optionally at a URL"),
            declare::<TabArgs>("switch_tab", "Make the given tab active"),
            declare::<TabArgs>("close_tab", "Close the given tab"),
            declare::<SimpleArgs>("list_tabs", "List open tabs with ids and URLs"),
            declare::<SimpleArgs>(
                "get_page_state",
                "Return the current URL, title and element listing",
            ),
            declare::<TakeoverArgs>(
                "request_human_takeover",
                "Signal that a human must take over (captcha, login, ...)",
            ),
            declare::<DoneArgs>("done", "Terminate the task with an outcome"),
        ]
    }

    /// Parse a model-emitted call into typed arguments.
    pub fn parse(name: &str, args: Value) -> Result<ToolArgs, ToolParseError> {
        fn typed<T: serde::de::DeserializeOwned>(
            name: &str,
            args: Value,
        ) -> Result<T, ToolParseError> {
            serde_json::from_value(args).map_err(|source| ToolParseError::InvalidArgs {
                name: name.to_string(),
                source,
            })
        }

        let parsed = match name {
            "navigate" => ToolArgs::Navigate(typed(name, args)?),
            "click" => ToolArgs::Click(typed(name, args)?),
            "type_text" => ToolArgs::TypeText(typed(name, args)?),
            "clear_and_type" => ToolArgs::ClearAndType(typed(name, args)?),
            "scroll" => ToolArgs::Scroll(typed(name, args)?),
            "scroll_to_element" => ToolArgs::ScrollToElement(typed(name, args)?),
            "send_keys" => ToolArgs::SendKeys(typed(name, args)?),
            "go_back" => ToolArgs::GoBack(typed(name, args)?),
            "go_forward" => ToolArgs::GoForward(typed(name, args)?),
            "reload" => ToolArgs::Reload(typed(name, args)?),
            "hover" => ToolArgs::Hover(typed(name, args)?),
            "double_click" => ToolArgs::DoubleClick(typed(name, args)?),
            "focus" => ToolArgs::Focus(typed(name, args)?),
            "extract_content" => ToolArgs::ExtractContent(typed(name, args)?),
            "screenshot" => ToolArgs::Screenshot(typed(name, args)?),
            "evaluate_js" => ToolArgs::EvaluateJs(typed(name, args)?),
            "wait" => ToolArgs::Wait(typed(name, args)?),
            "new_tab" => ToolArgs::NewTab(typed(name, args)?),
            "switch_tab" => ToolArgs::SwitchTab(typed(name, args)?),
            "close_tab" => ToolArgs::CloseTab(typed(name, args)?),
            "list_tabs" => ToolArgs::ListTabs(typed(name, args)?),
            "get_page_state" => ToolArgs::GetPageState(typed(name, args)?),
            "request_human_takeover" => ToolArgs::RequestHumanTakeover(typed(name, args)?),
            "done" => ToolArgs::Done(typed(name, args)?),
            other => return Err(ToolParseError::UnknownTool(other.to_string())),
        };
        Ok(parsed)
    }
}

fn declare<T: JsonSchema>(name: &str, description: &str) -> ToolDeclaration {
    let schema = schemars::schema_for!(T);
    ToolDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters: serde_json::to_value(schema.schema).unwrap_or_else(|_| Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_declares_the_full_vocabulary() {
        let declarations = ToolRegistry::declarations();
        assert_eq!(declarations.len(), 24);
        let names: Vec<&str> = declarations.iter().map(|d| d.name.as_str()).collect();
        for required in [
            "navigate",
            "click",
            "type_text",
            "clear_and_type",
            "scroll",
            "send_keys",
            "done",
            "request_human_takeover",
            "get_page_state",
            "list_tabs",
        ] {
            assert!(names.contains(&required), "missing {required}");
        }
    }

    #[test]
    fn declarations_carry_object_schemas() {
        let declarations = ToolRegistry::declarations();
        let navigate = declarations.iter().find(|d| d.name == "navigate").unwrap();
        let properties = navigate.parameters.get("properties").unwrap();
        assert!(properties.get("url").is_some());
    }

    #[test]
    fn parses_known_tools_into_typed_args() {
        let parsed = ToolRegistry::parse("click", json!({"element_index": 4})).unwrap();
        assert_eq!(parsed.name(), "click");
        assert_eq!(parsed.element_index(), Some(4));
        assert!(parsed.is_mutating());

        let parsed =
            ToolRegistry::parse("type_text", json!({"element_index": 1, "text": "hi"})).unwrap();
        assert_eq!(parsed.typed_text(), Some("hi"));

        let parsed = ToolRegistry::parse(
            "done",
            json!({"success": true, "summary": "all set", "data": {"n": 1}}),
        )
        .unwrap();
        match parsed {
            ToolArgs::Done(done) => {
                assert!(done.success);
                assert_eq!(done.summary, "all set");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn unknown_tool_names_are_rejected_structurally() {
        let err = ToolRegistry::parse("frobnicate", json!({})).unwrap_err();
        assert!(matches!(err, ToolParseError::UnknownTool(name) if name == "frobnicate"));
    }

    #[test]
    fn malformed_arguments_are_rejected_with_the_tool_name() {
        let err = ToolRegistry::parse("click", json!({"element_index": "four"})).unwrap_err();
        match err {
            ToolParseError::InvalidArgs { name, .. } => assert_eq!(name, "click"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reasoning_is_surfaced_but_optional() {
        let parsed = ToolRegistry::parse(
            "navigate",
            json!({"url": "https://example.com", "reasoning": "user asked"}),
        )
        .unwrap();
        assert_eq!(parsed.reasoning(), Some("user asked"));
        let parsed = ToolRegistry::parse("navigate", json!({"url": "https://example.com"})).unwrap();
        assert!(parsed.reasoning().is_none());
    }

    #[test]
    fn tool_results_flatten_extra_fields() {
        let result = ToolResult::ok("navigated")
            .with("url", json!("https://example.com"))
            .to_json();
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["url"], json!("https://example.com"));
    }

    #[test]
    fn action_kinds_follow_tool_semantics() {
        let click = ToolRegistry::parse("click", json!({"element_index": 0})).unwrap();
        assert_eq!(click.action_kind(), ActionKind::Click);
        let wait = ToolRegistry::parse("wait", json!({})).unwrap();
        assert_eq!(wait.action_kind(), ActionKind::Wait);
        assert!(!wait.is_mutating());
        let state = ToolRegistry::parse("get_page_state", json!({})).unwrap();
        assert!(!state.is_mutating());
    }
}
