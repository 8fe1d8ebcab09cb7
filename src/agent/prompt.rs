//! Prompt assembly for the agent loop.
//!
//! Builds the initial and continuation user messages, renders the history
//! digest, and passes every outgoing character through the redactor. When
//! vision is enabled the screenshot rides along as an inline JPEG part.

use perceiver_dom::{render_listing, ElementMap};
use privacy_guard::Redactor;

use crate::agent::history::AgentHistory;
use crate::llm::UserContent;
use crate::observation::Obstruction;

/// System prompt installed at session creation.
pub const SYSTEM_PROMPT: &str = r#"You are a browser automation agent driving a real web browser to accomplish the user's goal.

Each turn you receive the current page state: URL, title, scroll position and a numbered listing of interactive elements, plus the outcome of your previous action. A screenshot is attached when vision is enabled; treat it as ground truth when it conflicts with the listing.

## Element listing
One line per interactive element:
[12] input[text] "Search" value="query" (120,40)
Only bracketed indices are actionable, and indices are only valid for the
current page state. Never reuse an index after the page changed.

## Rules
- Call exactly one tool at a time and wait for its result.
- Use `navigate` for URLs; never type a URL into a search box.
- Fill form fields before submitting; prefer `send_keys` with "Enter" to submit a focused search field.
- If an action fails, re-read the element listing before retrying; the index may have changed.
- If the page shows a captcha or a login wall you cannot pass, call `request_human_takeover`.
- Call `done` exactly once, as your final tool call, with `success` reflecting whether the goal was truly accomplished and a concise `summary`. Include structured findings in `data` when the task asked for information.

## Progress notes
Before your tool call you may write plain-text notes; three prefixes are preserved across turns:
- `Evaluation: <did the previous action achieve its goal?>`
- `Memory: <facts to carry forward, e.g. important indices or values>`
- `Next goal: <what this step should achieve>`
Everything else you write is treated as scratch reasoning and discarded.
"#;

/// Assembles user-turn content.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    redactor: Redactor,
    enable_vision: bool,
}

impl PromptBuilder {
    pub fn new(redactor: Redactor, enable_vision: bool) -> Self {
        Self {
            redactor,
            enable_vision,
        }
    }

    /// The first message of a task.
    pub fn initial(
        &self,
        task: &str,
        map: &ElementMap,
        has_image: bool,
        obstruction: Option<Obstruction>,
    ) -> String {
        let mut message = String::new();
        message.push_str("## Task\n");
        message.push_str(task);
        message.push('\n');
        self.push_state_block(&mut message, map, has_image, obstruction);
        self.redactor.redact(&message)
    }

    /// Every subsequent message: last result, digest, fresh state.
    #[allow(clippy::too_many_arguments)]
    pub fn continuation(
        &self,
        map: &ElementMap,
        last_tool: &str,
        last_result: &str,
        last_success: bool,
        history: &AgentHistory,
        step: u32,
        max_steps: u32,
        has_image: bool,
        obstruction: Option<Obstruction>,
    ) -> String {
        let mut message = String::new();

        message.push_str("## Last Action\n");
        let status = if last_success { "✓" } else { "✗" };
        message.push_str(&format!("{status} {last_tool} -> {last_result}\n"));

        let failures = history.consecutive_failures();
        if failures >= 2 {
            message.push_str(&format!(
                "\n## Warning\n{failures} consecutive actions failed. Re-read the element \
                 listing, consider scrolling or navigating, and change approach before \
                 retrying the same call.\n"
            ));
        }

        let digest = history.digest();
        if !digest.is_empty() {
            message.push_str("\n## Previous Steps\n");
            message.push_str(&digest);
            message.push('\n');
        }

        if !history.memory().is_empty() {
            message.push_str("\n## Memory\n");
            message.push_str(history.memory());
            message.push('\n');
        }

        message.push_str(&format!("\n## Step\n{step} of {max_steps}\n"));
        self.push_state_block(&mut message, map, has_image, obstruction);
        self.redactor.redact(&message)
    }

    fn push_state_block(
        &self,
        message: &mut String,
        map: &ElementMap,
        has_image: bool,
        obstruction: Option<Obstruction>,
    ) {
        message.push_str("\n## Current Page\n");
        message.push_str(&format!("URL: {}\n", map.url));
        if !map.title.is_empty() {
            message.push_str(&format!("Title: {}\n", map.title));
        }

        let scroll = map.scroll;
        if scroll.total_height > 0 {
            message.push_str(&format!(
                "Scroll: {}% ({}px of {}px)\n",
                scroll.scroll_percentage() as i64,
                scroll.pixels_from_top,
                scroll.total_height
            ));
        }

        if let Some(kind) = obstruction {
            message.push_str(&format!(
                "Page obstruction: {} (consider request_human_takeover if it blocks the task)\n",
                kind.as_str()
            ));
        }

        message.push_str(&format!(
            "\n## Interactive Elements ({} total)\n",
            map.len()
        ));
        message.push_str(&render_listing(map));
        message.push('\n');

        if has_image {
            message.push_str("\n[Screenshot attached: image/jpeg]\n");
        } else {
            message.push_str("\n[No screenshot attached]\n");
        }
    }

    /// Wrap text (and the screenshot, when vision is on) into model content.
    pub fn assemble(&self, text: String, screenshot: Option<&[u8]>) -> UserContent {
        let content = UserContent::text(text);
        match screenshot {
            Some(bytes) if self.enable_vision => content.with_jpeg(bytes),
            _ => content,
        }
    }

    pub fn vision_enabled(&self) -> bool {
        self.enable_vision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::history::HistoryItem;
    use perceiver_dom::{ElementMapBuilder, RawElement, RawPage};
    use serde_json::json;

    fn sample_map() -> ElementMap {
        let input = RawElement {
            tag: "input".to_string(),
            role: String::new(),
            name: String::new(),
            text: String::new(),
            input_type: Some("text".to_string()),
            href: None,
            placeholder: Some("Search".to_string()),
            value: Some(String::new()),
            aria_label: None,
            bounds: perceiver_dom::BoundingBox::new(10.0, 10.0, 200.0, 30.0),
            visible: true,
            enabled: true,
            focusable: true,
            interactive: true,
            selector: None,
            backend_node_id: None,
        };
        ElementMapBuilder::default().build(RawPage {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            scroll: perceiver_dom::RawScroll {
                pixels_from_top: 600,
                total_height: 2000,
                viewport_height: 800,
            },
            elements: vec![input],
        })
    }

    fn builder() -> PromptBuilder {
        PromptBuilder::new(Redactor::new(), false)
    }

    #[test]
    fn initial_message_has_task_state_and_listing() {
        let message = builder().initial("Open example.com", &sample_map(), false, None);
        assert!(message.contains("## Task\nOpen example.com"));
        assert!(message.contains("URL: https://example.com"));
        assert!(message.contains("Title: Example"));
        assert!(message.contains("## Interactive Elements (1 total)"));
        assert!(message.contains("[0] input[text] \"Search\""));
        assert!(message.contains("[No screenshot attached]"));
        assert!(message.contains("Scroll: 50%"));
    }

    #[test]
    fn continuation_includes_last_action_and_step_counter() {
        let mut history = AgentHistory::new("task", 20);
        history.push(
            HistoryItem::new(1, "navigate", json!({"url": "https://example.com"}))
                .with_result(json!({"success": true}), true, 10),
        );
        let message = builder().continuation(
            &sample_map(),
            "navigate",
            r#"{"success":true,"url":"https://example.com"}"#,
            true,
            &history,
            2,
            50,
            false,
            None,
        );
        assert!(message.contains("## Last Action\n✓ navigate"));
        assert!(message.contains("## Previous Steps\nStep 1 ✓ navigate"));
        assert!(message.contains("## Step\n2 of 50"));
        assert!(!message.contains("## Warning"));
    }

    #[test]
    fn warning_block_appears_after_two_failures() {
        let mut history = AgentHistory::new("task", 20);
        for step in 1..=2 {
            history.push(
                HistoryItem::new(step, "click", json!({"element_index": 9}))
                    .with_result(json!({"success": false}), false, 2),
            );
        }
        let message = builder().continuation(
            &sample_map(),
            "click",
            r#"{"success":false}"#,
            false,
            &history,
            3,
            50,
            false,
            None,
        );
        assert!(message.contains("## Warning"));
        assert!(message.contains("2 consecutive actions failed"));
    }

    #[test]
    fn secrets_never_leave_the_prompt_builder() {
        let message = builder().initial(
            r#"Log in with api_key="AKIA_ABCDEFGHIJKLMNOPQRST""#,
            &sample_map(),
            false,
            None,
        );
        assert!(message.contains(r#"<secret type="api_key">[REDACTED]</secret>"#));
        assert!(!message.contains("AKIA_ABCDEFGHIJKLMNOPQRST"));
    }

    #[test]
    fn obstruction_line_is_rendered() {
        let message = builder().initial(
            "find prices",
            &sample_map(),
            false,
            Some(Obstruction::Captcha),
        );
        assert!(message.contains("Page obstruction: captcha"));
    }

    #[test]
    fn assemble_attaches_image_only_with_vision() {
        let visionless = builder().assemble("text".to_string(), Some(&[0xFF, 0xD8]));
        assert!(!visionless.has_image());
        let vision = PromptBuilder::new(Redactor::new(), true)
            .assemble("text".to_string(), Some(&[0xFF, 0xD8]));
        assert!(vision.has_image());
    }
}
