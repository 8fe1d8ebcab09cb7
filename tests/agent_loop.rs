//! End-to-end agent loop scenarios against the scripted transport and the
//! in-memory browser.

use std::sync::Arc;

use serde_json::json;

use webpilot::{
    Agent, AgentConfig, FakeBrowser, FakePage, ModelEvent, PageEffect, ScriptedTransport,
};

fn navigate_call(url: &str) -> ModelEvent {
    ModelEvent::function_call("navigate", json!({ "url": url }))
}

fn done_call(success: bool, summary: &str) -> ModelEvent {
    ModelEvent::function_call(
        "done",
        json!({ "success": success, "summary": summary }),
    )
}

fn agent_with(browser: FakeBrowser, transport: ScriptedTransport, config: AgentConfig) -> Agent {
    Agent::new(Arc::new(browser), Arc::new(transport), config)
}

fn example_browser() -> FakeBrowser {
    let browser = FakeBrowser::new();
    browser.register_page(
        FakePage::new("https://example.com", "Example Domain")
            .with_element(FakePage::link("More information", "https://iana.org")),
    );
    browser
}

#[tokio::test]
async fn simple_navigate_then_done() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        ModelEvent::text("I will open the site directly."),
        navigate_call("https://example.com"),
        ModelEvent::final_text("navigated"),
    ]);
    transport.push_turn(vec![done_call(true, "Opened example.com")]);

    let agent = agent_with(example_browser(), transport, AgentConfig::minimal());
    agent.start().unwrap();
    let result = agent.run("Open example.com").await.unwrap();

    assert!(result.success);
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.steps[0].tool, "navigate");
    assert!(result.steps[0].success);
    assert_eq!(result.steps[1].tool, "done");
    assert_eq!(result.summary.as_deref(), Some("Opened example.com"));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn type_into_search_and_submit() {
    let browser = FakeBrowser::with_page(
        FakePage::new("https://search.example", "Search")
            .with_element(FakePage::text_input("Search")),
    );
    browser.register_page(
        FakePage::new("https://search.example/results?q=golang", "golang - results")
            .with_element(FakePage::link("The Go Programming Language", "https://go.dev")),
    );
    browser.on_keys(
        "https://search.example",
        "Enter",
        PageEffect::NavigateTo("https://search.example/results?q=golang".to_string()),
    );

    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        ModelEvent::function_call("type_text", json!({"element_index": 0, "text": "golang"})),
        ModelEvent::final_text("typed the query"),
    ]);
    transport.push_turn(vec![
        ModelEvent::function_call("send_keys", json!({"keys": "Enter"})),
        ModelEvent::final_text("submitted"),
    ]);
    transport.push_turn(vec![done_call(true, "Found results for golang")]);

    let agent = agent_with(browser, transport, AgentConfig::minimal());
    agent.start().unwrap();
    let result = agent.run("Search for 'golang' on a search page").await.unwrap();

    assert!(result.success);
    assert_eq!(result.steps.len(), 3);
    assert!(result.steps.iter().all(|step| step.success));
    assert_eq!(result.steps[0].tool, "type_text");
    assert!(result.steps[0]
        .result_message
        .contains("contains typed text"));
    assert_eq!(result.steps[1].tool, "send_keys");
}

#[tokio::test]
async fn max_steps_termination_names_the_budget() {
    let transport = ScriptedTransport::new();
    for _ in 0..3 {
        transport.push_turn(vec![
            ModelEvent::function_call("scroll", json!({"direction": "down"})),
            ModelEvent::final_text("scrolling"),
        ]);
    }

    let config = AgentConfig::minimal().max_steps(3).max_failures(10);
    let agent = agent_with(example_browser(), transport, config);
    agent.start().unwrap();
    let result = agent.run("A task that would take ten tool calls").await.unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 3);
    let error = result.error.expect("must carry an error");
    assert!(error.contains("Max steps (3)"), "error was: {error}");
}

#[tokio::test]
async fn secrets_are_redacted_from_outgoing_prompts() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![done_call(false, "cannot use credentials")]);

    let agent = agent_with(example_browser(), transport.clone(), AgentConfig::minimal());
    agent.start().unwrap();
    let task = r#"Log in using api_key="AKIA_ABCDEFGHIJKLMNOPQRST" and report back"#;
    let result = agent.run(task).await.unwrap();
    assert!(!result.success);

    let sent = transport.received();
    assert!(!sent.is_empty());
    for content in &sent {
        assert!(!content.text.contains("AKIA_ABCDEFGHIJKLMNOPQRST"));
    }
    assert!(sent[0]
        .text
        .contains(r#"<secret type="api_key">[REDACTED]</secret>"#));
}

#[tokio::test]
async fn missing_element_index_fails_without_browser_effect() {
    let browser = Arc::new(FakeBrowser::with_page(
        FakePage::new("https://example.com", "Example")
            .with_element(FakePage::button("Only button")),
    ));

    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        ModelEvent::function_call("click", json!({"element_index": 99})),
        ModelEvent::final_text("clicking"),
    ]);
    transport.push_turn(vec![done_call(false, "element missing")]);

    let agent = Agent::new(
        browser.clone(),
        Arc::new(transport),
        AgentConfig::minimal().max_failures(5),
    );
    agent.start().unwrap();
    let result = agent.run("Click the 100th element").await.unwrap();

    let step = &result.steps[0];
    assert_eq!(step.tool, "click");
    assert!(!step.success);
    assert_eq!(step.result_message, "element not found");
    assert_eq!(step.retries, 0);
    // The invalid index never reached the browser.
    assert_eq!(browser.operation_count("click:"), 0);
}

#[tokio::test]
async fn first_failure_trips_a_budget_of_one() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        ModelEvent::function_call("click", json!({"element_index": 42})),
        ModelEvent::final_text("clicking"),
    ]);

    let config = AgentConfig::minimal().max_failures(1);
    let agent = agent_with(example_browser(), transport, config);
    agent.start().unwrap();
    let result = agent.run("Click something that is not there").await.unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    let error = result.error.expect("must carry an error");
    assert!(error.contains("consecutive failure"), "error was: {error}");
}

#[tokio::test]
async fn unknown_tool_names_become_failed_steps() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        ModelEvent::function_call("frobnicate", json!({})),
        ModelEvent::final_text("trying something odd"),
    ]);
    transport.push_turn(vec![done_call(false, "giving up")]);

    let agent = agent_with(example_browser(), transport, AgentConfig::minimal().max_failures(5));
    agent.start().unwrap();
    let result = agent.run("Do something impossible").await.unwrap();

    let step = &result.steps[0];
    assert_eq!(step.tool, "frobnicate");
    assert!(!step.success);
    assert!(step.result_message.contains("unknown tool"));
}

#[tokio::test]
async fn takeover_request_times_out_without_an_operator() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        ModelEvent::function_call(
            "request_human_takeover",
            json!({"reason": "captcha on the page"}),
        ),
        ModelEvent::final_text("asking for help"),
    ]);
    transport.push_turn(vec![done_call(false, "blocked by captcha")]);

    let agent = agent_with(example_browser(), transport, AgentConfig::minimal().max_failures(5));
    agent.start().unwrap();
    let result = agent.run("Get past the captcha").await.unwrap();

    let step = &result.steps[0];
    assert_eq!(step.tool, "request_human_takeover");
    assert!(!step.success);
    assert!(step.result_message.contains("timed out"));
    assert!(!result.success);
}

#[tokio::test]
async fn tab_tools_round_trip_through_the_loop() {
    let browser = FakeBrowser::with_page(FakePage::new("https://example.com", "Example"));
    browser.register_page(FakePage::new("https://docs.example", "Docs"));

    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        ModelEvent::function_call("new_tab", json!({"url": "https://docs.example"})),
        ModelEvent::final_text("opened a tab"),
    ]);
    transport.push_turn(vec![
        ModelEvent::function_call("list_tabs", json!({})),
        ModelEvent::final_text("listing"),
    ]);
    transport.push_turn(vec![done_call(true, "Docs open in second tab")]);

    let agent = agent_with(browser, transport, AgentConfig::minimal());
    agent.start().unwrap();
    let result = agent.run("Open the docs in a new tab").await.unwrap();

    assert!(result.success);
    assert!(result.steps[0].success);
    assert!(result.steps[1].result_message.contains("2 open tab"));
}

#[tokio::test]
async fn transport_declares_the_full_tool_vocabulary() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![done_call(true, "nothing to do")]);

    let agent = agent_with(example_browser(), transport.clone(), AgentConfig::minimal());
    agent.start().unwrap();
    agent.run("No-op task").await.unwrap();

    let declared = transport.declared_tools();
    assert_eq!(declared.len(), 24);
    for tool in ["navigate", "click", "done", "request_human_takeover"] {
        assert!(declared.iter().any(|name| name == tool));
    }
}

#[tokio::test]
async fn vision_mode_persists_step_screenshots_and_attaches_images() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        navigate_call("https://example.com"),
        ModelEvent::final_text("navigated"),
    ]);
    transport.push_turn(vec![done_call(true, "done")]);

    let config = AgentConfig::minimal()
        .vision(true)
        .screenshots(dir.path().to_path_buf());
    let agent = agent_with(example_browser(), transport.clone(), config);
    agent.start().unwrap();
    let result = agent.run("Open example.com").await.unwrap();

    assert!(result.success);
    assert!(!result.screenshot_paths.is_empty());
    for path in &result.screenshot_paths {
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("step_"), "unexpected name {name}");
        assert!(name.ends_with(".jpg"));
    }
    // The pre-turn capture is attached to that turn's message.
    let sent = transport.received();
    assert!(sent[0].has_image());
    assert_eq!(sent[0].image.as_ref().unwrap().mime, "image/jpeg");
    // The first step record carries the screenshot the model saw.
    assert!(result.steps[0].screenshot_path.is_some());
}

#[tokio::test]
async fn model_progress_notes_flow_into_later_prompts() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![
        ModelEvent::text("Memory: the search input is [0]\nNext goal: open the homepage"),
        navigate_call("https://example.com"),
        ModelEvent::final_text("Evaluation: navigation should have worked"),
    ]);
    transport.push_turn(vec![done_call(true, "done")]);

    let agent = agent_with(example_browser(), transport.clone(), AgentConfig::minimal());
    agent.start().unwrap();
    let result = agent.run("Open example.com").await.unwrap();
    assert!(result.success);

    let continuation = &transport.received()[1].text;
    assert!(continuation.contains("## Memory"));
    assert!(continuation.contains("the search input is [0]"));
    assert!(continuation.contains("eval: navigation should have worked"));
}
