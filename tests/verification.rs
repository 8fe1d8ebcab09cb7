//! Verification-driven behaviors: retries, modal detection, snapshot laws.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use webpilot::tools::TakeoverGate;
use webpilot::{
    detect_changes, extract_element_map, AgentConfig, ElementBudget, ElementMap, FakeBrowser,
    FakePage, PageEffect, PageSnapshot, TakeoverHandle, ToolDispatcher, ToolRegistry,
};

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

async fn map_of(browser: &FakeBrowser) -> ElementMap {
    extract_element_map(browser, 100, Duration::from_millis(0), &cancel())
        .await
        .unwrap()
}

fn dispatcher(browser: Arc<FakeBrowser>, config: AgentConfig) -> ToolDispatcher {
    ToolDispatcher::new(browser, config, Arc::new(TakeoverGate::default()))
}

#[tokio::test]
async fn unverified_click_is_retried_then_reported_failed() {
    // A click with no page effect: pre and post snapshots stay identical.
    let browser = Arc::new(FakeBrowser::with_page(
        FakePage::new("https://inert.example", "Inert")
            .with_element(FakePage::button("Does nothing")),
    ));
    let config = AgentConfig::minimal().retries(2);
    let dispatcher = dispatcher(browser.clone(), config);

    let map = map_of(&browser).await;
    let args = ToolRegistry::parse("click", json!({"element_index": 0})).unwrap();
    let outcome = dispatcher.dispatch(&args, &map, 1, &cancel()).await;

    // Initial attempt plus two retries.
    assert_eq!(browser.operation_count("click:"), 3);
    assert_eq!(outcome.retries, 2);
    let verification = outcome.verification.expect("click must be verified");
    assert!(!verification.verified);
    assert!(verification.changes.is_empty());
    assert!(!outcome.result.success);
    assert!(outcome
        .result
        .message
        .contains("no observable page change"));
}

#[tokio::test]
async fn verified_click_is_not_retried() {
    let browser = Arc::new(FakeBrowser::with_page(
        FakePage::new("https://live.example", "Live")
            .with_element(FakePage::button("Expand")),
    ));
    browser.on_click(
        "https://live.example",
        0,
        PageEffect::AddElements(vec![FakePage::button("Revealed")]),
    );
    let dispatcher = dispatcher(browser.clone(), AgentConfig::minimal().retries(2));

    let map = map_of(&browser).await;
    let args = ToolRegistry::parse("click", json!({"element_index": 0})).unwrap();
    let outcome = dispatcher.dispatch(&args, &map, 1, &cancel()).await;

    assert_eq!(browser.operation_count("click:"), 1);
    assert_eq!(outcome.retries, 0);
    assert!(outcome.result.success);
    assert!(outcome.verification.unwrap().verified);
    let confidence = outcome.confidence.unwrap();
    assert!(confidence.score.value >= 0.7);
}

#[tokio::test]
async fn element_count_jump_produces_modal_hint() {
    // 40 elements before the click, 61 after.
    let mut page = FakePage::new("https://modal.example", "Gallery");
    for i in 0..40 {
        page = page.with_element(FakePage::button(&format!("Item {i}")));
    }
    let browser = Arc::new(FakeBrowser::with_page(page));
    let overlay: Vec<_> = (0..21)
        .map(|i| FakePage::button(&format!("Overlay {i}")))
        .collect();
    browser.on_click("https://modal.example", 0, PageEffect::AddElements(overlay));

    let config = AgentConfig::minimal().elements(ElementBudget::Standard);
    let dispatcher = dispatcher(browser.clone(), config);

    let map = map_of(&browser).await;
    assert_eq!(map.len(), 40);
    let args = ToolRegistry::parse("click", json!({"element_index": 0})).unwrap();
    let outcome = dispatcher.dispatch(&args, &map, 1, &cancel()).await;

    assert!(outcome.result.success);
    assert!(outcome.result.message.contains("MODAL DETECTED"));
    assert!(outcome.result.message.contains("auto_detect=true"));
    assert!(outcome.result.message.contains("element_id"));
}

#[tokio::test]
async fn scroll_at_page_edge_stays_verified() {
    let browser = Arc::new(FakeBrowser::with_page(
        FakePage::new("https://short.example", "Short")
            .with_element(FakePage::button("Top"))
            .with_height(600),
    ));
    let dispatcher = dispatcher(browser.clone(), AgentConfig::minimal().retries(2));

    let map = map_of(&browser).await;
    // The page fits in the viewport; scrolling is a legitimate no-op.
    let args = ToolRegistry::parse("scroll", json!({"direction": "down"})).unwrap();
    let outcome = dispatcher.dispatch(&args, &map, 1, &cancel()).await;

    assert_eq!(browser.operation_count("scroll:"), 1);
    assert_eq!(outcome.retries, 0);
    assert!(outcome.result.success);
    assert!(outcome.verification.unwrap().verified);
}

#[tokio::test]
async fn unknown_scroll_direction_never_reaches_the_browser() {
    let browser = Arc::new(FakeBrowser::with_page(
        FakePage::new("https://page.example", "Page").with_element(FakePage::button("x")),
    ));
    let dispatcher = dispatcher(browser.clone(), AgentConfig::minimal());

    let map = map_of(&browser).await;
    let args = ToolRegistry::parse("scroll", json!({"direction": "sideways"})).unwrap();
    let outcome = dispatcher.dispatch(&args, &map, 1, &cancel()).await;

    assert!(!outcome.result.success);
    assert!(outcome.result.message.contains("unknown scroll direction"));
    assert_eq!(browser.operation_count("scroll:"), 0);
}

#[tokio::test]
async fn acknowledged_takeover_succeeds() {
    let browser = Arc::new(FakeBrowser::with_page(FakePage::new(
        "https://blocked.example",
        "Captcha",
    )));
    let gate = Arc::new(TakeoverGate::default());
    let dispatcher = ToolDispatcher::new(
        browser.clone(),
        AgentConfig::minimal(),
        gate.clone(),
    );
    let handle = TakeoverHandle::new(gate);

    let map = map_of(&browser).await;
    let args =
        ToolRegistry::parse("request_human_takeover", json!({"reason": "captcha"})).unwrap();

    let acknowledger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.acknowledge();
    });
    let outcome = dispatcher.dispatch(&args, &map, 1, &cancel()).await;
    acknowledger.await.unwrap();

    assert!(outcome.result.success);
    assert!(outcome.result.message.contains("acknowledged"));
}

#[tokio::test]
async fn identical_snapshots_diff_to_nothing() {
    let browser = FakeBrowser::with_page(
        FakePage::new("https://stable.example", "Stable")
            .with_element(FakePage::link("Home", "https://stable.example"))
            .with_element(FakePage::text_input("Query")),
    );
    let first = PageSnapshot::capture(&map_of(&browser).await);
    let second = PageSnapshot::capture(&map_of(&browser).await);
    assert_eq!(first, second);
    assert!(detect_changes(&first, &second).is_empty());
}

#[tokio::test]
async fn extraction_respects_the_element_budget() {
    let mut page = FakePage::new("https://crowded.example", "Crowded");
    for i in 0..200 {
        page = page.with_element(FakePage::link(&format!("Link {i}"), "https://x.example"));
    }
    let browser = FakeBrowser::with_page(page);
    let map = extract_element_map(
        &browser,
        ElementBudget::Minimal.cap(),
        Duration::from_millis(0),
        &cancel(),
    )
    .await
    .unwrap();
    assert_eq!(map.len(), 30);
    // Indices stay a dense prefix after capping.
    for (position, element) in map.elements().iter().enumerate() {
        assert_eq!(element.index as usize, position);
    }
}
