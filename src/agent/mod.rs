//! The agent loop: observe, consult the model, execute, verify, repeat.

pub mod history;
pub mod prompt;

pub use history::{AgentHistory, HistoryItem};
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use action_verify::{task_confidence, ActionConfidence, TaskConfidence, TaskContext};
use browser_adapter::{extract_element_map, AdapterError, BrowserAdapter};
use perceiver_dom::ElementMap;
use privacy_guard::Redactor;

use crate::config::AgentConfig;
use crate::errors::TaskError;
use crate::llm::{ModelPart, ModelTransport, TransportError, UserContent};
use crate::observation::detect_obstruction;
use crate::tools::{
    DoneArgs, TakeoverGate, TakeoverHandle, ToolArgs, ToolDispatcher, ToolRegistry, ToolResult,
};

/// One executed tool call as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub number: u32,
    pub tool: String,
    pub arguments: Value,
    pub success: bool,
    pub result_message: String,
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub duration_ms: u64,
}

/// Outcome of one task run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<StepRecord>,
    pub duration_ms: u64,
    pub screenshot_paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<TaskConfidence>,
}

/// Drives one browser through natural-language tasks.
///
/// The agent owns the current element map, the history and the confidence
/// records for the task it is running; the browser adapter owns the page.
/// One agent runs one task at a time; run several agents (each with their
/// own browser and transport session) for concurrency.
pub struct Agent {
    browser: Arc<dyn BrowserAdapter>,
    transport: Arc<dyn ModelTransport>,
    config: AgentConfig,
    dispatcher: ToolDispatcher,
    takeover: Arc<TakeoverGate>,
    prompt: PromptBuilder,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl Agent {
    pub fn new(
        browser: Arc<dyn BrowserAdapter>,
        transport: Arc<dyn ModelTransport>,
        config: AgentConfig,
    ) -> Self {
        Self::with_redactor(browser, transport, config, Redactor::new())
    }

    /// Construct with a caller-supplied redaction pattern set.
    pub fn with_redactor(
        browser: Arc<dyn BrowserAdapter>,
        transport: Arc<dyn ModelTransport>,
        config: AgentConfig,
        redactor: Redactor,
    ) -> Self {
        let takeover = Arc::new(TakeoverGate::default());
        let dispatcher = ToolDispatcher::new(browser.clone(), config.clone(), takeover.clone());
        let prompt = PromptBuilder::new(redactor, config.enable_vision);
        Self {
            browser,
            transport,
            config,
            dispatcher,
            takeover,
            prompt,
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Mark the agent ready to run tasks.
    pub fn start(&self) -> Result<(), TaskError> {
        if !self.transport.is_configured() {
            return Err(TaskError::MissingCredential(
                "model transport reports no credentials".to_string(),
            ));
        }
        if !self.browser.is_open() {
            return Err(TaskError::BrowserClosed);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TaskError::AlreadyStarted);
        }
        Ok(())
    }

    /// Tear down: cancels any in-flight run and closes the browser.
    pub async fn close(&self) -> Result<(), TaskError> {
        self.cancel.cancel();
        self.started.store(false, Ordering::SeqCst);
        match self.browser.close(&CancellationToken::new()).await {
            Ok(()) | Err(AdapterError::BrowserClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Handle for acknowledging human-takeover requests.
    pub fn takeover_handle(&self) -> TakeoverHandle {
        TakeoverHandle::new(self.takeover.clone())
    }

    /// Token cancelling every suspension point of in-flight runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one task to completion.
    pub async fn run(&self, task: &str) -> Result<TaskResult, TaskError> {
        if !self.is_started() {
            return Err(TaskError::NotStarted);
        }
        let started_at = Instant::now();
        let cancel = self.cancel.child_token();
        info!(task, "starting agent task");

        let session = match self
            .transport
            .create_session(SYSTEM_PROMPT, &ToolRegistry::declarations())
            .await
        {
            Ok(session) => session,
            Err(TransportError::Cancelled) => {
                return Ok(failure_result(
                    &TaskError::Cancelled,
                    Vec::new(),
                    Vec::new(),
                    None,
                    started_at,
                ))
            }
            Err(TransportError::Failed(message)) => return Err(TaskError::Transport(message)),
        };

        let mut history = AgentHistory::new(task, self.config.history_capacity);
        let mut steps: Vec<StepRecord> = Vec::new();
        let mut screenshot_paths: Vec<PathBuf> = Vec::new();
        let mut confidences: Vec<ActionConfidence> = Vec::new();
        let mut pending_screenshot: Option<PathBuf> = None;
        let mut executed: u32 = 0;
        let mut last_tool = String::new();
        let mut last_result_text = String::new();
        let mut last_success = true;

        let mut map = match self.refresh_map(&cancel).await {
            Ok(map) => map,
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "initial extraction failed; starting from an empty map");
                ElementMap::empty("about:blank")
            }
            Err(AdapterError::Cancelled) => {
                return Ok(failure_result(
                    &TaskError::Cancelled,
                    steps,
                    screenshot_paths,
                    None,
                    started_at,
                ))
            }
            Err(err) => return Err(err.into()),
        };

        let shot = self.capture_screenshot(1, &cancel).await;
        if let Some((_, path)) = &shot {
            screenshot_paths.push(path.clone());
            pending_screenshot = Some(path.clone());
        }
        let obstruction = detect_obstruction(&map, None);
        let text = self
            .prompt
            .initial(task, &map, shot.is_some(), obstruction);
        let mut pending_user: UserContent = self
            .prompt
            .assemble(text, shot.as_ref().map(|(bytes, _)| bytes.as_slice()));

        loop {
            let failures = history.consecutive_failures();
            if failures >= self.config.max_consecutive_failures {
                let kind = TaskError::ConsecutiveFailureLimitReached(failures);
                let confidence = self.aggregate(&confidences, executed, &history);
                return Ok(failure_result(
                    &kind,
                    steps,
                    screenshot_paths,
                    confidence,
                    started_at,
                ));
            }
            if executed >= self.config.max_steps {
                let kind = TaskError::MaxStepsReached(self.config.max_steps);
                let confidence = self.aggregate(&confidences, executed, &history);
                return Ok(failure_result(
                    &kind,
                    steps,
                    screenshot_paths,
                    confidence,
                    started_at,
                ));
            }

            let mut stream = match self
                .transport
                .run_turn(&session, pending_user.clone(), &cancel)
                .await
            {
                Ok(stream) => stream,
                Err(TransportError::Cancelled) => {
                    let confidence = self.aggregate(&confidences, executed, &history);
                    return Ok(failure_result(
                        &TaskError::Cancelled,
                        steps,
                        screenshot_paths,
                        confidence,
                        started_at,
                    ));
                }
                Err(TransportError::Failed(message)) => {
                    return Err(TaskError::Transport(message))
                }
            };

            let mut terminal: Option<DoneArgs> = None;
            'events: loop {
                let event = match stream.next_event(&cancel).await {
                    Ok(Some(event)) => event,
                    Ok(None) => break 'events,
                    Err(TransportError::Cancelled) => {
                        let confidence = self.aggregate(&confidences, executed, &history);
                        return Ok(failure_result(
                            &TaskError::Cancelled,
                            steps,
                            screenshot_paths,
                            confidence,
                            started_at,
                        ));
                    }
                    Err(TransportError::Failed(message)) => {
                        return Err(TaskError::Transport(message))
                    }
                };

                for part in &event.parts {
                    match part {
                        ModelPart::Text(text) => {
                            debug!(step = executed, "model text: {text}");
                            absorb_commentary(text, &mut history);
                        }
                        ModelPart::FunctionResponse { name, response } => {
                            last_tool = name.clone();
                            last_result_text = response.to_string();
                            last_success = response
                                .get("success")
                                .and_then(Value::as_bool)
                                .unwrap_or(true);
                        }
                        ModelPart::FunctionCall { name, args } => {
                            if executed >= self.config.max_steps {
                                debug!("step budget exhausted mid-turn; ignoring further calls");
                                break 'events;
                            }
                            executed += 1;
                            let step_number = executed;
                            let step_started = Instant::now();

                            match ToolRegistry::parse(name, args.clone()) {
                                Err(err) => {
                                    let result = ToolResult::fail(err.to_string());
                                    self.record(
                                        &mut history,
                                        &mut steps,
                                        step_number,
                                        name,
                                        args,
                                        &result,
                                        0,
                                        None,
                                        pending_screenshot.take(),
                                        step_started,
                                    );
                                    last_tool = name.clone();
                                    last_result_text = result.to_json().to_string();
                                    last_success = false;
                                    let _ = stream.push_tool_response(name, result.to_json()).await;
                                }
                                Ok(ToolArgs::Done(done)) => {
                                    let result = if done.success {
                                        ToolResult::ok(done.summary.clone())
                                    } else {
                                        ToolResult::fail(done.summary.clone())
                                    };
                                    self.record(
                                        &mut history,
                                        &mut steps,
                                        step_number,
                                        "done",
                                        args,
                                        &result,
                                        0,
                                        None,
                                        pending_screenshot.take(),
                                        step_started,
                                    );
                                    terminal = Some(done);
                                    break 'events;
                                }
                                Ok(parsed) => {
                                    let outcome = self
                                        .dispatcher
                                        .dispatch(&parsed, &map, step_number, &cancel)
                                        .await;
                                    let result_json = outcome.result.to_json();
                                    self.record(
                                        &mut history,
                                        &mut steps,
                                        step_number,
                                        parsed.name(),
                                        args,
                                        &outcome.result,
                                        outcome.retries,
                                        outcome.confidence.as_ref().map(|c| c.score.value),
                                        pending_screenshot.take(),
                                        step_started,
                                    );
                                    if let Some(confidence) = outcome.confidence {
                                        confidences.push(confidence);
                                    }
                                    last_tool = parsed.name().to_string();
                                    last_result_text = result_json.to_string();
                                    last_success = outcome.result.success;
                                    let _ = stream
                                        .push_tool_response(parsed.name(), result_json)
                                        .await;
                                }
                            }
                        }
                    }
                }

                if event.is_final_response() {
                    break 'events;
                }
            }

            if let Some(done) = terminal {
                let confidence = self.aggregate(&confidences, executed, &history);
                info!(success = done.success, steps = executed, "task finished");
                return Ok(TaskResult {
                    success: done.success,
                    summary: Some(done.summary),
                    data: done.data,
                    error: None,
                    steps,
                    duration_ms: started_at.elapsed().as_millis() as u64,
                    screenshot_paths,
                    confidence,
                });
            }

            // Refresh the map; extraction failure is soft and keeps the
            // previous map for the next turn.
            match self.refresh_map(&cancel).await {
                Ok(new_map) => map = new_map,
                Err(AdapterError::Cancelled) => {
                    let confidence = self.aggregate(&confidences, executed, &history);
                    return Ok(failure_result(
                        &TaskError::Cancelled,
                        steps,
                        screenshot_paths,
                        confidence,
                        started_at,
                    ));
                }
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "extraction failed; continuing with stale map");
                }
                Err(err) => return Err(err.into()),
            }

            let shot = self.capture_screenshot(executed + 1, &cancel).await;
            if let Some((_, path)) = &shot {
                screenshot_paths.push(path.clone());
                pending_screenshot = Some(path.clone());
            }
            let obstruction = detect_obstruction(&map, None);
            let text = self.prompt.continuation(
                &map,
                &last_tool,
                &last_result_text,
                last_success,
                &history,
                executed + 1,
                self.config.max_steps,
                shot.is_some(),
                obstruction,
            );
            pending_user = self
                .prompt
                .assemble(text, shot.as_ref().map(|(bytes, _)| bytes.as_slice()));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        history: &mut AgentHistory,
        steps: &mut Vec<StepRecord>,
        step_number: u32,
        tool: &str,
        args: &Value,
        result: &ToolResult,
        retries: u32,
        confidence: Option<f64>,
        screenshot_path: Option<PathBuf>,
        step_started: Instant,
    ) {
        let duration_ms = step_started.elapsed().as_millis() as u64;
        history.push(
            HistoryItem::new(step_number, tool, args.clone()).with_result(
                result.to_json(),
                result.success,
                duration_ms,
            ),
        );
        steps.push(StepRecord {
            number: step_number,
            tool: tool.to_string(),
            arguments: args.clone(),
            success: result.success,
            result_message: result.message.clone(),
            retries,
            screenshot_path,
            confidence,
            duration_ms,
        });
    }

    async fn refresh_map(&self, cancel: &CancellationToken) -> Result<ElementMap, AdapterError> {
        extract_element_map(
            self.browser.as_ref(),
            self.config.element_budget.cap(),
            Duration::from_millis(self.config.stability_window_ms),
            cancel,
        )
        .await
    }

    /// Pre-turn screenshot: the image this turn's message attaches, which
    /// is also the post-action state of the previous turn.
    async fn capture_screenshot(
        &self,
        step: u32,
        cancel: &CancellationToken,
    ) -> Option<(Vec<u8>, PathBuf)> {
        if !self.config.enable_vision {
            return None;
        }
        let bytes = match self.browser.screenshot(false, cancel).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "screenshot capture failed");
                return None;
            }
        };
        let name = format!(
            "step_{step:03}_{}.jpg",
            chrono::Utc::now().timestamp_millis()
        );
        let path = self.config.screenshot_dir.join(name);
        if let Err(err) = tokio::fs::create_dir_all(&self.config.screenshot_dir).await {
            warn!(error = %err, "cannot create screenshot directory");
            return None;
        }
        if let Err(err) = tokio::fs::write(&path, &bytes).await {
            warn!(error = %err, "cannot persist screenshot");
            return None;
        }
        Some((bytes, path))
    }

    fn aggregate(
        &self,
        confidences: &[ActionConfidence],
        executed: u32,
        history: &AgentHistory,
    ) -> Option<TaskConfidence> {
        if confidences.is_empty() {
            return None;
        }
        Some(task_confidence(
            confidences,
            TaskContext {
                step: executed,
                total_steps: self.config.max_steps,
                consecutive_failures: history.consecutive_failures(),
            },
        ))
    }
}

/// Pull structured progress notes out of free-form model text.
///
/// Text never drives control flow, but `Memory:` lines accumulate on the
/// task and `Evaluation:` / `Next goal:` lines annotate the step they
/// comment on (the most recent one).
fn absorb_commentary(text: &str, history: &mut AgentHistory) {
    for line in text.lines() {
        if let Some(memory) = line.strip_prefix("Memory:") {
            history.update_memory(memory.trim());
        } else if let Some(evaluation) = line.strip_prefix("Evaluation:") {
            history.annotate_last(Some(evaluation.trim().to_string()), None);
        } else if let Some(goal) = line.strip_prefix("Next goal:") {
            history.annotate_last(None, Some(goal.trim().to_string()));
        }
    }
}

fn failure_result(
    kind: &TaskError,
    steps: Vec<StepRecord>,
    screenshot_paths: Vec<PathBuf>,
    confidence: Option<TaskConfidence>,
    started_at: Instant,
) -> TaskResult {
    TaskResult {
        success: false,
        summary: None,
        data: None,
        error: Some(kind.to_string()),
        steps,
        duration_ms: started_at.elapsed().as_millis() as u64,
        screenshot_paths,
        confidence,
    }
}
