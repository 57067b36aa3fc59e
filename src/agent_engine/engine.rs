use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::agent_engine::context::SessionContext;
use crate::agent_engine::event_bus::{AgentEvent, EventSink, TracingSink};
use crate::agent_engine::history::{default_history_dir, SessionHistory};
use crate::agent_engine::loop_control::{LoopController, StopHandle, StopReason};
use crate::agent_engine::prompt::{observation_text, system_prompt};
use crate::agent_engine::state::{Action, SessionState, StepOutcome, StepReport, TaskOutcome};
use crate::config::{AgentSettings, AppConfig, SafetyConfig};
use crate::errors::AgentResult;
use crate::executor::dispatcher::dispatch;
use crate::executor::input::DeviceControl;
use crate::executor::safety::{approval_reason, ActionApprover};
use crate::llm::action_parser::parse_action;
use crate::llm::provider::ModelTransport;
use crate::llm::reply::split_reply;
use crate::llm::types::{ChatMessage, GenerationParams};
use crate::perception::screenshot::Viewport;
use crate::perception::traits::Observer;

/// Drives one task at a time through observe → ask → act steps until the
/// model finishes, the step budget runs out, a stop is requested or the
/// model transport fails.
pub struct PhoneAgent {
    settings: AgentSettings,
    params: GenerationParams,
    safety: SafetyConfig,

    transport: Arc<dyn ModelTransport>,
    device: Arc<dyn DeviceControl>,
    observer: Arc<dyn Observer>,
    sink: Arc<dyn EventSink>,
    approver: Option<Arc<dyn ActionApprover>>,

    // ── Per-task state (reset by `run` and `reset`) ──
    context: SessionContext,
    loop_ctrl: LoopController,
    state: SessionState,
    history_dir: Option<PathBuf>,
    history: Option<SessionHistory>,
}

impl PhoneAgent {
    pub fn new(
        settings: AgentSettings,
        params: GenerationParams,
        transport: Arc<dyn ModelTransport>,
        device: Arc<dyn DeviceControl>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let loop_ctrl = LoopController::new(settings.max_steps);
        Self {
            settings,
            params,
            safety: SafetyConfig::default(),
            transport,
            device,
            observer,
            sink: Arc::new(TracingSink),
            approver: None,
            context: SessionContext::new(),
            loop_ctrl,
            state: SessionState::Idle,
            history_dir: None,
            history: None,
        }
    }

    /// Controller wired from a loaded config file.
    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn ModelTransport>,
        device: Arc<dyn DeviceControl>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let mut agent = Self::new(
            config.agent.clone(),
            config.model.generation_params(),
            transport,
            device,
            observer,
        )
        .with_safety(config.safety.clone());
        if config.agent.record_history {
            agent.history_dir = Some(default_history_dir());
        }
        agent
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_approver(mut self, approver: Arc<dyn ActionApprover>) -> Self {
        self.approver = Some(approver);
        self
    }

    pub fn with_safety(mut self, safety: SafetyConfig) -> Self {
        self.safety = safety;
        self
    }

    /// Write a JSONL transcript of every task into `dir`.
    pub fn with_history(mut self, dir: impl Into<PathBuf>) -> Self {
        self.history_dir = Some(dir.into());
        self
    }

    /// Handle for requesting cancellation from another task or thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.loop_ctrl.stop_handle()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn step_count(&self) -> u32 {
        self.loop_ctrl.step_count()
    }

    pub fn context(&self) -> &[ChatMessage] {
        self.context.messages()
    }

    pub fn history(&self) -> Option<&SessionHistory> {
        self.history.as_ref()
    }

    /// Drop the conversation, counter and stop request; back to `Idle`.
    pub fn reset(&mut self) {
        self.context.clear();
        self.loop_ctrl.reset();
        self.state = SessionState::Idle;
        self.history = None;
    }

    /// Run `task` to a terminal state. Any earlier session is discarded first.
    pub async fn run(&mut self, task: &str) -> TaskOutcome {
        self.start(task);

        let (state, message) = loop {
            match self.loop_ctrl.should_stop() {
                Some(StopReason::Cancelled) => {
                    break (SessionState::Cancelled, "task cancelled".to_string());
                }
                Some(StopReason::StepLimit) => {
                    break (SessionState::StepLimitReached, "max steps reached".to_string());
                }
                None => {}
            }

            let first = self.loop_ctrl.step_count() == 0;
            match self.step(first.then_some(task)).await {
                Ok(report) if report.finished => {
                    let message = report.message;
                    break (SessionState::Finished { message: message.clone() }, message);
                }
                Ok(_) => {}
                Err(e) => {
                    let message = format!("step failed: {e}");
                    tracing::error!(error = %e, step = self.loop_ctrl.step_count(), "step failed");
                    self.context.compact_last_observation();
                    self.report(StepReport {
                        step: self.loop_ctrl.step_count(),
                        success: false,
                        finished: true,
                        action: None,
                        reasoning: String::new(),
                        message: message.clone(),
                    });
                    break (SessionState::Failed { message: message.clone() }, message);
                }
            }
        };

        self.end(state, message)
    }

    fn start(&mut self, task: &str) {
        self.context.clear();
        self.loop_ctrl.reset();
        self.state = SessionState::Running;
        self.history = self.history_dir.as_deref().map(SessionHistory::in_dir);
        if let Some(history) = self.history.as_mut() {
            history.record_task(task);
        }
        tracing::info!(
            transport = %self.transport.name(),
            max_steps = self.loop_ctrl.max_steps(),
            "session started"
        );
        self.sink.emit(&AgentEvent::TaskStarted {
            task: task.to_string(),
        });
    }

    fn end(&mut self, state: SessionState, message: String) -> TaskOutcome {
        debug_assert!(state.is_terminal(), "session ended in {state:?}");
        let steps = self.loop_ctrl.step_count();
        tracing::info!(state = ?state, steps, "session ended");
        self.state = state.clone();
        self.sink.emit(&AgentEvent::TaskEnded {
            state: state.clone(),
            steps,
        });
        TaskOutcome {
            state,
            steps,
            message,
        }
    }

    /// One observe → ask → act cycle. Only a transport error is returned as
    /// `Err`; everything else is folded into the report.
    async fn step(&mut self, task: Option<&str>) -> AgentResult<StepReport> {
        let step = self.loop_ctrl.begin_step();
        self.sink.emit(&AgentEvent::StepStarted { step });

        let screenshot = self.observer.capture_screen().await;
        let current_app = self.observer.current_app().await;
        tracing::debug!(
            step,
            app = %current_app,
            width = screenshot.viewport.width,
            height = screenshot.viewport.height,
            sensitive = screenshot.is_sensitive,
            "screen observed"
        );

        if task.is_some() {
            self.context.append_system(system_prompt(self.settings.lang));
        }
        let image = screenshot.image_base64();
        self.context
            .append_observation(observation_text(task, &current_app), image.as_deref());

        let raw = self
            .transport
            .request(self.context.messages(), &self.params)
            .await?;
        let reply = split_reply(&raw);
        if self.settings.verbose {
            tracing::info!(
                step,
                reasoning = %reply.reasoning,
                action = %reply.action_text,
                "model replied"
            );
        }
        self.sink.emit(&AgentEvent::ModelReplied {
            reasoning: reply.reasoning.clone(),
            action_text: reply.action_text.clone(),
        });

        let action = parse_action(&reply.action_text);
        self.context.compact_last_observation();

        let outcome = self.execute(&action, screenshot.viewport).await;
        self.context.append_reply(reply.to_tagged());

        match &action {
            Action::TakeOver { message } => self.sink.emit(&AgentEvent::UserAttention {
                message: message.clone(),
            }),
            Action::Interact { message } => self.sink.emit(&AgentEvent::UserAttention {
                message: message.clone().unwrap_or_else(|| outcome.message.clone()),
            }),
            _ => {}
        }

        let report = StepReport {
            step,
            success: outcome.success,
            finished: outcome.should_finish,
            action: Some(action),
            reasoning: reply.reasoning,
            message: outcome.message,
        };
        self.report(report.clone());

        if !report.finished && self.settings.step_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.step_delay_ms)).await;
        }
        Ok(report)
    }

    async fn execute(&self, action: &Action, viewport: Viewport) -> StepOutcome {
        if let Action::Finish { message } = action {
            return StepOutcome::finished(message.clone());
        }
        if let Some(reason) = approval_reason(action, &self.safety) {
            match &self.approver {
                Some(approver) => {
                    if !approver.approve(action, reason).await {
                        tracing::info!(reason, "sensitive action declined");
                        return StepOutcome::failed(format!(
                            "sensitive action declined: {reason}"
                        ));
                    }
                }
                None => tracing::warn!(reason, "no approver configured; running sensitive action"),
            }
        }
        dispatch(action, viewport, self.device.as_ref()).await
    }

    fn report(&mut self, report: StepReport) {
        if let Some(history) = self.history.as_mut() {
            history.record_step(&report);
        }
        self.sink.emit(&AgentEvent::StepCompleted(report));
    }
}
