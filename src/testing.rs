//! In-memory collaborators for unit tests: a recording device, a fixed observer,
//! a scripted model transport and a recording event sink.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::agent_engine::event_bus::{AgentEvent, EventSink};
use crate::agent_engine::loop_control::StopHandle;
use crate::agent_engine::state::Action;
use crate::errors::{AgentError, AgentResult};
use crate::executor::input::DeviceControl;
use crate::executor::safety::ActionApprover;
use crate::llm::provider::ModelTransport;
use crate::llm::types::{ChatMessage, GenerationParams};
use crate::perception::screenshot::Screenshot;
use crate::perception::traits::Observer;

/// Records every call as a short string such as `"tap 540 1200"`.
pub struct RecordingDevice {
    calls: Mutex<Vec<String>>,
    succeed: bool,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            succeed: true,
        }
    }

    /// Every capability call reports failure.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            succeed: false,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> bool {
        self.calls.lock().unwrap().push(call);
        self.succeed
    }
}

#[async_trait]
impl DeviceControl for RecordingDevice {
    async fn tap(&self, x: i32, y: i32) -> bool {
        self.record(format!("tap {x} {y}"))
    }

    async fn double_tap(&self, x: i32, y: i32) -> bool {
        self.record(format!("double_tap {x} {y}"))
    }

    async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> bool {
        self.record(format!("long_press {x} {y} {duration_ms}"))
    }

    async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: Option<u64>) -> bool {
        self.record(format!("swipe {x1} {y1} {x2} {y2} {duration_ms:?}"))
    }

    async fn back(&self) -> bool {
        self.record("back".into())
    }

    async fn home(&self) -> bool {
        self.record("home".into())
    }

    async fn launch(&self, app: &str) -> bool {
        self.record(format!("launch {app}"))
    }

    async fn type_text(&self, text: &str) -> bool {
        self.record(format!("type {text}"))
    }

    async fn wait(&self, seconds: f64) -> bool {
        self.record(format!("wait {seconds}"))
    }
}

/// Always returns the same small PNG payload and app name.
pub struct FixedObserver {
    pub app: String,
    pub image: Vec<u8>,
}

impl FixedObserver {
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
            image: b"\x89PNG fake".to_vec(),
        }
    }
}

#[async_trait]
impl Observer for FixedObserver {
    async fn capture_screen(&self) -> Screenshot {
        Screenshot::new(self.image.clone(), 1080, 2400)
    }

    async fn current_app(&self) -> String {
        self.app.clone()
    }
}

/// Replays queued replies, then repeats `fallback` forever.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<AgentResult<String>>>,
    fallback: String,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    /// Stopped when the request with this 1-based number arrives.
    stop_on: Mutex<Option<(usize, StopHandle)>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<&str>, fallback: &str) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            fallback: fallback.to_string(),
            requests: Mutex::new(Vec::new()),
            stop_on: Mutex::new(None),
        }
    }

    pub fn failing_with(message: &str) -> Self {
        let transport = Self::new(Vec::new(), "");
        transport
            .replies
            .lock()
            .unwrap()
            .push_back(Err(AgentError::ModelTransport(message.to_string())));
        transport
    }

    pub fn stop_on_request(&self, n: usize, handle: StopHandle) {
        *self.stop_on.lock().unwrap() = Some((n, handle));
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn request(
        &self,
        messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> AgentResult<String> {
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(messages.to_vec());
            requests.len()
        };
        if let Some((n, handle)) = self.stop_on.lock().unwrap().as_ref() {
            if *n == count {
                handle.stop();
            }
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AgentEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Answers every approval request with a fixed decision and records the reasons.
pub struct FixedApprover {
    pub decision: bool,
    pub asked: Mutex<Vec<String>>,
}

impl FixedApprover {
    pub fn new(decision: bool) -> Self {
        Self {
            decision,
            asked: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ActionApprover for FixedApprover {
    async fn approve(&self, _action: &Action, reason: &str) -> bool {
        self.asked.lock().unwrap().push(reason.to_string());
        self.decision
    }
}
