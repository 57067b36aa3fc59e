use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::agent_engine::state::{SessionState, StepReport};

/// Notifications published by the session controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    TaskStarted { task: String },
    StepStarted { step: u32 },
    ModelReplied { reasoning: String, action_text: String },
    StepCompleted(StepReport),
    /// The model asked for a human (`Take_over`, `Interact`).
    UserAttention { message: String },
    TaskEnded { state: SessionState, steps: u32 },
}

/// Receiver of session notifications, injected into the controller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AgentEvent);
}

/// Default sink: writes every event to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &AgentEvent) {
        match event {
            AgentEvent::TaskStarted { task } => tracing::info!(task = %task, "task started"),
            AgentEvent::StepStarted { step } => tracing::info!(step, "step started"),
            AgentEvent::ModelReplied { reasoning, action_text } => {
                tracing::debug!(reasoning = %reasoning, action = %action_text, "model replied")
            }
            AgentEvent::StepCompleted(report) => tracing::info!(
                step = report.step,
                success = report.success,
                finished = report.finished,
                message = %report.message,
                "step completed"
            ),
            AgentEvent::UserAttention { message } => {
                tracing::warn!(message = %message, "user attention required")
            }
            AgentEvent::TaskEnded { state, steps } => {
                tracing::info!(state = ?state, steps, "task ended")
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &AgentEvent) {}
}

/// Fans events out to any number of async subscribers.
pub struct ChannelSink {
    tx: broadcast::Sender<AgentEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChannelSink {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &AgentEvent) {
        // No subscribers is not an error for the session.
        let _ = self.tx.send(event.clone());
    }
}
