use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle states of one task session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Finished { message: String },
    StepLimitReached,
    Cancelled,
    Failed { message: String },
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Running)
    }
}

/// A point on the 0–999 normalized screen grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Why a required action argument could not be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldError {
    Missing { field: String },
    Invalid { field: String, reason: String },
}

impl FieldError {
    pub fn missing(field: &str) -> Self {
        Self::Missing {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Missing { field } => write!(f, "missing required parameter `{field}`"),
            FieldError::Invalid { field, reason } => {
                write!(f, "invalid parameter `{field}`: {reason}")
            }
        }
    }
}

/// A required argument, already shape-checked by the parser.
///
/// The error is kept instead of rejecting the whole action so the dispatcher can
/// report it as a failed step without reaching the device.
pub type Field<T> = Result<T, FieldError>;

/// Typed instruction parsed from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Launch {
        app: Field<String>,
    },
    Tap {
        element: Field<NormalizedPoint>,
        /// Present when the model flags the tap as sensitive (payment, privacy).
        message: Option<String>,
    },
    DoubleTap {
        element: Field<NormalizedPoint>,
    },
    LongPress {
        element: Field<NormalizedPoint>,
        duration_ms: Option<u64>,
    },
    Swipe {
        start: Field<NormalizedPoint>,
        end: Field<NormalizedPoint>,
        duration_ms: Option<u64>,
    },
    Type {
        text: Field<String>,
    },
    Wait {
        /// Free-text descriptor such as "3 seconds".
        duration: Option<String>,
    },
    Back,
    Home,
    Note {
        message: String,
    },
    CallApi {
        instruction: String,
    },
    Interact {
        message: Option<String>,
    },
    TakeOver {
        message: String,
    },
    /// `do(...)` with an `action=` value outside the known set.
    Unknown {
        name: String,
    },
    Finish {
        message: String,
    },
}

impl Action {
    /// Name as written in the `do(action=...)` grammar.
    pub fn kind(&self) -> &str {
        match self {
            Action::Launch { .. } => "Launch",
            Action::Tap { .. } => "Tap",
            Action::DoubleTap { .. } => "Double Tap",
            Action::LongPress { .. } => "Long Press",
            Action::Swipe { .. } => "Swipe",
            Action::Type { .. } => "Type",
            Action::Wait { .. } => "Wait",
            Action::Back => "Back",
            Action::Home => "Home",
            Action::Note { .. } => "Note",
            Action::CallApi { .. } => "Call_API",
            Action::Interact { .. } => "Interact",
            Action::TakeOver { .. } => "Take_over",
            Action::Unknown { name } => name,
            Action::Finish { .. } => "finish",
        }
    }
}

/// Uniform result of executing one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    pub should_finish: bool,
    pub message: String,
}

impl StepOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            should_finish: false,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            should_finish: false,
            message: message.into(),
        }
    }

    pub fn finished(message: impl Into<String>) -> Self {
        Self {
            success: true,
            should_finish: true,
            message: message.into(),
        }
    }

    /// Capability call result wrapped with a success or failure message.
    pub fn from_flag(
        ok: bool,
        on_success: impl Into<String>,
        on_failure: impl Into<String>,
    ) -> Self {
        if ok {
            Self::ok(on_success)
        } else {
            Self::failed(on_failure)
        }
    }
}

/// Per-step record handed to the event sink and the session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: u32,
    pub success: bool,
    pub finished: bool,
    pub action: Option<Action>,
    pub reasoning: String,
    pub message: String,
}

/// Final result of [`crate::agent_engine::engine::PhoneAgent::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub state: SessionState,
    pub steps: u32,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_idle_and_running_are_live() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Running.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(SessionState::StepLimitReached.is_terminal());
        assert!(SessionState::Failed {
            message: "step failed: x".into()
        }
        .is_terminal());
    }
}
