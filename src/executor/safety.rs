// Human confirmation for sensitive taps.
use async_trait::async_trait;

use crate::agent_engine::state::Action;
use crate::config::SafetyConfig;

/// Asks a human whether a sensitive action may run.
#[async_trait]
pub trait ActionApprover: Send + Sync {
    async fn approve(&self, action: &Action, reason: &str) -> bool;
}

/// Reason shown to the approver, when this action needs one.
///
/// Only taps flagged by the model with a `message` (payment, privacy, property)
/// qualify, and only when confirmation is enabled.
pub fn approval_reason<'a>(action: &'a Action, config: &SafetyConfig) -> Option<&'a str> {
    if !config.confirm_sensitive_actions {
        return None;
    }
    match action {
        Action::Tap {
            message: Some(reason),
            ..
        } => Some(reason.as_str()),
        _ => None,
    }
}
