use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::llm::types::{ChatMessage, GenerationParams};

/// Blocking request/response model transport.
///
/// Returns the raw text content of the first choice. A non-2xx status, an empty
/// `choices` array or an unreadable body is an error for that step.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    async fn request(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> AgentResult<String>;
}
