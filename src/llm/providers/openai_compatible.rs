use std::time::Duration;

use async_trait::async_trait;

use crate::config::ModelConfig;
use crate::errors::{AgentError, AgentResult};
use crate::llm::provider::ModelTransport;
use crate::llm::types::{ChatMessage, GenerationParams};

pub struct OpenAiCompatibleProvider {
    id: String,
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, config: &ModelConfig) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            id,
            endpoint: chat_completions_url(&config.base_url),
            model: config.model_name.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body(&self, messages: &[ChatMessage], params: &GenerationParams) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "frequency_penalty": params.frequency_penalty,
            "stream": false,
        })
    }
}

#[async_trait]
impl ModelTransport for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn request(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> AgentResult<String> {
        let body = self.build_body(messages, params);

        tracing::debug!(
            provider = %self.id,
            model = %self.model,
            messages = messages.len(),
            "sending model request"
        );
        tracing::debug!(
            body = %sanitized_for_log(&body),
            "request body (sanitized, base64 omitted)"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(AgentError::ModelTransport(format!("{}: {}", status, err_body)));
        }

        let json: serde_json::Value = response.json().await?;
        let content = extract_content(&json)?;

        tracing::info!(
            provider = %self.id,
            content_len = content.len(),
            "model response received"
        );
        Ok(content)
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Text content of the first choice; an absent or empty `choices` array is an error.
fn extract_content(json: &serde_json::Value) -> AgentResult<String> {
    let first = json["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .ok_or_else(|| AgentError::ModelTransport("empty choices in model response".into()))?;

    Ok(first["message"]["content"].as_str().unwrap_or("").to_string())
}

/// Copy of the request body with base64 image payloads replaced, for logging only.
fn sanitized_for_log(body: &serde_json::Value) -> String {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            // content can be a string or an array of parts; only the array case holds images.
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if part.get("type").and_then(|t| t.as_str()) != Some("image_url") {
                    continue;
                }
                if let Some(url) = part.get_mut("image_url").and_then(|i| i.get_mut("url")) {
                    *url = serde_json::Value::String("<omitted_base64_image>".to_string());
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}
