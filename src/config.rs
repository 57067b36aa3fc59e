use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{AgentError, AgentResult};
use crate::llm::types::GenerationParams;

/// Environment variable that overrides `[model].api_key`.
pub const API_KEY_ENV: &str = "PHONE_AGENT_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub safety: SafetyConfig,
}

/// Endpoint and sampling parameters for the OpenAI-compatible model API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Whole-request timeout for one model call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f64,
}

impl ModelConfig {
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model_name: default_model_name(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            top_p: default_top_p(),
            frequency_penalty: default_frequency_penalty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lang {
    #[default]
    Cn,
    En,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default)]
    pub lang: Lang,
    /// Log reasoning and action text of every step at info level.
    #[serde(default = "default_true")]
    pub verbose: bool,
    /// Pause after every non-finishing step so the device UI can settle.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default)]
    pub record_history: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            lang: Lang::default(),
            verbose: true,
            step_delay_ms: default_step_delay_ms(),
            record_history: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Ask the injected approver before taps flagged with a `message`.
    #[serde(default)]
    pub confirm_sensitive_actions: bool,
}

fn default_base_url() -> String {
    "https://open.bigmodel.cn/api/paas/v4".into()
}

fn default_model_name() -> String {
    "autoglm-phone".into()
}

fn default_api_key() -> String {
    "EMPTY".into()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    3000
}

fn default_top_p() -> f64 {
    0.85
}

fn default_frequency_penalty() -> f64 {
    0.2
}

fn default_max_steps() -> u32 {
    100
}

fn default_step_delay_ms() -> u64 {
    1200
}

fn default_true() -> bool {
    true
}

pub fn resolve_config_path() -> AgentResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(AgentError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> AgentResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

/// Load and parse a config file, then apply the API key environment override.
pub fn load_config_from(path: &Path) -> AgentResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            config.model.api_key = key;
        }
    }
    tracing::info!(
        path = %path.display(),
        model = %config.model.model_name,
        max_steps = config.agent.max_steps,
        "config loaded"
    );
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> AgentResult<()> {
    let path = resolve_config_path()?;
    save_config_to(&path, config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> AgentResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
