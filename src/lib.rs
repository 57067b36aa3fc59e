pub mod agent_engine;
pub mod config;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;

#[cfg(test)]
mod testing;

pub use agent_engine::engine::PhoneAgent;
pub use agent_engine::event_bus::{AgentEvent, ChannelSink, EventSink, NullSink, TracingSink};
pub use agent_engine::loop_control::StopHandle;
pub use agent_engine::state::{Action, SessionState, StepOutcome, StepReport, TaskOutcome};
pub use config::AppConfig;
pub use errors::{AgentError, AgentResult};
pub use executor::input::DeviceControl;
pub use executor::safety::ActionApprover;
pub use llm::action_parser::parse_action;
pub use llm::provider::ModelTransport;
pub use llm::providers::openai_compatible::OpenAiCompatibleProvider;
pub use llm::reply::split_reply;
pub use perception::screenshot::{Screenshot, Viewport};
pub use perception::traits::Observer;

/// Install the global tracing subscriber and load `.env`.
///
/// `RUST_LOG` selects the filter, defaulting to `info`. Safe to call more than once.
pub fn init_logging() {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
