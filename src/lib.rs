/// Scribe - buffers group-chat messages and turns them into meeting minutes with an LLM.
///
/// Messages arrive from a chat adapter, are kept in a bounded ring buffer per
/// group, and are summarized when a trigger fires:
/// 1. A keyword in a message asks for a summary on demand
/// 2. The buffer reaches a message-count threshold
/// 3. A periodic timer finds the last flush older than the configured interval
///
/// # Architecture
///
/// The system uses:
/// - dashmap for the concurrent group registry and in-flight claims
/// - openai-api-rs message types for OpenAI-compatible chat completions
/// - reqwest for the HTTP transport, with tokio-retry for transient failures
/// - Tokio for async runtime, with tokio-util for task tracking and cancellation
///
/// At most one summary runs per group at a time. A successful summary (or an
/// explicit "nothing to report" reply) clears the group's buffer; any failure
/// leaves the buffer intact for the next trigger.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use scribe::core::config::{AppConfig, SharedConfig};
/// use scribe::{LlmClient, Scribe, StdoutSink};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     scribe::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let client = LlmClient::new(&config.llm, scribe::prompt::DEFAULT_SYSTEM_PROMPT.to_string())?;
///     let scribe = Scribe::new(
///         SharedConfig::new(config.scribe),
///         Arc::new(client),
///         Arc::new(StdoutSink::new()),
///     );
///
///     let message = serde_json::from_str(
///         r#"{"id":"m1","timestamp":"2026-01-05T09:00:00Z","sender":"Ana",
///             "group_key":"ops","content":{"type":"text","text":"@bot summary"}}"#,
///     )?;
///     if let Some(task) = scribe.ingest(message) {
///         println!("{:?}", task.await?);
///     }
///
///     scribe.shutdown().await;
///     Ok(())
/// }
/// ```
// Module declarations
pub mod ai;
pub mod buffer;
pub mod core;
pub mod errors;
pub mod prompt;
pub mod scribe;
pub mod trigger;
pub mod utils;
pub mod worker;

pub use ai::{LlmClient, SummaryRequest, Summarizer};
pub use errors::ScribeError;
pub use scribe::Scribe;
pub use worker::{DispatchOutcome, StdoutSink, SummarySink};

/// Configure structured logging.
///
/// Output is JSON when `LOG_FORMAT=json`, human readable otherwise. Levels come
/// from `RUST_LOG` and default to `info` (`debug` with the `debug-logs`
/// feature). Calling it again after a subscriber is installed is a no-op.
///
/// # Example
///
/// ```
/// // Initialize structured logging at program start
/// scribe::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let default_level = if cfg!(feature = "debug-logs") {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
