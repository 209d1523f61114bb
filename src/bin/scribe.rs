#![allow(clippy::missing_errors_doc)]

//! Reads newline-delimited JSON messages from stdin and writes meeting notes
//! to stdout. Stops on EOF or Ctrl-C, letting in-flight summaries wind down.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use scribe::core::config::{AppConfig, SharedConfig};
use scribe::core::models::Message;
use scribe::prompt::load_system_prompt;
use scribe::{LlmClient, Scribe, StdoutSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    scribe::setup_logging();

    let config = AppConfig::from_env().context("loading configuration")?;
    config.scribe.log_summary();

    let system_prompt = load_system_prompt(Path::new(&config.llm.system_prompt_file))?;
    let client = LlmClient::new(&config.llm, system_prompt)?;
    info!(endpoint = %client.endpoint(), model = %config.llm.model, "LLM client ready");

    let scribe = Arc::new(Scribe::new(
        SharedConfig::new(config.scribe),
        Arc::new(client),
        Arc::new(StdoutSink::new()),
    ));

    let timer_cancel = CancellationToken::new();
    let timer = {
        let scribe = Arc::clone(&scribe);
        let cancel = timer_cancel.clone();
        tokio::spawn(async move { scribe.run_timer(cancel).await })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&scribe, &line),
                Ok(None) => {
                    info!("Input closed, shutting down");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read input");
                    break;
                }
            },
        }
    }

    timer_cancel.cancel();
    if let Err(e) = timer.await {
        warn!(error = %e, "Interval timer task failed");
    }
    scribe.shutdown().await;
    Ok(())
}

fn handle_line(scribe: &Scribe, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<Message>(line) {
        Ok(message) => {
            // Dispatched tasks are tracked by the dispatcher; shutdown waits on them.
            let _ = scribe.ingest(message);
        }
        Err(e) => warn!(error = %e, "Skipping malformed message line"),
    }
}
