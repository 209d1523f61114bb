//! Delivery seam for finished reports and the stdout sink.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::errors::ScribeError;

/// Where finished reports go. A failed delivery keeps the group's buffer so
/// the next trigger can try again.
#[async_trait]
pub trait SummarySink: Send + Sync {
    async fn deliver(&self, group_key: &str, report: &str) -> Result<(), ScribeError>;
}

/// Writes reports to stdout, one block per report.
#[derive(Debug, Default)]
pub struct StdoutSink {
    // Serializes writers so concurrent reports do not interleave.
    out: Mutex<()>,
}

impl StdoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SummarySink for StdoutSink {
    async fn deliver(&self, group_key: &str, report: &str) -> Result<(), ScribeError> {
        let _guard = self.out.lock().await;
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{report}\n\n").as_bytes())
            .await
            .map_err(|e| ScribeError::DeliveryError(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| ScribeError::DeliveryError(e.to_string()))?;
        info!(group = group_key, "Summary delivered to stdout");
        Ok(())
    }
}
