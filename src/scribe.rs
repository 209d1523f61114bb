use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::ai::Summarizer;
use crate::buffer::{AddOutcome, GroupStore};
use crate::core::config::SharedConfig;
use crate::core::models::Message;
use crate::trigger::{TriggerPolicy, keyword_detected, minutes_since};
use crate::worker::{DispatchOutcome, SummaryDispatcher, SummarySink};

/// Entry point for the chat adapter and the periodic timer.
///
/// Both producers funnel into [`Scribe::evaluate_and_maybe_dispatch`], which
/// the dispatcher turns into at most one running summary per group.
pub struct Scribe {
    config: SharedConfig,
    store: Arc<GroupStore>,
    dispatcher: SummaryDispatcher,
}

impl Scribe {
    #[must_use]
    pub fn new(
        config: SharedConfig,
        summarizer: Arc<dyn Summarizer>,
        sink: Arc<dyn SummarySink>,
    ) -> Self {
        let store = Arc::new(GroupStore::new(config.clone()));
        let dispatcher =
            SummaryDispatcher::new(Arc::clone(&store), summarizer, sink, config.clone());
        Self {
            config,
            store,
            dispatcher,
        }
    }

    #[must_use]
    pub fn store(&self) -> &GroupStore {
        &self.store
    }

    #[must_use]
    pub fn dispatcher(&self) -> &SummaryDispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Fire-and-forget buffering; duplicates are ignored.
    pub fn add(&self, message: Message) -> AddOutcome {
        self.store.add(message)
    }

    /// Full ingestion path for one adapter message: allow-list, buffer,
    /// keyword check, trigger evaluation. Returns the spawned task if this
    /// message started a summary.
    pub fn ingest(&self, message: Message) -> Option<JoinHandle<DispatchOutcome>> {
        let config = self.config.current();
        if !is_target_group(&message.group_key, &config.target_groups) {
            debug!(group = %message.group_key, "Group not in target list, ignoring message");
            return None;
        }

        let keyword = message
            .content
            .as_text()
            .is_some_and(|text| keyword_detected(text, &config.trigger.keyword));
        let group_key = message.group_key.clone();

        // A redelivered message changes nothing in the buffer but still gets a
        // trigger evaluation, so a keyword dropped while the group was busy can fire.
        self.add(message);
        self.evaluate_and_maybe_dispatch(&group_key, keyword)
    }

    #[must_use]
    pub fn should_summarize(&self, group_key: &str, keyword_detected: bool) -> bool {
        let Some(counters) = self.store.counters(group_key) else {
            return false;
        };
        let config = self.config.current();
        let policy = TriggerPolicy::from(&config.trigger);
        match policy.evaluate(
            counters.count,
            keyword_detected,
            minutes_since(counters.last_flush, Utc::now()),
        ) {
            Some(reason) => {
                info!(group = group_key, count = counters.count, %reason, "Summary triggered");
                true
            }
            None => {
                debug!(group = group_key, count = counters.count, "No summary trigger");
                false
            }
        }
    }

    /// Called after every ingested message, and on each timer tick with
    /// `keyword_detected = false`.
    pub fn evaluate_and_maybe_dispatch(
        &self,
        group_key: &str,
        keyword_detected: bool,
    ) -> Option<JoinHandle<DispatchOutcome>> {
        if self.should_summarize(group_key, keyword_detected) {
            self.dispatcher.try_dispatch(group_key)
        } else {
            None
        }
    }

    /// Every group with buffered history.
    #[must_use]
    pub fn group_keys(&self) -> Vec<String> {
        self.store.group_keys()
    }

    /// One timer tick over all known groups.
    pub fn sweep(&self) -> Vec<JoinHandle<DispatchOutcome>> {
        self.group_keys()
            .iter()
            .filter_map(|group_key| self.evaluate_and_maybe_dispatch(group_key, false))
            .collect()
    }

    /// Sweeps every `timer_tick_secs` until `cancel` fires. The period is
    /// re-read after each tick so configuration updates apply.
    pub async fn run_timer(&self, cancel: CancellationToken) {
        info!(
            tick_secs = self.config.current().timer_tick_secs,
            "Starting interval timer"
        );
        loop {
            let tick = Duration::from_secs(self.config.current().timer_tick_secs);
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(tick) => {
                    let started = self.sweep().len();
                    debug!(started, "Interval timer swept groups");
                }
            }
        }
        info!("Interval timer stopped");
    }

    /// Stops the dispatcher and waits for in-flight summaries to exit.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}

/// Case-insensitive substring match against the target list; an empty list
/// accepts every group.
#[must_use]
pub fn is_target_group(group_key: &str, targets: &[String]) -> bool {
    if targets.is_empty() {
        return true;
    }
    let group_lower = group_key.to_lowercase();
    targets
        .iter()
        .any(|target| group_lower.contains(&target.to_lowercase()))
}
