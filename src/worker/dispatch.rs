//! Single-flight summarization per group.
//!
//! A claim is an entry in a concurrent set, inserted only if absent and
//! removed by [`ClaimGuard`]'s `Drop`. The guard lives inside the spawned task,
//! so the claim is released however the task ends: normal return, error,
//! panic, or the runtime dropping the task. The claim set is independent of
//! the per-group data lock, which is only taken briefly for the snapshot and
//! for the final clear.
//!
//! Generation and delivery are each bounded by `summary_timeout_secs` and
//! both observe the shutdown token, so a hung collaborator cannot pin a claim.

use dashmap::DashSet;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::deliver::SummarySink;
use super::summarize::{SummarizeResult, summarize_snapshot};
use crate::ai::Summarizer;
use crate::buffer::GroupStore;
use crate::core::config::SharedConfig;
use crate::errors::ScribeError;

/// Why an attempt finished without delivering anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyBuffer,
    NoImportantUpdate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyBuffer => write!(f, "empty_buffer"),
            SkipReason::NoImportantUpdate => write!(f, "no_important_update"),
        }
    }
}

/// How one summarization attempt ended.
///
/// `Delivered` and `Skipped` clear the group's buffer; `Failed` and
/// `Cancelled` leave it untouched.
#[derive(Debug)]
pub enum DispatchOutcome {
    Delivered,
    Skipped(SkipReason),
    Failed(ScribeError),
    Cancelled,
}

impl DispatchOutcome {
    /// Whether the buffer was cleared by this attempt.
    #[must_use]
    pub fn cleared_buffer(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered | DispatchOutcome::Skipped(_))
    }
}

/// Held for the lifetime of a summarization task.
struct ClaimGuard {
    claims: Arc<DashSet<String>>,
    group_key: String,
}

impl ClaimGuard {
    fn acquire(claims: &Arc<DashSet<String>>, group_key: &str) -> Option<Self> {
        claims.insert(group_key.to_string()).then(|| Self {
            claims: Arc::clone(claims),
            group_key: group_key.to_string(),
        })
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.claims.remove(&self.group_key);
        debug!(group = %self.group_key, "Summary claim released");
    }
}

struct DispatchContext {
    store: Arc<GroupStore>,
    summarizer: Arc<dyn Summarizer>,
    sink: Arc<dyn SummarySink>,
    config: SharedConfig,
}

pub struct SummaryDispatcher {
    context: Arc<DispatchContext>,
    claims: Arc<DashSet<String>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl SummaryDispatcher {
    #[must_use]
    pub fn new(
        store: Arc<GroupStore>,
        summarizer: Arc<dyn Summarizer>,
        sink: Arc<dyn SummarySink>,
        config: SharedConfig,
    ) -> Self {
        Self {
            context: Arc::new(DispatchContext {
                store,
                summarizer,
                sink,
                config,
            }),
            claims: Arc::new(DashSet::new()),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Starts a summarization task for `group_key` unless one is already
    /// running, in which case the request is dropped and `None` returned.
    /// Must be called from within a tokio runtime.
    pub fn try_dispatch(&self, group_key: &str) -> Option<JoinHandle<DispatchOutcome>> {
        if self.cancel.is_cancelled() {
            debug!(group = group_key, "Shutting down, dropping summary request");
            return None;
        }

        let Some(claim) = ClaimGuard::acquire(&self.claims, group_key) else {
            debug!(group = group_key, "Summary already in flight, dropping request");
            return None;
        };

        let context = Arc::clone(&self.context);
        let cancel = self.cancel.clone();
        let attempt = Uuid::new_v4().to_string();
        info!(group = group_key, attempt = %attempt, "Summary claimed");

        Some(self.tracker.spawn(async move {
            let outcome = run_attempt(&context, &claim.group_key, &attempt, &cancel).await;
            drop(claim);
            outcome
        }))
    }

    #[must_use]
    pub fn is_in_flight(&self, group_key: &str) -> bool {
        self.claims.contains(group_key)
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.claims.len()
    }

    /// Token observed by in-flight attempts; cancelling it stops them.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels in-flight attempts, refuses new ones, and waits for every
    /// task to exit. Interrupted groups keep their buffers.
    pub async fn shutdown(&self) {
        info!(in_flight = self.in_flight(), "Stopping summary dispatcher");
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("Summary dispatcher stopped");
    }
}

/// How a cancellable, time-bounded step ended.
enum Bounded<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

/// Runs `step` until it finishes, `timeout_secs` elapse, or `cancel` fires.
/// Panics inside `step` come back as `Done(Err(_))`.
async fn bounded<F, T>(
    cancel: &CancellationToken,
    timeout_secs: u64,
    step: F,
) -> Bounded<std::thread::Result<T>>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Bounded::Cancelled,
        result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            AssertUnwindSafe(step).catch_unwind(),
        ) => match result {
            Ok(outcome) => Bounded::Done(outcome),
            Err(_elapsed) => Bounded::TimedOut,
        },
    }
}

async fn run_attempt(
    context: &DispatchContext,
    group_key: &str,
    attempt: &str,
    cancel: &CancellationToken,
) -> DispatchOutcome {
    let config = context.config.current();
    let tz = config.timezone;

    // The group lock is held only while copying; it is released before any I/O.
    let snapshot = context.store.snapshot(group_key, tz);
    if snapshot.is_empty() {
        info!(group = group_key, attempt, reason = %SkipReason::EmptyBuffer, "Summary skipped");
        context.store.clear(group_key);
        return DispatchOutcome::Skipped(SkipReason::EmptyBuffer);
    }

    let timeout_secs = config.summary_timeout_secs;
    let generated = bounded(
        cancel,
        timeout_secs,
        summarize_snapshot(context.summarizer.as_ref(), group_key, &snapshot, tz),
    )
    .await;

    let report = match generated {
        Bounded::Cancelled => {
            info!(group = group_key, attempt, "Summary generation cancelled, buffer kept");
            return DispatchOutcome::Cancelled;
        }
        Bounded::TimedOut => Err(ScribeError::Timeout(timeout_secs)),
        Bounded::Done(Err(_panic)) => Err(ScribeError::LlmError("summarizer panicked".to_string())),
        Bounded::Done(Ok(result)) => result,
    };

    let report = match report {
        Err(e) => {
            error!(group = group_key, attempt, error = %e, "Error generating summary, buffer kept for retry");
            return DispatchOutcome::Failed(e);
        }
        Ok(SummarizeResult::NoImportantUpdate) => {
            info!(group = group_key, attempt, reason = %SkipReason::NoImportantUpdate, "Summary skipped");
            context.store.clear(group_key);
            return DispatchOutcome::Skipped(SkipReason::NoImportantUpdate);
        }
        Ok(SummarizeResult::Summary(report)) => report,
    };

    let delivery = context.sink.deliver(group_key, &report);
    let delivered = match bounded(cancel, timeout_secs, delivery).await {
        Bounded::Cancelled => {
            info!(group = group_key, attempt, "Summary delivery cancelled, buffer kept");
            return DispatchOutcome::Cancelled;
        }
        Bounded::TimedOut => Err(ScribeError::Timeout(timeout_secs)),
        Bounded::Done(Err(_panic)) => Err(ScribeError::DeliveryError("sink panicked".to_string())),
        Bounded::Done(Ok(result)) => result,
    };

    match delivered {
        Ok(()) => {
            context.store.clear(group_key);
            info!(group = group_key, attempt, "Summary sent successfully");
            DispatchOutcome::Delivered
        }
        Err(e) => {
            warn!(group = group_key, attempt, error = %e, "Error sending summary, buffer kept for retry");
            DispatchOutcome::Failed(e)
        }
    }
}
