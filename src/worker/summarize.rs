//! Turns a snapshot into a summarizer request and the reply into a report.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::ai::{SummaryRequest, Summarizer};
use crate::buffer::Snapshot;
use crate::errors::ScribeError;
use crate::prompt::is_no_update;

/// Outcome of one summarizer call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarizeResult {
    /// Finished report, header included, ready for delivery.
    Summary(String),
    /// The model said there is nothing worth reporting.
    NoImportantUpdate,
}

#[must_use]
pub fn build_request(group_key: &str, snapshot: &Snapshot, tz: Tz) -> SummaryRequest {
    SummaryRequest {
        group_key: group_key.to_string(),
        time_range: snapshot.time_range(tz),
        message_count: snapshot.count,
        contents: snapshot.contents.clone(),
    }
}

/// Calls the summarizer for a non-empty snapshot and wraps the reply.
///
/// # Errors
///
/// Propagates the summarizer's error unchanged.
pub async fn summarize_snapshot(
    summarizer: &dyn Summarizer,
    group_key: &str,
    snapshot: &Snapshot,
    tz: Tz,
) -> Result<SummarizeResult, ScribeError> {
    info!(
        group = group_key,
        count = snapshot.count,
        participants = snapshot.participants.len(),
        time_range = %snapshot.time_range(tz),
        "Generating summary"
    );

    let reply = summarizer
        .summarize(build_request(group_key, snapshot, tz))
        .await?;

    if is_no_update(&reply) {
        info!(group = group_key, "No important updates");
        return Ok(SummarizeResult::NoImportantUpdate);
    }

    let report = format!(
        "{}\n\n{}",
        report_header(group_key, snapshot, tz, Utc::now()),
        reply.trim()
    );
    info!(
        group = group_key,
        chars = report.chars().count(),
        "Summary generated"
    );
    Ok(SummarizeResult::Summary(report))
}

#[must_use]
pub fn report_header(group_key: &str, snapshot: &Snapshot, tz: Tz, now: DateTime<Utc>) -> String {
    format!(
        "# {group_key} meeting notes\nDate: {}\nTime: {}\nParticipants: {}\n",
        now.with_timezone(&tz).format("%A, %B %-d, %Y"),
        snapshot.time_range(tz),
        snapshot.participants.len()
    )
}
