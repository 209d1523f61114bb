//! Decides when a group's buffered conversation is ready to summarize.
//!
//! The decision is a pure function of the current counters. Checks run in a
//! fixed order and the first match wins:
//!
//! 1. fewer than `min_messages` buffered: never (hard floor)
//! 2. keyword seen in the message just appended
//! 3. volume threshold reached (`message_count > 0`)
//! 4. interval elapsed since the last flush, or no flush yet (`interval_minutes > 0`)

use chrono::{DateTime, Utc};
use std::fmt;

use crate::core::config::TriggerConfig;

/// Why a flush was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Keyword,
    MessageCount,
    Interval,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::Keyword => write!(f, "keyword"),
            TriggerReason::MessageCount => write!(f, "message_count"),
            TriggerReason::Interval => write!(f, "interval"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPolicy {
    pub min_messages: usize,
    /// 0 disables the volume trigger.
    pub message_count_threshold: usize,
    /// 0 disables the time trigger.
    pub interval_minutes: u64,
}

impl From<&TriggerConfig> for TriggerPolicy {
    fn from(config: &TriggerConfig) -> Self {
        Self {
            min_messages: config.min_messages,
            message_count_threshold: config.message_count,
            interval_minutes: config.interval_minutes,
        }
    }
}

impl TriggerPolicy {
    /// `minutes_since_last_flush` is `None` when the group was never flushed.
    #[must_use]
    pub fn evaluate(
        &self,
        count: usize,
        keyword_detected: bool,
        minutes_since_last_flush: Option<f64>,
    ) -> Option<TriggerReason> {
        if count < self.min_messages {
            return None;
        }

        if keyword_detected {
            return Some(TriggerReason::Keyword);
        }

        if self.message_count_threshold > 0 && count >= self.message_count_threshold {
            return Some(TriggerReason::MessageCount);
        }

        if self.interval_minutes > 0 {
            let due = match minutes_since_last_flush {
                None => true,
                Some(minutes) => minutes >= self.interval_minutes as f64,
            };
            if due {
                return Some(TriggerReason::Interval);
            }
        }

        None
    }

    #[must_use]
    pub fn should_summarize(
        &self,
        count: usize,
        keyword_detected: bool,
        minutes_since_last_flush: Option<f64>,
    ) -> bool {
        self.evaluate(count, keyword_detected, minutes_since_last_flush)
            .is_some()
    }
}

/// Fractional minutes between `last_flush` and `now`, `None` if never flushed.
#[must_use]
pub fn minutes_since(last_flush: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<f64> {
    last_flush.map(|last| (now - last).num_milliseconds() as f64 / 60_000.0)
}

/// Whether `text` contains the configured summary keyword. An empty keyword
/// never matches.
#[must_use]
pub fn keyword_detected(text: &str, keyword: &str) -> bool {
    !keyword.is_empty() && text.contains(keyword)
}
