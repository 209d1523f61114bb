//! Point-in-time, order-preserving copy of a group's resident messages.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;

use super::ring::RingBuffer;
use crate::core::models::{Content, Message};

/// Fully owned view of a buffer; holds no reference to live group state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub count: usize,
    pub first_ts: Option<DateTime<Utc>>,
    pub last_ts: Option<DateTime<Utc>>,
    pub participants: BTreeSet<String>,
    /// Headers and message contents, oldest first.
    pub contents: Vec<Content>,
}

impl Snapshot {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Walks the buffer chronologically and copies everything out.
    /// Header timestamps are rendered in `tz`.
    #[must_use]
    pub fn capture(buffer: &RingBuffer, tz: Tz) -> Self {
        if buffer.is_empty() {
            return Self::empty();
        }

        let mut snapshot = Self {
            count: buffer.len(),
            contents: Vec::with_capacity(buffer.len() * 2),
            ..Self::default()
        };

        for message in buffer.iter() {
            if snapshot.first_ts.is_none() {
                snapshot.first_ts = Some(message.timestamp);
            }
            snapshot.last_ts = Some(message.timestamp);
            snapshot.participants.insert(message.sender.clone());
            snapshot.contents.extend(content_parts(message, tz));
        }

        snapshot
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `"HH:MM - HH:MM"` in `tz`, or `"N/A"` for an empty snapshot.
    #[must_use]
    pub fn time_range(&self, tz: Tz) -> String {
        match (self.first_ts, self.last_ts) {
            (Some(first), Some(last)) => format!(
                "{} - {}",
                first.with_timezone(&tz).format("%H:%M"),
                last.with_timezone(&tz).format("%H:%M")
            ),
            _ => "N/A".to_string(),
        }
    }
}

/// A text message is folded into its header line; media keeps a separate
/// header so the model can attribute it to the sender.
fn content_parts(message: &Message, tz: Tz) -> Vec<Content> {
    let stamp = message.timestamp.with_timezone(&tz).format("%H:%M");
    match &message.content {
        Content::Text { text } => vec![Content::text(format!(
            "[{stamp}] {}: {text}",
            message.sender
        ))],
        media => vec![
            Content::text(format!("[{stamp}] {}:", message.sender)),
            media.clone(),
        ],
    }
}
