//! Fixed-capacity, de-duplicating circular log of one group's messages.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::core::models::Message;

/// What [`RingBuffer::add`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Appended,
    /// Appended after overwriting the oldest resident message.
    Evicted { evicted_id: String },
    /// The id is already resident; nothing changed.
    Duplicate,
}

/// Per-group buffer state.
///
/// `slots` never grows or shrinks. `write_cursor` is the next slot to be
/// overwritten and `count` the number of resident messages. Once full, the
/// chronological order starts at `write_cursor` and wraps around.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<Option<Message>>,
    write_cursor: usize,
    count: usize,
    seen_ids: HashSet<String>,
    last_flush: Option<DateTime<Utc>>,
}

impl RingBuffer {
    /// A zero capacity is bumped to one slot.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            write_cursor: 0,
            count: 0,
            seen_ids: HashSet::with_capacity(capacity),
            last_flush: None,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    /// When the buffer was last cleared, `None` if never.
    #[must_use]
    pub fn last_flush(&self) -> Option<DateTime<Utc>> {
        self.last_flush
    }

    pub fn add(&mut self, message: Message) -> AddOutcome {
        if self.seen_ids.contains(&message.id) {
            return AddOutcome::Duplicate;
        }

        let capacity = self.capacity();
        let mut evicted_id = None;
        if self.count == capacity {
            // The slot under the cursor holds the oldest message; its id must
            // leave the set before the slot is reused.
            if let Some(oldest) = self.slots[self.write_cursor].take() {
                self.seen_ids.remove(&oldest.id);
                evicted_id = Some(oldest.id);
            }
        }

        self.seen_ids.insert(message.id.clone());
        self.slots[self.write_cursor] = Some(message);
        self.write_cursor = (self.write_cursor + 1) % capacity;
        self.count = (self.count + 1).min(capacity);

        match evicted_id {
            Some(evicted_id) => AddOutcome::Evicted { evicted_id },
            None => AddOutcome::Appended,
        }
    }

    /// Drops every resident message and stamps the flush time. Capacity is kept.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.write_cursor = 0;
        self.count = 0;
        self.seen_ids.clear();
        self.last_flush = Some(now);
    }

    /// Resident messages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        let capacity = self.capacity();
        let start = if self.count < capacity {
            0
        } else {
            self.write_cursor
        };
        (0..self.count).filter_map(move |i| self.slots[(start + i) % capacity].as_ref())
    }
}
