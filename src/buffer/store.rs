//! Concurrent map of group keys to their ring buffers.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use super::ring::{AddOutcome, RingBuffer};
use super::snapshot::Snapshot;
use crate::core::config::SharedConfig;
use crate::core::models::Message;

type GroupHandle = Arc<RwLock<RingBuffer>>;

/// Counters the trigger policy needs, read under one shared lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupCounters {
    pub count: usize,
    pub capacity: usize,
    pub last_flush: Option<DateTime<Utc>>,
}

/// Concurrent group key → buffer map. Groups are created lazily on their
/// first message and live for the lifetime of the store.
#[derive(Debug)]
pub struct GroupStore {
    groups: DashMap<String, GroupHandle>,
    config: SharedConfig,
}

impl GroupStore {
    #[must_use]
    pub fn new(config: SharedConfig) -> Self {
        Self {
            groups: DashMap::new(),
            config,
        }
    }

    /// Clones the handle out so no map shard stays locked while the group
    /// lock is held.
    fn group(&self, group_key: &str) -> Option<GroupHandle> {
        self.groups.get(group_key).map(|g| Arc::clone(g.value()))
    }

    fn group_or_create(&self, group_key: &str) -> GroupHandle {
        if let Some(existing) = self.group(group_key) {
            return existing;
        }
        let handle = self
            .groups
            .entry(group_key.to_string())
            .or_insert_with(|| {
                let capacity = self.config.current().max_buffer_size;
                debug!(group = group_key, capacity, "Creating group buffer");
                Arc::new(RwLock::new(RingBuffer::new(capacity)))
            });
        Arc::clone(handle.value())
    }

    pub fn add(&self, message: Message) -> AddOutcome {
        let handle = self.group_or_create(&message.group_key);
        let mut buffer = handle.write().unwrap_or_else(PoisonError::into_inner);

        let id = message.id.clone();
        let group_key = message.group_key.clone();
        let outcome = buffer.add(message);
        match &outcome {
            AddOutcome::Duplicate => {
                debug!(group = %group_key, id = %id, "Duplicate message ID detected, skipping");
            }
            AddOutcome::Evicted { evicted_id } => {
                debug!(
                    group = %group_key,
                    id = %id,
                    evicted = %evicted_id,
                    count = buffer.len(),
                    "Message added to buffer, oldest evicted"
                );
            }
            AddOutcome::Appended => {
                debug!(group = %group_key, id = %id, count = buffer.len(), "Message added to buffer");
            }
        }
        outcome
    }

    /// Clears a group's messages; unknown groups are ignored.
    pub fn clear(&self, group_key: &str) {
        let Some(handle) = self.group(group_key) else {
            return;
        };
        let mut buffer = handle.write().unwrap_or_else(PoisonError::into_inner);
        info!(group = group_key, count = buffer.len(), "Buffered messages cleared");
        buffer.clear(Utc::now());
    }

    /// Copies the group's messages out under a shared lock, which is released
    /// before this returns.
    #[must_use]
    pub fn snapshot(&self, group_key: &str, tz: Tz) -> Snapshot {
        match self.group(group_key) {
            Some(handle) => {
                let buffer = handle.read().unwrap_or_else(PoisonError::into_inner);
                Snapshot::capture(&buffer, tz)
            }
            None => Snapshot::empty(),
        }
    }

    #[must_use]
    pub fn counters(&self, group_key: &str) -> Option<GroupCounters> {
        let handle = self.group(group_key)?;
        let buffer = handle.read().unwrap_or_else(PoisonError::into_inner);
        Some(GroupCounters {
            count: buffer.len(),
            capacity: buffer.capacity(),
            last_flush: buffer.last_flush(),
        })
    }

    /// Resident message ids of a group, oldest first.
    #[must_use]
    pub fn resident_ids(&self, group_key: &str) -> Vec<String> {
        self.group(group_key)
            .map(|handle| {
                let buffer = handle.read().unwrap_or_else(PoisonError::into_inner);
                buffer.iter().map(|m| m.id.clone()).collect()
            })
            .unwrap_or_default()
    }

    /// Every group that has ever buffered a message.
    #[must_use]
    pub fn group_keys(&self) -> Vec<String> {
        self.groups.iter().map(|entry| entry.key().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
