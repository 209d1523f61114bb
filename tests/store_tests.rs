use chrono::{Duration, Utc};
use chrono_tz::Tz;
use scribe::buffer::{AddOutcome, GroupStore};
use scribe::core::config::{ScribeConfig, SharedConfig};
use scribe::core::models::{Content, Message};
use std::sync::Arc;

fn config(max_buffer_size: usize) -> SharedConfig {
    SharedConfig::new(ScribeConfig {
        max_buffer_size,
        ..ScribeConfig::default()
    })
}

fn msg(group: &str, id: &str) -> Message {
    Message {
        id: id.to_string(),
        timestamp: Utc::now(),
        sender: "Ana".to_string(),
        group_key: group.to_string(),
        content: Content::text(id),
    }
}

#[test]
fn test_groups_created_lazily() {
    let store = GroupStore::new(config(10));
    assert!(store.is_empty());
    assert_eq!(store.counters("ops"), None);
    assert!(store.snapshot("ops", Tz::UTC).is_empty());

    store.add(msg("ops", "m1"));
    let counters = store.counters("ops").unwrap();
    assert_eq!(counters.count, 1);
    assert_eq!(counters.capacity, 10);
    assert_eq!(counters.last_flush, None);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_groups_are_isolated() {
    let store = GroupStore::new(config(10));
    store.add(msg("ops", "m1"));
    store.add(msg("ops", "m2"));
    // Same id in another group is not a duplicate.
    assert_eq!(store.add(msg("design", "m1")), AddOutcome::Appended);

    assert_eq!(store.resident_ids("ops"), vec!["m1", "m2"]);
    assert_eq!(store.resident_ids("design"), vec!["m1"]);

    let mut keys = store.group_keys();
    keys.sort();
    assert_eq!(keys, vec!["design", "ops"]);
}

#[test]
fn test_capacity_change_applies_to_new_groups_only() {
    let shared = config(2);
    let store = GroupStore::new(shared.clone());
    store.add(msg("old", "m1"));

    shared
        .update(ScribeConfig {
            max_buffer_size: 4,
            ..ScribeConfig::default()
        })
        .unwrap();
    store.add(msg("new", "m1"));

    assert_eq!(store.counters("old").unwrap().capacity, 2);
    assert_eq!(store.counters("new").unwrap().capacity, 4);
}

#[test]
fn test_clear_keeps_group_and_stamps_flush() {
    let store = GroupStore::new(config(10));
    store.add(msg("ops", "m1"));
    store.add(msg("ops", "m2"));

    let before = Utc::now() - Duration::seconds(1);
    store.clear("ops");

    let counters = store.counters("ops").unwrap();
    assert_eq!(counters.count, 0);
    assert!(counters.last_flush.unwrap() >= before);
    assert_eq!(store.group_keys(), vec!["ops"]);

    // Unknown groups are ignored.
    store.clear("nope");
    assert_eq!(store.len(), 1);
}

#[test]
fn test_concurrent_adds_respect_capacity() {
    let store = Arc::new(GroupStore::new(config(50)));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..100 {
                    store.add(msg("busy", &format!("t{t}-m{i}")));
                    // Re-delivery of the same id is dropped.
                    store.add(msg("busy", &format!("t{t}-m{i}")));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let ids = store.resident_ids("busy");
    assert_eq!(ids.len(), 50);
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 50);
}
