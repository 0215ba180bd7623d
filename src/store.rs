//! In-memory, grow-only message store.
//!
//! The store pairs an id set (membership) with a vector kept sorted by
//! `timestamp`. Both live behind one mutex, so every reader observes the
//! result of some prefix of applied appends.

use crate::types::{Message, MessageId};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct StoreInner {
    ids: HashSet<MessageId>,
    ordered: Vec<Message>,
}

/// Thread-safe, deduplicating, timestamp-ordered set of messages.
///
/// Merge is set union, so applying the same messages in any order or batching
/// yields the same id set. Nothing is ever removed.
#[derive(Default)]
pub struct MessageStore {
    inner: Mutex<StoreInner>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // No code path panics while holding the lock; recover the data if one ever did.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert `message` unless its id is already present.
    ///
    /// Returns `true` if the message was accepted. The ordered view stays
    /// sorted by timestamp; messages with equal timestamps keep their
    /// insertion order (same result as append followed by a stable sort).
    pub fn try_append(&self, message: Message) -> bool {
        let mut inner = self.lock();
        if !inner.ids.insert(message.id) {
            return false;
        }
        let pos = inner
            .ordered
            .partition_point(|m| m.timestamp <= message.timestamp);
        inner.ordered.insert(pos, message);
        true
    }

    /// Apply a batch of messages, returning how many were new.
    pub fn merge<I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = Message>,
    {
        messages
            .into_iter()
            .map(|m| self.try_append(m))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Independent copy of the ordered messages.
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().ordered.clone()
    }

    /// Ids of every stored message, in snapshot order.
    pub fn known_ids(&self) -> Vec<MessageId> {
        self.lock().ordered.iter().map(|m| m.id).collect()
    }

    /// Messages whose ids are not in `known`, in snapshot order.
    pub fn missing_for(&self, known: &HashSet<MessageId>) -> Vec<Message> {
        self.lock()
            .ordered
            .iter()
            .filter(|m| !known.contains(&m.id))
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.lock().ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn msg(timestamp: &str, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            author: "alice".to_string(),
            content: content.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    fn id_set(store: &MessageStore) -> HashSet<MessageId> {
        store.known_ids().into_iter().collect()
    }

    #[test]
    fn test_append_is_idempotent() {
        let store = MessageStore::new();
        let m = msg("2025-01-01T00:00:00.000000Z", "hello");

        assert!(store.try_append(m.clone()));
        let before = id_set(&store);
        assert!(!store.try_append(m.clone()));

        assert_eq!(id_set(&store), before);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_id_with_different_body_is_rejected() {
        let store = MessageStore::new();
        let m = msg("2025-01-01T00:00:00.000000Z", "original");
        let mut imposter = m.clone();
        imposter.content = "changed".to_string();

        assert!(store.try_append(m));
        assert!(!store.try_append(imposter));
        assert_eq!(store.snapshot()[0].content, "original");
    }

    #[test]
    fn test_identical_fields_distinct_ids_both_kept() {
        let store = MessageStore::new();
        let a = msg("2025-01-01T00:00:00.000000Z", "same");
        let mut b = a.clone();
        b.id = Uuid::new_v4();

        assert!(store.try_append(a));
        assert!(store.try_append(b));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reverse_arrival_is_sorted_by_timestamp() {
        let store = MessageStore::new();
        let t1 = msg("2025-01-01T00:00:01.000000Z", "first");
        let t2 = msg("2025-01-01T00:00:02.000000Z", "second");

        store.try_append(t2.clone());
        store.try_append(t1.clone());

        let snapshot = store.snapshot();
        assert_eq!(snapshot, vec![t1, t2]);
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let store = MessageStore::new();
        let ts = "2025-01-01T00:00:05.000000Z";
        let a = msg(ts, "a");
        let b = msg(ts, "b");
        let c = msg(ts, "c");
        let early = msg("2025-01-01T00:00:01.000000Z", "early");
        let late = msg("2025-01-01T00:00:09.000000Z", "late");

        for m in [late.clone(), a.clone(), b.clone(), early.clone(), c.clone()] {
            store.try_append(m);
        }

        let contents: Vec<String> = store.snapshot().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["early", "a", "b", "c", "late"]);
    }

    #[test]
    fn test_merge_order_and_batching_do_not_matter() {
        let messages: Vec<Message> = (0..6)
            .map(|i| msg(&format!("2025-01-01T00:00:0{}.000000Z", i % 3), "x"))
            .collect();

        let forward = MessageStore::new();
        forward.merge(messages.clone());

        let reversed = MessageStore::new();
        reversed.merge(messages.iter().rev().cloned());

        let batched = MessageStore::new();
        for chunk in messages.chunks(4).rev() {
            batched.merge(chunk.iter().cloned());
        }
        // Overlapping re-delivery
        batched.merge(messages[1..4].iter().cloned());

        assert_eq!(id_set(&forward), id_set(&reversed));
        assert_eq!(id_set(&forward), id_set(&batched));
        assert_eq!(batched.len(), messages.len());
    }

    #[test]
    fn test_merge_counts_only_new_messages() {
        let store = MessageStore::new();
        let a = msg("2025-01-01T00:00:01.000000Z", "a");
        let b = msg("2025-01-01T00:00:02.000000Z", "b");

        assert_eq!(store.merge(vec![a.clone()]), 1);
        assert_eq!(store.merge(vec![a, b]), 1);
    }

    #[test]
    fn test_missing_for_excludes_known_ids() {
        let store = MessageStore::new();
        let a = msg("2025-01-01T00:00:01.000000Z", "a");
        let b = msg("2025-01-01T00:00:02.000000Z", "b");
        let c = msg("2025-01-01T00:00:03.000000Z", "c");
        store.merge(vec![a.clone(), b.clone(), c.clone()]);

        let known: HashSet<MessageId> = [b.id, Uuid::new_v4()].into_iter().collect();
        assert_eq!(store.missing_for(&known), vec![a, c]);
        assert_eq!(store.missing_for(&HashSet::new()).len(), 3);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let store = MessageStore::new();
        store.try_append(msg("2025-01-01T00:00:01.000000Z", "a"));

        let snapshot = store.snapshot();
        store.try_append(msg("2025-01-01T00:00:02.000000Z", "b"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.contains(&snapshot[0].id));
    }

    #[test]
    fn test_concurrent_appends_keep_ids_and_order_consistent() {
        let store = std::sync::Arc::new(MessageStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.try_append(msg(
                            &format!("2025-01-01T00:{:02}:{:02}.000000Z", t, i),
                            "c",
                        ));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 400);
        assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(id_set(&store).len(), 400);
    }
}
