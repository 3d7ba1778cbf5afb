//! Latest-value-wins coalescing of outbound updates.
//!
//! The debouncer never reads a clock. Callers pass `now` in, which keeps the
//! board deterministic under test and lets hosts drive it from any event loop.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Pending<V> {
    value: V,
    deadline: Instant,
    seq: u64,
}

/// Coalesces values per key until the key has been quiet for `interval`.
#[derive(Debug)]
pub struct Debouncer<K, V> {
    interval: Duration,
    pending: HashMap<K, Pending<V>>,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replace any pending value for `key` and restart its deadline.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            key,
            Pending {
                value,
                deadline: now + self.interval,
                seq,
            },
        );
    }

    /// Remove and return every value whose deadline is at or before `now`,
    /// in the order they were last scheduled.
    pub fn drain_due(&mut self, now: Instant) -> Vec<V> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();
        let mut out: Vec<Pending<V>> = due
            .into_iter()
            .filter_map(|k| self.pending.remove(&k))
            .collect();
        out.sort_by_key(|p| p.seq);
        out.into_iter().map(|p| p.value).collect()
    }

    /// Remove and return everything, in scheduling order.
    pub fn drain_all(&mut self) -> Vec<V> {
        let mut out: Vec<Pending<V>> = self.pending.drain().map(|(_, p)| p).collect();
        out.sort_by_key(|p| p.seq);
        out.into_iter().map(|p| p.value).collect()
    }

    /// Drop a pending value without emitting it.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|p| p.value)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
