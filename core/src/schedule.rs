//! Cooperative wake-ups measured in simulated time.

use std::{collections::BTreeMap, time::Duration};

/// Handle identifying one scheduled wait.
///
/// A handle goes stale once its wait fires, is cancelled, or is replaced by a
/// newer wait for the same key; cancelling a stale handle does nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle<K> {
    key: K,
    generation: u64,
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    wake_at: Duration,
    generation: u64,
}

/// Keyed set of pending wake-ups; at most one wait exists per key.
#[derive(Clone, Debug)]
pub struct Timers<K: Ord + Copy> {
    pending: BTreeMap<K, Pending>,
    next_generation: u64,
}

impl<K: Ord + Copy> Default for Timers<K> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_generation: 0,
        }
    }
}

impl<K: Ord + Copy> Timers<K> {
    /// Creates an empty timer set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a wake-up `delay` after `now`, replacing any pending wait for `key`.
    pub fn schedule(&mut self, key: K, now: Duration, delay: Duration) -> TimerHandle<K> {
        let generation = self.next_generation;
        self.next_generation += 1;
        let _ = self.pending.insert(
            key,
            Pending {
                wake_at: now.saturating_add(delay),
                generation,
            },
        );
        TimerHandle { key, generation }
    }

    /// Cancels the wait identified by `handle` if it is still the pending one.
    pub fn cancel(&mut self, handle: &TimerHandle<K>) {
        if self
            .pending
            .get(&handle.key)
            .is_some_and(|pending| pending.generation == handle.generation)
        {
            let _ = self.pending.remove(&handle.key);
        }
    }

    /// Cancels whatever wait is pending for `key`.
    pub fn cancel_key(&mut self, key: K) -> bool {
        self.pending.remove(&key).is_some()
    }

    /// Reports whether a wait is pending for `key`.
    #[must_use]
    pub fn is_pending(&self, key: K) -> bool {
        self.pending.contains_key(&key)
    }

    /// Removes and returns every key whose wake time is at or before `now`.
    ///
    /// Keys are ordered by wake time, ties broken by key order.
    pub fn drain_due(&mut self, now: Duration) -> Vec<K> {
        let mut due: Vec<(Duration, K)> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.wake_at <= now)
            .map(|(key, pending)| (pending.wake_at, *key))
            .collect();
        due.sort();
        for (_, key) in &due {
            let _ = self.pending.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    /// Drops every pending wait.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending waits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether no wait is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
