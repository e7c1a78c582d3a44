//! In-process TTL cache with single-flight fetches.
//!
//! Concurrent lookups of the same key run the fetch once: the first caller
//! computes while the rest wait on a condvar. A failed fetch releases the key
//! so a waiter can retry, instead of caching the error.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;

enum Slot<V> {
    /// A fetch is running on another thread.
    InFlight,
    Ready { value: V, stored_at: Instant },
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
    ready: Condvar,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
            ready: Condvar::new(),
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` to produce it.
    /// At most one fetch per key runs at a time; errors are not cached.
    pub fn get_or_fetch<F>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let mut slots = self.slots.lock().expect("cache mutex poisoned");
        loop {
            match slots.get(&key) {
                Some(Slot::Ready { value, stored_at }) if stored_at.elapsed() < self.ttl => {
                    return Ok(value.clone());
                }
                Some(Slot::InFlight) => {
                    slots = self.ready.wait(slots).expect("cache mutex poisoned");
                }
                _ => break, // absent or expired: this thread fetches
            }
        }

        slots.insert(key.clone(), Slot::InFlight);
        drop(slots);

        let outcome = fetch();

        let mut slots = self.slots.lock().expect("cache mutex poisoned");
        match &outcome {
            Ok(value) => {
                slots.insert(
                    key,
                    Slot::Ready {
                        value: value.clone(),
                        stored_at: Instant::now(),
                    },
                );
            }
            Err(_) => {
                slots.remove(&key);
            }
        }
        drop(slots);
        self.ready.notify_all();
        outcome
    }

    /// Drops a cached entry, forcing the next lookup to refetch.
    pub fn invalidate(&self, key: &K) {
        let mut slots = self.slots.lock().expect("cache mutex poisoned");
        if matches!(slots.get(key), Some(Slot::Ready { .. })) {
            slots.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
