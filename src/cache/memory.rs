//! Memory Tier Module
//!
//! Bounded in-process map from key to [`CacheEntry`]. Fastest tier, volatile.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::CacheEntry;

// == Eviction Policy ==
/// Order in which live entries are evicted once the tier is over capacity.
///
/// Expired entries are always removed first, whatever the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Oldest `created_at` first. Reads never reorder entries.
    #[default]
    CreationOrder,
    /// Least recently read or written first.
    LeastRecentlyUsed,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "creation" | "fifo" => Ok(Self::CreationOrder),
            "lru" => Ok(Self::LeastRecentlyUsed),
            other => Err(format!("unknown eviction policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    entry: CacheEntry,
    /// Insertion sequence, breaks `created_at` ties
    seq: u64,
    /// Tick of the last read or write
    last_access: u64,
}

// == Memory Tier ==
/// Bounded mapping with creation-order (or LRU) eviction and TTL priority.
#[derive(Debug)]
pub struct MemoryTier {
    slots: HashMap<String, Slot>,
    max_entries: usize,
    policy: EvictionPolicy,
    /// Monotonic counter feeding `seq` and `last_access`
    tick: u64,
}

impl MemoryTier {
    // == Constructor ==
    /// Creates an empty tier holding at most `max_entries` live entries.
    pub fn new(max_entries: usize, policy: EvictionPolicy) -> Self {
        Self {
            slots: HashMap::new(),
            max_entries,
            policy,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    // == Get ==
    /// Returns the entry if present and not expired.
    ///
    /// An expired entry reads as a miss but stays in place until the next sweep.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        let now = current_timestamp_ms();
        let live = self
            .slots
            .get(key)
            .is_some_and(|slot| !slot.entry.is_expired_at(now));
        if !live {
            return None;
        }

        let tick = self.next_tick();
        let slot = self.slots.get_mut(key)?;
        slot.last_access = tick;
        Some(&slot.entry)
    }

    // == Set ==
    /// Inserts or overwrites an entry, then sweeps if over capacity.
    ///
    /// Returns the number of entries removed by the sweep.
    pub fn set(&mut self, key: String, entry: CacheEntry) -> usize {
        let tick = self.next_tick();
        self.slots.insert(
            key,
            Slot {
                entry,
                seq: tick,
                last_access: tick,
            },
        );

        if self.slots.len() > self.max_entries {
            self.sweep()
        } else {
            0
        }
    }

    // == Delete ==
    /// Removes an entry. Returns true if it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    // == Sweep ==
    /// Removes every expired entry, then evicts by policy until at or under
    /// capacity. Returns the number of entries removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.slots.len();
        let now = current_timestamp_ms();
        self.slots.retain(|_, slot| !slot.entry.is_expired_at(now));

        if self.slots.len() > self.max_entries {
            let excess = self.slots.len() - self.max_entries;
            let mut order: Vec<(u64, u64, String)> = self
                .slots
                .iter()
                .map(|(key, slot)| match self.policy {
                    EvictionPolicy::CreationOrder => (slot.entry.created_at, slot.seq, key.clone()),
                    EvictionPolicy::LeastRecentlyUsed => (slot.last_access, slot.seq, key.clone()),
                })
                .collect();
            order.sort_unstable();

            for (_, _, key) in order.into_iter().take(excess) {
                self.slots.remove(&key);
            }
        }

        before - self.slots.len()
    }

    // == Remove Prefix ==
    /// Removes every key starting with `prefix`. Returns the number removed.
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| !key.starts_with(prefix));
        before - self.slots.len()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    // == Contains ==
    /// Checks physical presence, including expired entries not yet swept.
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Keys ordered from first to be evicted to last.
    pub fn keys_by_eviction_order(&self) -> Vec<String> {
        let mut order: Vec<(u64, u64, &String)> = self
            .slots
            .iter()
            .map(|(key, slot)| match self.policy {
                EvictionPolicy::CreationOrder => (slot.entry.created_at, slot.seq, key),
                EvictionPolicy::LeastRecentlyUsed => (slot.last_access, slot.seq, key),
            })
            .collect();
        order.sort_unstable();
        order.into_iter().map(|(_, _, key)| key.clone()).collect()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }
}
