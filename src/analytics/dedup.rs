//! Time-windowed suppression of repeated clicks
//!
//! A click is a duplicate when the same (link, IP) pair was counted less than
//! one window ago. Stale entries are swept on every call instead of by a
//! timer, so an idle process may hold entries past their window until the
//! next click arrives.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::DedupConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub link_id: i64,
    pub ip: String,
}

impl DedupKey {
    pub fn new(link_id: i64, ip: impl Into<String>) -> Self {
        Self {
            link_id,
            ip: ip.into(),
        }
    }
}

/// Shared duplicate-click filter
///
/// Implementations decide their own storage; the in-memory one is local to a
/// single process, so several instances each keep their own window.
pub trait DedupCache: Send + Sync {
    /// Returns true if `key` was counted less than one window before `now`.
    /// Otherwise records `now` for `key` and returns false.
    fn check_and_mark(&self, key: &DedupKey, now: Instant) -> bool;

    /// Number of tracked entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process dedup cache backed by a `DashMap`, bounded to `max_entries`
pub struct MemoryDedupCache {
    entries: DashMap<DedupKey, Instant>,
    window: Duration,
    sweep_age: Duration,
    max_entries: usize,
}

impl MemoryDedupCache {
    /// A `sweep_age` shorter than `window` is raised to `window`.
    pub fn new(window: Duration, sweep_age: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            window,
            sweep_age: sweep_age.max(window),
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &DedupConfig) -> Self {
        Self::new(config.window(), config.sweep_age(), config.max_entries)
    }

    fn sweep(&self, now: Instant) {
        let sweep_age = self.sweep_age;
        self.entries
            .retain(|_, last_seen| now.saturating_duration_since(*last_seen) <= sweep_age);
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| *entry.value())
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            debug!(link_id = key.link_id, "dedup cache full, evicting oldest entry");
            self.entries.remove(&key);
        }
    }
}

impl Default for MemoryDedupCache {
    fn default() -> Self {
        Self::from_config(&DedupConfig::default())
    }
}

impl DedupCache for MemoryDedupCache {
    fn check_and_mark(&self, key: &DedupKey, now: Instant) -> bool {
        self.sweep(now);

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        // The entry guard holds the shard lock, so check and write are one step per key
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if now.saturating_duration_since(*occupied.get()) < self.window {
                    return true;
                }
                occupied.insert(now);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
            }
        }

        false
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
