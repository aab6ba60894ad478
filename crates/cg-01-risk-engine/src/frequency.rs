//! Bounded sliding-window frequency tracker backing H2/H3 (§4.1).
//!
//! A plain `HashMap<Address, Vec<Timestamp>>` would grow without bound
//! under sustained traffic, so the per-key timestamp lists live behind an
//! `lru::LruCache` capped at 10,000 keys (invariant 7). Every access
//! prunes timestamps older than the window and drops the key entirely
//! once its list empties; a periodic [`FrequencyTracker::sweep`] catches
//! keys that stopped being accessed before they aged out on their own.

use lru::LruCache;
use shared_types::entities::Address;
use std::num::NonZeroUsize;

/// Maximum distinct keys tracked at once (invariant 7).
pub const MAX_TRACKED_KEYS: usize = 10_000;

/// Sliding window width in seconds, shared by H2 (per-sender) and H3
/// (per-contract).
pub const WINDOW_SECONDS: i64 = 60;

/// A key is evicted by the background sweep once its newest timestamp is
/// older than twice the window, even if nothing pruned it on access.
const ENTRY_TTL_SECONDS: i64 = WINDOW_SECONDS * 2;

/// Bounded, TTL-pruned per-key occurrence tracker.
pub struct FrequencyTracker {
    windows: LruCache<Address, Vec<i64>>,
}

impl FrequencyTracker {
    pub fn new() -> Self {
        Self {
            windows: LruCache::new(NonZeroUsize::new(MAX_TRACKED_KEYS).unwrap()),
        }
    }

    /// Records an occurrence of `key` at `now` and returns the count of
    /// occurrences (including this one) still inside the window.
    pub fn record(&mut self, key: &Address, now: i64) -> usize {
        if self.windows.get_mut(key).is_none() {
            self.windows.put(key.clone(), Vec::new());
        }
        let entry = self.windows.get_mut(key).expect("just inserted");
        entry.push(now);
        prune(entry, now);
        entry.len()
    }

    /// Drops timestamps outside `2 * WINDOW_SECONDS` across every tracked
    /// key, and evicts keys left with no timestamps. Intended to run on a
    /// `tokio::time::interval` every 5 minutes (§4.1); takes `now` as a
    /// parameter so it stays unit-testable without a clock.
    pub fn sweep(&mut self, now: i64) {
        let stale: Vec<Address> = self
            .windows
            .iter()
            .filter(|(_, timestamps)| {
                timestamps
                    .last()
                    .map(|&t| now - t > ENTRY_TTL_SECONDS)
                    .unwrap_or(true)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            self.windows.pop(&key);
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl Default for FrequencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn prune(timestamps: &mut Vec<i64>, now: i64) {
    timestamps.retain(|&t| now - t <= WINDOW_SECONDS);
}
