//! Per-client fixed-window rate limiting.
//!
//! State lives in a [`RateLimitStore`]. Production wires one
//! [`InMemoryRateLimitStore`] per process; horizontally scaled instances do
//! not share it, so the limit is best-effort across a fleet. This is a
//! deliberate latency trade-off, not a bug.

use std::fmt::Debug;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Counter for one client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    /// Epoch milliseconds after which the window restarts.
    pub reset_time: i64,
}

/// Storage for rate-limit counters.
pub trait RateLimitStore: Send + Sync + Debug {
    /// Current entry for a key.
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    /// Replace the entry for a key.
    fn set(&self, key: &str, entry: RateLimitEntry);

    /// Read-modify-write one key atomically. `update` receives the current
    /// entry (if any) and returns the entry to store.
    fn upsert(
        &self,
        key: &str,
        update: &mut dyn FnMut(Option<RateLimitEntry>) -> RateLimitEntry,
    ) -> RateLimitEntry;

    /// Delete every entry whose `reset_time` is before `now`. Returns how many
    /// were removed.
    fn sweep(&self, now: i64) -> usize;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store backed by `DashMap`.
///
/// `upsert` holds the shard lock for the key while the closure runs, so
/// check-and-increment is atomic even on the multi-threaded runtime.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|r| *r.value())
    }

    fn set(&self, key: &str, entry: RateLimitEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn upsert(
        &self,
        key: &str,
        update: &mut dyn FnMut(Option<RateLimitEntry>) -> RateLimitEntry,
    ) -> RateLimitEntry {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let next = update(Some(*occupied.get()));
                *occupied.get_mut() = next;
                next
            }
            Entry::Vacant(vacant) => {
                let next = update(None);
                vacant.insert(next);
                next
            }
        }
    }

    fn sweep(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.reset_time >= now);
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Fixed-window limiter: `max_requests` per `window_ms` per client key.
#[derive(Debug)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    max_requests: u32,
    window_ms: i64,
    sweep_probability: f64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            clock,
            max_requests: config.max_requests,
            window_ms: (config.window_secs as i64).saturating_mul(1000),
            sweep_probability: config.sweep_probability,
        }
    }

    /// Count one request for `client_key`. Returns false when the client has
    /// used up its window; a denied request does not touch the entry.
    pub fn check_and_consume(&self, client_key: &str) -> bool {
        let now = self.clock.now_millis();
        let mut allowed = false;

        self.store.upsert(client_key, &mut |current| match current {
            Some(entry) if now <= entry.reset_time => {
                if entry.count < self.max_requests {
                    allowed = true;
                    RateLimitEntry {
                        count: entry.count + 1,
                        ..entry
                    }
                } else {
                    entry
                }
            }
            _ => {
                allowed = true;
                RateLimitEntry {
                    count: 1,
                    reset_time: now + self.window_ms,
                }
            }
        });

        if !allowed {
            metrics::record_rate_limited();
        }
        allowed
    }

    /// Remove expired entries.
    pub fn sweep(&self) -> usize {
        let removed = self.store.sweep(self.clock.now_millis());
        metrics::record_rate_limit_entries(self.store.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.store.len(), "Swept expired rate limit entries");
        }
        removed
    }

    /// Run [`Self::sweep`] on a small fraction of calls.
    ///
    /// Bounds memory without a dedicated timer task.
    pub fn maybe_sweep(&self) -> Option<usize> {
        if fastrand::f64() < self.sweep_probability {
            Some(self.sweep())
        } else {
            None
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(clock: Arc<ManualClock>) -> RateLimiter {
        RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            clock,
            &RateLimitConfig::default(),
        )
    }

    #[test]
    fn test_hundred_and_first_request_denied() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let limiter = limiter(clock);

        for i in 1..=100 {
            assert!(limiter.check_and_consume("1.1.1.1"), "request {} should pass", i);
        }
        assert!(!limiter.check_and_consume("1.1.1.1"));
        assert!(limiter.check_and_consume("2.2.2.2"), "other clients are independent");
    }

    #[test]
    fn test_denied_request_does_not_mutate() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(InMemoryRateLimitStore::new());
        let limiter = RateLimiter::new(store.clone(), clock, &RateLimitConfig::default());

        for _ in 0..100 {
            limiter.check_and_consume("k");
        }
        let before = store.get("k").unwrap();
        assert!(!limiter.check_and_consume("k"));
        assert_eq!(store.get("k").unwrap(), before);
        assert_eq!(before.count, 100);
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter(clock.clone());

        for _ in 0..100 {
            limiter.check_and_consume("k");
        }
        assert!(!limiter.check_and_consume("k"));

        // Still inside the window at exactly reset_time.
        clock.set(60_000);
        assert!(!limiter.check_and_consume("k"));

        clock.set(60_001);
        assert!(limiter.check_and_consume("k"));
    }

    #[test]
    fn test_sweep_removes_only_expired_and_is_idempotent() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter(clock.clone());

        limiter.check_and_consume("old");
        clock.set(30_000);
        limiter.check_and_consume("new");

        clock.set(60_001);
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.sweep(), 0);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_sweep_probability_bounds() {
        let clock = Arc::new(ManualClock::new(0));
        let mut config = RateLimitConfig::default();

        config.sweep_probability = 0.0;
        let never = RateLimiter::new(Arc::new(InMemoryRateLimitStore::new()), clock.clone(), &config);
        assert!((0..1000).all(|_| never.maybe_sweep().is_none()));

        config.sweep_probability = 1.0;
        let always = RateLimiter::new(Arc::new(InMemoryRateLimitStore::new()), clock, &config);
        assert_eq!(always.maybe_sweep(), Some(0));
    }

    #[test]
    fn test_store_set_and_get() {
        let store = InMemoryRateLimitStore::new();
        assert!(store.is_empty());
        store.set("a", RateLimitEntry { count: 3, reset_time: 10 });
        assert_eq!(store.get("a"), Some(RateLimitEntry { count: 3, reset_time: 10 }));
        assert_eq!(store.sweep(11), 1);
        assert!(store.get("a").is_none());
    }
}
