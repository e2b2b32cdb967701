use chrono::{DateTime, Utc};
use dashmap::DashMap;
use palisade_core::IdentityKey;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct LimitConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_max_attempts() -> usize {
    5
}
fn default_window_secs() -> u64 {
    300
}
fn default_prune_interval_secs() -> u64 {
    60
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

/// Sliding-window attempt counter keyed by (address, username).
///
/// Each key maps to the millisecond timestamps of its attempts within the
/// current window; entries age out lazily on access. The map's per-entry
/// locking makes recording atomic for one key while leaving unrelated
/// identities uncontended, so two simultaneous attempts on the same key
/// cannot both observe a stale count. State is in-memory only and resets
/// on restart.
pub struct SlidingWindowLimiter {
    attempts: DashMap<IdentityKey, Vec<i64>>,
    max_attempts: usize,
    window_ms: i64,
}

impl SlidingWindowLimiter {
    pub fn new(cfg: &LimitConfig) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts: cfg.max_attempts,
            window_ms: (cfg.window_secs as i64).saturating_mul(1000),
        }
    }

    /// Record one attempt and return the count within the window, the
    /// current attempt included. Prune and append happen under the entry
    /// lock, so the returned count is exact under concurrency.
    pub fn record_attempt(&self, key: &IdentityKey, now: DateTime<Utc>) -> usize {
        let now_ms = now.timestamp_millis();
        let cutoff = now_ms - self.window_ms;

        let mut entry = self.attempts.entry(key.clone()).or_default();
        entry.retain(|&ts| ts >= cutoff);
        entry.push(now_ms);
        entry.len()
    }

    /// The current attempt counts toward its own limit: exactly
    /// `max_attempts` attempts pass this layer, the next one trips it.
    pub fn exceeds_limit(&self, in_window_count: usize) -> bool {
        in_window_count > self.max_attempts
    }

    /// Count without recording, for the debug surface.
    pub fn peek(&self, key: &IdentityKey, now: DateTime<Utc>) -> usize {
        let cutoff = now.timestamp_millis() - self.window_ms;
        self.attempts
            .get(key)
            .map(|e| e.iter().filter(|&&ts| ts >= cutoff).count())
            .unwrap_or(0)
    }

    /// Drop keys whose every attempt has aged out, bounding memory under
    /// high-cardinality address/username churn. Runs off the request path.
    pub fn prune_stale(&self, now: DateTime<Utc>) {
        let cutoff = now.timestamp_millis() - self.window_ms;
        let before = self.attempts.len();
        self.attempts.retain(|_, timestamps| {
            timestamps.retain(|&ts| ts >= cutoff);
            !timestamps.is_empty()
        });
        let evicted = before.saturating_sub(self.attempts.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.attempts.len(), "pruned stale identity keys");
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }
}
