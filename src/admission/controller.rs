//! Core admission controller implementation.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::clock::{Clock, SystemClock};
use super::record::UsageRecord;
use crate::error::{Result, TurnstileError};

/// Longest window a controller accepts (ten years).
pub const MAX_WINDOW_SECS: u64 = 10 * 365 * 86_400;

/// How expired records are reclaimed from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Scan the whole store for expired records on every check.
    #[default]
    EveryCheck,
    /// Only the accessed key is examined on check. Other expired records are
    /// dropped by `stats`, `purge_expired`, or a background sweeper.
    Lazy,
}

/// Validated limit/window configuration for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    limit: u64,
    window_secs: u64,
    cleanup: CleanupPolicy,
}

impl EngineConfig {
    /// Validate and build a configuration.
    ///
    /// Fails if `limit` or `window_secs` is zero, or if the window is longer
    /// than [`MAX_WINDOW_SECS`].
    pub fn new(limit: u64, window_secs: u64) -> Result<Self> {
        if limit == 0 {
            return Err(TurnstileError::Config(
                "limit must be greater than zero".to_string(),
            ));
        }
        if window_secs == 0 {
            return Err(TurnstileError::Config(
                "window_secs must be greater than zero".to_string(),
            ));
        }
        if window_secs > MAX_WINDOW_SECS {
            return Err(TurnstileError::Config(format!(
                "window_secs must be at most {}, got {}",
                MAX_WINDOW_SECS, window_secs
            )));
        }

        Ok(Self {
            limit,
            window_secs,
            cleanup: CleanupPolicy::default(),
        })
    }

    /// Use a different cleanup policy.
    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    pub fn cleanup(&self) -> CleanupPolicy {
        self.cleanup
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }
}

/// Outcome of a single admission check.
///
/// `remaining` and `reset_in` are populated the same way whether or not the
/// request was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the request may proceed
    pub admitted: bool,
    /// Configured maximum requests per window
    pub limit: u64,
    /// Requests left in the current window, never negative
    pub remaining: u64,
    /// Whole seconds until the window resets, rounded up
    pub reset_in: u64,
}

/// Snapshot of the controller for admin surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Keys with an unexpired window
    pub active_keys: usize,
    pub limit: u64,
    pub window_secs: u64,
}

/// Fixed-window admission controller.
///
/// Each controller owns its store; two controllers never share usage. The
/// controller is safe to share across tasks behind an `Arc`.
pub struct AdmissionController<C: Clock = SystemClock> {
    config: EngineConfig,
    /// Usage records indexed by client key
    records: DashMap<String, UsageRecord>,
    clock: C,
}

impl AdmissionController<SystemClock> {
    /// Create a controller driven by the wall clock.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> AdmissionController<C> {
    /// Create a controller driven by the given clock.
    pub fn with_clock(config: EngineConfig, clock: C) -> Self {
        info!(
            limit = config.limit,
            window_secs = config.window_secs,
            cleanup = ?config.cleanup,
            "Admission controller created"
        );

        Self {
            config,
            records: DashMap::new(),
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Count a request for `key` at the clock's current time.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, self.clock.now())
    }

    /// Count a request for `key` observed at `now`.
    pub fn check_at(&self, key: &str, now: DateTime<Utc>) -> Decision {
        let limit = self.config.limit;
        let window = self.config.window();

        // The entry guard holds the shard lock for the whole
        // read-roll-increment sequence; it must be released before purging.
        let decision = {
            let mut opened = false;
            let mut entry = self.records.entry(key.to_owned()).or_insert_with(|| {
                opened = true;
                UsageRecord::open(now, window)
            });
            let record = entry.value_mut();
            opened |= record.roll_if_expired(now, window);

            if opened {
                debug!(
                    key = %key,
                    window_end = %record.window_end(),
                    "Opened admission window"
                );
            }

            let count = record.hit();
            Decision {
                admitted: count <= limit,
                limit,
                remaining: record.remaining(limit),
                reset_in: record.reset_in(now),
            }
        };

        trace!(
            key = %key,
            admitted = decision.admitted,
            remaining = decision.remaining,
            reset_in = decision.reset_in,
            "Checked admission"
        );

        if !decision.admitted {
            debug!(key = %key, limit = limit, "Admission limit exceeded");
        }

        if self.config.cleanup == CleanupPolicy::EveryCheck {
            self.purge_expired(now);
        }

        decision
    }

    /// Requests counted for `key` in its current window.
    ///
    /// Missing and expired records both read as zero.
    pub fn usage(&self, key: &str) -> u64 {
        let now = self.clock.now();
        self.records
            .get(key)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.count())
            .unwrap_or(0)
    }

    /// Drop every record whose window closed at or before `now`.
    ///
    /// Returns the number of records removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        self.records.retain(|_, record| {
            let expired = record.is_expired(now);
            purged += usize::from(expired);
            !expired
        });

        if purged > 0 {
            trace!(purged = purged, "Purged expired admission records");
        }
        purged
    }

    /// Purge against the controller's own clock.
    pub fn purge_now(&self) -> usize {
        self.purge_expired(self.clock.now())
    }

    /// Records physically held, expired ones included.
    pub fn stored_keys(&self) -> usize {
        self.records.len()
    }

    /// Active key count after purging expired records.
    pub fn stats(&self) -> Stats {
        self.purge_now();
        Stats {
            active_keys: self.records.len(),
            limit: self.config.limit,
            window_secs: self.config.window_secs,
        }
    }

    /// Forget `key`. Unknown keys are ignored.
    pub fn reset_key(&self, key: &str) {
        if self.records.remove(key).is_some() {
            info!(key = %key, "Reset admission key");
        }
    }

    /// Forget every key.
    pub fn reset_all(&self) {
        let dropped = self.records.len();
        self.records.clear();
        info!(dropped = dropped, "Reset all admission keys");
    }
}
