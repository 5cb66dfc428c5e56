//! Per-key usage record for a fixed window.

use chrono::{DateTime, Duration, Utc};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Usage of one client key within its current window.
///
/// A record whose `window_end` is at or before the observation time is
/// expired and behaves exactly like a missing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageRecord {
    /// Requests counted in the current window, rejected ones included
    count: u64,
    /// Instant at which the current window closes
    window_end: DateTime<Utc>,
}

impl UsageRecord {
    /// Open an empty window starting at `now`.
    pub fn open(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 0,
            window_end: now
                .checked_add_signed(window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Whether this record's window has closed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.window_end <= now
    }

    /// Replace the record with a fresh window if the current one has closed.
    ///
    /// Returns `true` when a new window was opened.
    pub fn roll_if_expired(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        if self.is_expired(now) {
            *self = Self::open(now, window);
            true
        } else {
            false
        }
    }

    /// Count one attempt and return the new count.
    pub fn hit(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Current count.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// End of the current window.
    pub fn window_end(&self) -> DateTime<Utc> {
        self.window_end
    }

    /// Quota left under `limit`, clamped at zero.
    pub fn remaining(&self, limit: u64) -> u64 {
        limit.saturating_sub(self.count)
    }

    /// Whole seconds until the window closes, rounded up.
    pub fn reset_in(&self, now: DateTime<Utc>) -> u64 {
        let nanos = (self.window_end - now)
            .num_nanoseconds()
            .unwrap_or(i64::MAX);
        if nanos <= 0 {
            return 0;
        }
        (nanos / NANOS_PER_SEC + i64::from(nanos % NANOS_PER_SEC != 0)) as u64
    }
}
