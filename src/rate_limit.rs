//! Hourly request quota persisted through a [`KeyValueStore`].
//!
//! The record lives under [`RATE_LIMIT_STORAGE_KEY`] as
//! `{"count": n, "resetTime": epoch_ms}` so it survives restarts. Each
//! `check()` is a single read-modify-write under the limiter's mutex.

use crate::storage::{KeyValueStore, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};

pub const MAX_MESSAGES_PER_HOUR: u32 = 10;
pub const RATE_LIMIT_STORAGE_KEY: &str = "parking-assistant-rate-limit";
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60 * 60);

const MS_PER_MINUTE: i64 = 60 * 1000;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub count: u32,
    #[serde(rename = "resetTime")]
    pub reset_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Denied { minutes_remaining: i64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Read-only view of the quota: how many requests are left and when the
/// window resets (0 when no window is active).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub count: u32,
    pub reset_time: i64,
}

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    quota: u32,
    window_ms: i64,
    guard: Mutex<()>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            quota: MAX_MESSAGES_PER_HOUR,
            window_ms: RATE_LIMIT_WINDOW.as_millis() as i64,
            guard: Mutex::new(()),
        }
    }

    pub fn with_quota(mut self, quota: u32, window: Duration) -> Self {
        self.quota = quota;
        self.window_ms = window.as_millis() as i64;
        self
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    fn load(&self) -> Option<RateLimitState> {
        let raw = self.store.get(RATE_LIMIT_STORAGE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(error = %err, "ignoring unreadable rate-limit record");
                None
            }
        }
    }

    fn fresh_window(&self, now: i64) -> RateLimitState {
        RateLimitState {
            count: 0,
            reset_time: now + self.window_ms,
        }
    }

    /// Count one request against the quota.
    ///
    /// Denials leave the persisted record untouched.
    pub fn check(&self) -> Result<RateDecision, StorageError> {
        let _guard = self.guard.lock().expect("rate limiter poisoned");
        let now = self.clock.now_ms();

        let mut state = match self.load() {
            Some(state) if now < state.reset_time => state,
            _ => self.fresh_window(now),
        };

        if state.count >= self.quota {
            let minutes_remaining = minutes_until(state.reset_time, now);
            debug!(minutes_remaining, "rate limit check denied");
            return Ok(RateDecision::Denied { minutes_remaining });
        }

        state.count += 1;
        let serialized = serde_json::to_string(&state).expect("rate-limit state serializes");
        self.store.set(RATE_LIMIT_STORAGE_KEY, &serialized)?;
        debug!(count = state.count, quota = self.quota, "rate limit check allowed");

        Ok(RateDecision::Allowed {
            remaining: self.quota - state.count,
        })
    }

    pub fn remaining(&self) -> Remaining {
        let full = Remaining {
            count: self.quota,
            reset_time: 0,
        };
        let Some(state) = self.load() else {
            return full;
        };
        if self.clock.now_ms() >= state.reset_time {
            return full;
        }
        Remaining {
            count: self.quota.saturating_sub(state.count),
            reset_time: state.reset_time,
        }
    }
}

/// Whole minutes from `now` until `reset_time`, rounded up.
pub fn minutes_until(reset_time: i64, now: i64) -> i64 {
    let remaining = (reset_time - now).max(0);
    (remaining + MS_PER_MINUTE - 1) / MS_PER_MINUTE
}
