//! Per-caller fixed-window rate limiting.
//!
//! Every payment-related entry point is assigned a [`RateLimitBucket`]. Each (bucket, caller) pair gets its own counter
//! that resets when its window elapses, so exhausting one bucket never affects another.
//!
//! State is process-local. Stale windows are purged opportunistically once the table grows past
//! [`PURGE_THRESHOLD`] entries, at most once every [`PURGE_INTERVAL`].
use std::{
    collections::HashMap,
    fmt::Display,
    str::FromStr,
    time::{Duration, Instant},
};

use log::*;
use thiserror::Error;
use tokio::sync::Mutex;

/// Number of tracked windows above which expired entries are swept on the next check.
pub const PURGE_THRESHOLD: usize = 10_000;
/// Minimum time between two sweeps of the window table.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitBucket {
    Callback,
    Verify,
    Notification,
}

impl Display for RateLimitBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callback => write!(f, "callback"),
            Self::Verify => write!(f, "verify"),
            Self::Notification => write!(f, "notification"),
        }
    }
}

//--------------------------------------     RateLimitPolicy     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Error)]
#[error("Invalid rate limit policy '{0}'. Expected <requests>/<seconds>")]
pub struct RateLimitPolicyError(String);

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

impl Display for RateLimitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.max_requests, self.window.as_secs())
    }
}

impl FromStr for RateLimitPolicy {
    type Err = RateLimitPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || RateLimitPolicyError(s.to_string());
        let (requests, seconds) = s.trim().split_once('/').ok_or_else(err)?;
        let max_requests = requests.trim().parse::<u32>().map_err(|_| err())?;
        let seconds = seconds.trim().parse::<u64>().map_err(|_| err())?;
        if seconds == 0 {
            return Err(err());
        }
        Ok(Self::new(max_requests, Duration::from_secs(seconds)))
    }
}

//--------------------------------------     RateLimitConfig     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub callback: RateLimitPolicy,
    pub verify: RateLimitPolicy,
    pub notification: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            callback: RateLimitPolicy::per_minute(60),
            verify: RateLimitPolicy::per_minute(20),
            notification: RateLimitPolicy::per_minute(10),
        }
    }
}

impl RateLimitConfig {
    pub fn policy(&self, bucket: RateLimitBucket) -> RateLimitPolicy {
        match bucket {
            RateLimitBucket::Callback => self.callback,
            RateLimitBucket::Verify => self.verify,
            RateLimitBucket::Notification => self.notification,
        }
    }
}

//--------------------------------------     RateLimitDecision     -----------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Seconds until the current window resets. Never less than 1.
    pub retry_after_secs: u64,
}

//--------------------------------------     RateLimiter     -----------------------------------------------------------
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

#[derive(Debug)]
struct WindowTable {
    entries: HashMap<(RateLimitBucket, String), Window>,
    last_purge: Instant,
    purges: u64,
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<WindowTable>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let table = WindowTable { entries: HashMap::new(), last_purge: Instant::now(), purges: 0 };
        Self { config, windows: Mutex::new(table) }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Records a request from `identity` against `bucket` and decides whether it may proceed.
    pub async fn check(&self, bucket: RateLimitBucket, identity: &str) -> RateLimitDecision {
        self.check_at(bucket, identity, Instant::now()).await
    }

    pub async fn check_at(&self, bucket: RateLimitBucket, identity: &str, now: Instant) -> RateLimitDecision {
        let policy = self.config.policy(bucket);
        let mut table = self.windows.lock().await;
        if table.entries.len() >= PURGE_THRESHOLD && now.saturating_duration_since(table.last_purge) >= PURGE_INTERVAL {
            self.purge_expired(&mut table, now);
        }
        let window = table.entries.entry((bucket, identity.to_string())).or_insert(Window { count: 0, started: now });
        if now.saturating_duration_since(window.started) >= policy.window {
            window.count = 0;
            window.started = now;
        }
        let elapsed = now.saturating_duration_since(window.started);
        let retry_after_secs = policy.window.saturating_sub(elapsed).as_secs().max(1);
        if window.count >= policy.max_requests {
            debug!("🚦️ {bucket} limit of {policy} reached for {identity}. Retry in {retry_after_secs}s");
            return RateLimitDecision { allowed: false, remaining: 0, retry_after_secs };
        }
        window.count += 1;
        let remaining = policy.max_requests.saturating_sub(window.count);
        trace!("🚦️ {bucket} request from {identity} allowed. {remaining} remaining");
        RateLimitDecision { allowed: true, remaining, retry_after_secs }
    }

    fn purge_expired(&self, table: &mut WindowTable, now: Instant) {
        let before = table.entries.len();
        let config = &self.config;
        table.entries.retain(|(bucket, _), w| now.saturating_duration_since(w.started) < config.policy(*bucket).window);
        table.last_purge = now;
        table.purges += 1;
        debug!("🚦️ Purged {} stale rate limit windows", before - table.entries.len());
    }

    #[cfg(test)]
    async fn tracked_windows(&self) -> usize {
        self.windows.lock().await.entries.len()
    }

    #[cfg(test)]
    async fn purges(&self) -> u64 {
        self.windows.lock().await.purges
    }
}
