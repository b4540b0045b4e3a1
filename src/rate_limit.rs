//! Sliding-window limiter guarding the login endpoint.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::models::config::RateLimitConfig;

/// Rejection carrying the number of seconds until a slot frees up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub retry_after: u64,
}

/// Tracked keys above which a check first sweeps out idle clients.
const SWEEP_THRESHOLD: usize = 1024;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    sweep_threshold: usize,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

fn sweep(requests: &mut HashMap<String, Vec<Instant>>, now: Instant, window: Duration) {
    requests.retain(|_, timestamps| {
        timestamps.retain(|at| now.duration_since(*at) < window);
        !timestamps.is_empty()
    });
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            sweep_threshold: SWEEP_THRESHOLD,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_seconds),
        )
    }

    /// Records a request for `key` unless its window is already full.
    pub fn check(&self, key: &str) -> Result<(), RateLimited> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimited> {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.window;
        if requests.len() >= self.sweep_threshold {
            sweep(&mut requests, now, window);
        }
        let timestamps = requests.entry(key.to_string()).or_default();
        timestamps.retain(|at| now.duration_since(*at) < window);

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let remaining = window.saturating_sub(now.duration_since(oldest));
            let retry_after = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(RateLimited {
                retry_after: retry_after.max(1),
            });
        }

        timestamps.push(now);
        Ok(())
    }

    /// Drops keys without recent requests.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&self, now: Instant) {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        sweep(&mut requests, now, self.window);
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
