//! Per-source rate limiting for the anonymous confirmation endpoint.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::FleetError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per source within one window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Sweep expired entries every N checks.
    pub cleanup_interval: u64,
    /// Cap on distinct tracked sources.
    pub max_tracked_ips: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            cleanup_interval: 100,
            max_tracked_ips: 10_000,
        }
    }
}

/// Sliding-window limiter keyed by source address.
///
/// Tracks request instants per IP and rejects once a source exceeds
/// `max_requests` within the window. State is in-process only; restarts
/// reset all counters.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: RwLock<HashMap<IpAddr, Vec<Instant>>>,
    request_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
            request_count: AtomicU64::new(0),
        }
    }

    /// Record one request from `ip` and decide whether it may proceed.
    pub fn check(&self, ip: IpAddr) -> Result<(), FleetError> {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);

        // fetch_add returns the previous count; skip the sweep at zero.
        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.config.cleanup_interval == 0 {
            self.cleanup(now, window);
        }

        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // Refuse new sources once the table is full; known sources keep
        // their window.
        if !state.contains_key(&ip) && state.len() >= self.config.max_tracked_ips {
            warn!(source = %ip, tracked = state.len(), "Rate limiter table full");
            return Err(FleetError::RateLimited);
        }

        let hits = state.entry(ip).or_default();
        hits.retain(|t| now.duration_since(*t) < window);

        if hits.len() >= self.config.max_requests as usize {
            warn!(source = %ip, hits = hits.len(), "Rate limit exceeded");
            return Err(FleetError::RateLimited);
        }

        hits.push(now);
        Ok(())
    }

    fn cleanup(&self, now: Instant, window: Duration) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = state.len();
        state.retain(|_, hits| {
            hits.retain(|t| now.duration_since(*t) < window);
            !hits.is_empty()
        });
        if state.len() < before {
            debug!(dropped = before - state.len(), "Rate limiter cleanup");
        }
    }
}
