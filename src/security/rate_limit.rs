//! Sliding-window rate limiter keyed by client identifier.
//!
//! Each identifier owns the instants of its accepted requests within the
//! trailing window. Pruning is lazy: it happens on every access for that
//! identifier, and for all identifiers during [`RateLimiter::sweep_idle`].
//!
//! The map is a `DashMap`; an `entry` holds the shard write lock for the
//! whole prune-check-append step, so concurrent callers for the same
//! identifier serialize and can never both slip past the limit.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::policy::RateLimitPolicy;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    /// Quota left after this check.
    pub remaining: u32,
    /// Time until the oldest recorded request leaves the window.
    pub retry_after: Duration,
}

#[derive(Debug, Default)]
struct RateWindow {
    timestamps: VecDeque<Instant>,
}

impl RateWindow {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.timestamps.front() {
            if now.saturating_duration_since(*oldest) > window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn retry_after(&self, now: Instant, window: Duration) -> Duration {
        self.timestamps
            .front()
            .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
            .unwrap_or_default()
    }
}

pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            windows: DashMap::new(),
            limit: policy.limit_per_window.get(),
            window: policy.window,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `identifier` if it is within quota.
    pub fn allow(&self, identifier: &str) -> bool {
        self.check(identifier).allowed
    }

    pub fn check(&self, identifier: &str) -> RateDecision {
        self.check_at(identifier, Instant::now())
    }

    pub(crate) fn check_at(&self, identifier: &str, now: Instant) -> RateDecision {
        let mut entry = self.windows.entry(identifier.to_string()).or_default();
        let state = entry.value_mut();
        state.prune(now, self.window);

        let count = state.timestamps.len() as u32;
        if count >= self.limit {
            return RateDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                retry_after: state.retry_after(now, self.window),
            };
        }

        state.timestamps.push_back(now);
        RateDecision {
            allowed: true,
            limit: self.limit,
            remaining: self.limit - count - 1,
            retry_after: state.retry_after(now, self.window),
        }
    }

    /// Quota left for `identifier` without recording a request.
    pub fn remaining_quota(&self, identifier: &str) -> u32 {
        self.remaining_quota_at(identifier, Instant::now())
    }

    pub(crate) fn remaining_quota_at(&self, identifier: &str, now: Instant) -> u32 {
        match self.windows.get_mut(identifier) {
            Some(mut entry) => {
                let state = entry.value_mut();
                state.prune(now, self.window);
                self.limit.saturating_sub(state.timestamps.len() as u32)
            }
            None => self.limit,
        }
    }

    /// Prune every window and drop identifiers with no requests left in it.
    ///
    /// Returns the number of identifiers removed.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now())
    }

    pub(crate) fn sweep_idle_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let window = self.window;
        self.windows.retain(|_, state| {
            state.prune(now, window);
            !state.timestamps.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of identifiers currently holding state.
    pub fn tracked_identifiers(&self) -> usize {
        self.windows.len()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("tracked", &self.windows.len())
            .finish()
    }
}
