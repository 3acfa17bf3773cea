//! Fixed-window admission control per logical service.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use dashmap::DashMap;
use serde::Serialize;

/// Quota of one service: `capacity` permits per `refill_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub capacity: u32,
    pub refill_period: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            capacity: 100,
            refill_period: Duration::from_secs(1),
        }
    }
}

/// Current window of one service.
#[derive(Debug)]
struct FixedWindow {
    policy: RateLimitPolicy,
    available_permits: u32,
    window_start: Instant,
}

impl FixedWindow {
    /// The first window starts full.
    fn new(policy: RateLimitPolicy, now: Instant) -> Self {
        Self {
            policy,
            available_permits: policy.capacity,
            window_start: now,
        }
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= self.policy.refill_period {
            self.available_permits = self.policy.capacity;
            self.window_start = now;
        }

        if self.available_permits > 0 {
            self.available_permits -= 1;
            true
        } else {
            false
        }
    }
}

/// Point-in-time view of a service's window.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitSnapshot {
    pub capacity: u32,
    pub refill_period_ms: u64,
    pub available_permits: u32,
    pub window_age_ms: u64,
}

/// Rate limiter holding one fixed window per logical service.
///
/// Windows are created on first touch with the service's policy and live
/// for the process lifetime.
#[derive(Debug)]
pub struct RateLimiter {
    default_policy: RateLimitPolicy,
    policies: HashMap<String, RateLimitPolicy>,
    windows: DashMap<String, FixedWindow>,
}

impl RateLimiter {
    pub fn new(default_policy: RateLimitPolicy) -> Self {
        Self {
            default_policy,
            policies: HashMap::new(),
            windows: DashMap::new(),
        }
    }

    /// Override the policy of one service.
    pub fn with_policy(mut self, service: impl Into<String>, policy: RateLimitPolicy) -> Self {
        self.policies.insert(service.into(), policy);
        self
    }

    pub fn policy_for(&self, service: &str) -> RateLimitPolicy {
        self.policies.get(service).copied().unwrap_or(self.default_policy)
    }

    /// Try to take one permit for `service`.
    ///
    /// `false` means the request must be rejected as rate limited.
    pub fn try_acquire(&self, service: &str) -> bool {
        self.try_acquire_at(service, Instant::now())
    }

    pub fn try_acquire_at(&self, service: &str, now: Instant) -> bool {
        // The shard write guard serializes updates to this service's window.
        let admitted = match self.windows.get_mut(service) {
            Some(mut window) => window.try_acquire(now),
            None => self
                .windows
                .entry(service.to_string())
                .or_insert_with(|| FixedWindow::new(self.policy_for(service), now))
                .try_acquire(now),
        };

        if !admitted {
            tracing::debug!(service = %service, "Rate limit exceeded");
        }
        admitted
    }

    pub fn snapshot(&self, service: &str) -> Option<RateLimitSnapshot> {
        self.windows.get(service).map(|window| RateLimitSnapshot {
            capacity: window.policy.capacity,
            refill_period_ms: window.policy.refill_period.as_millis() as u64,
            available_permits: window.available_permits,
            window_age_ms: window.window_start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(capacity: u32, period_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitPolicy {
            capacity,
            refill_period: Duration::from_millis(period_ms),
        })
    }

    #[test]
    fn test_capacity_within_window() {
        let rl = limiter(2, 1000);
        let t0 = Instant::now();

        assert!(rl.try_acquire_at("search", t0));
        assert!(rl.try_acquire_at("search", t0 + Duration::from_millis(300)));
        assert!(!rl.try_acquire_at("search", t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_window_resets_after_period() {
        let rl = limiter(1, 1000);
        let t0 = Instant::now();

        assert!(rl.try_acquire_at("search", t0));
        assert!(!rl.try_acquire_at("search", t0 + Duration::from_millis(999)));
        assert!(rl.try_acquire_at("search", t0 + Duration::from_millis(1000)));
        assert!(!rl.try_acquire_at("search", t0 + Duration::from_millis(1500)));
        assert!(rl.try_acquire_at("search", t0 + Duration::from_millis(2100)));
    }

    #[test]
    fn test_never_exceeds_capacity_per_window() {
        let rl = limiter(5, 100);
        let t0 = Instant::now();
        let mut admitted_per_window = [0u32; 4];

        // Windows restart on the first call past the boundary, which lands
        // exactly on a multiple of 100ms here.
        for step in 0..400u64 {
            if rl.try_acquire_at("search", t0 + Duration::from_millis(step)) {
                admitted_per_window[(step / 100) as usize] += 1;
            }
        }
        assert_eq!(admitted_per_window, [5, 5, 5, 5]);
    }

    #[test]
    fn test_services_are_independent() {
        let rl = limiter(1, 1000).with_policy(
            "docs",
            RateLimitPolicy { capacity: 3, refill_period: Duration::from_secs(1) },
        );
        let t0 = Instant::now();

        assert!(rl.try_acquire_at("search", t0));
        assert!(!rl.try_acquire_at("search", t0));

        for _ in 0..3 {
            assert!(rl.try_acquire_at("docs", t0));
        }
        assert!(!rl.try_acquire_at("docs", t0));
        assert_eq!(rl.snapshot("docs").unwrap().capacity, 3);
    }

    #[test]
    fn test_first_request_is_admitted() {
        let rl = limiter(1, 60_000);
        assert!(rl.snapshot("fresh").is_none());
        assert!(rl.try_acquire("fresh"));
        assert_eq!(rl.snapshot("fresh").unwrap().available_permits, 0);
    }
}
