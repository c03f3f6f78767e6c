//! Per-principal token-bucket rate limiter
//!
//! Each principal gets a bucket of capacity `burst`, refilled at `rps`
//! tokens per second using whole-second accounting: elapsed time since the
//! last refill is floored to integer seconds, and `last_refill` advances
//! only when at least one token was actually added, so repeated sub-second
//! calls cannot drift the refill point. Fractional accounting is not used
//! anywhere.
//!
//! Decisions are linearizable per principal: a single lock guards the
//! bucket table. A background sweeper evicts buckets idle for an hour.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// How often the sweeper wakes
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Idle age past which a bucket is evicted
pub const MAX_IDLE: Duration = Duration::from_secs(60 * 60);

struct Bucket {
    tokens: u64,
    last_refill: Instant,
    total_requests: u64,
    last_seen: Instant,
}

/// Point-in-time view of one principal's bucket
#[derive(Debug, Clone, Serialize)]
pub struct BucketStats {
    pub agent_id: String,
    pub available: u64,
    pub burst: u64,
    pub total_requests: u64,
    pub limited: bool,
}

/// Token-bucket limiter keyed by principal id
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, Bucket>>,
    rps: u64,
    burst: u64,
}

impl RateLimiter {
    pub fn new(rps: u32, burst: u32) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            rps: rps as u64,
            burst: burst as u64,
        }
    }

    /// Consume one token for `id`; returns false when the bucket is empty
    ///
    /// A consumed token is never refunded, even if the request is later
    /// abandoned.
    pub fn allow(&self, id: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.write().unwrap();

        let bucket = buckets.entry(id.to_string()).or_insert_with(|| Bucket {
            tokens: self.burst,
            last_refill: now,
            total_requests: 0,
            last_seen: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs();
        let refill = elapsed.saturating_mul(self.rps);
        if refill > 0 {
            bucket.tokens = (bucket.tokens + refill).min(self.burst);
            bucket.last_refill = now;
        }

        bucket.last_seen = now;

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            bucket.total_requests += 1;
            true
        } else {
            false
        }
    }

    /// Stats for one principal; an untouched principal reports a full bucket
    pub fn stats(&self, id: &str) -> BucketStats {
        let buckets = self.buckets.read().unwrap();
        match buckets.get(id) {
            Some(bucket) => BucketStats {
                agent_id: id.to_string(),
                available: bucket.tokens,
                burst: self.burst,
                total_requests: bucket.total_requests,
                limited: bucket.tokens == 0,
            },
            None => BucketStats {
                agent_id: id.to_string(),
                available: self.burst,
                burst: self.burst,
                total_requests: 0,
                limited: false,
            },
        }
    }

    /// Drop buckets whose last activity is older than `max_idle`;
    /// returns how many were removed
    pub fn sweep(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.write().unwrap();

        let before = buckets.len();
        buckets.retain(|id, bucket| {
            let idle = now.saturating_duration_since(bucket.last_seen);
            if idle > max_idle {
                debug!(agent_id = %id, idle_secs = idle.as_secs(), "Evicting idle bucket");
                false
            } else {
                true
            }
        });
        before - buckets.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.read().unwrap().len()
    }
}

/// Background task evicting idle buckets on a fixed cadence
pub async fn run_sweeper(limiter: Arc<RateLimiter>, interval: Duration, max_idle: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let removed = limiter.sweep(max_idle);
        if removed > 0 {
            debug!(removed, "Rate limiter sweep complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_honored() {
        let limiter = RateLimiter::new(100, 5);

        for _ in 0..5 {
            assert!(limiter.allow("a1"));
        }
        assert!(!limiter.allow("a1"));
        assert!(!limiter.allow("a1"));
    }

    #[test]
    fn test_buckets_are_per_principal() {
        let limiter = RateLimiter::new(100, 1);

        assert!(limiter.allow("a1"));
        assert!(!limiter.allow("a1"));
        assert!(limiter.allow("a2"));
    }

    #[test]
    fn test_sub_second_calls_do_not_refill() {
        let limiter = RateLimiter::new(100, 3);

        // Far faster than one second; integer-floor accounting adds nothing
        for _ in 0..3 {
            assert!(limiter.allow("a1"));
        }
        for _ in 0..50 {
            assert!(!limiter.allow("a1"));
        }
    }

    #[test]
    fn test_refill_after_one_second() {
        let limiter = RateLimiter::new(2, 3);

        for _ in 0..3 {
            assert!(limiter.allow("a1"));
        }
        assert!(!limiter.allow("a1"));

        std::thread::sleep(Duration::from_millis(1100));

        // ~1.1 s elapsed at rps=2: at least one second's worth of tokens
        // came back, and never more than burst
        let mut refilled = 0;
        for _ in 0..10 {
            if limiter.allow("a1") {
                refilled += 1;
            }
        }
        assert!((2..=3).contains(&refilled), "refilled {}", refilled);
    }

    #[test]
    fn test_refill_caps_at_burst() {
        let limiter = RateLimiter::new(1000, 2);

        assert!(limiter.allow("a1"));
        std::thread::sleep(Duration::from_millis(1100));

        // Massive refill still caps at burst
        assert!(limiter.allow("a1"));
        assert!(limiter.allow("a1"));
        assert!(!limiter.allow("a1"));
    }

    #[test]
    fn test_stats_track_consumption() {
        let limiter = RateLimiter::new(100, 2);

        let fresh = limiter.stats("a1");
        assert_eq!(fresh.available, 2);
        assert_eq!(fresh.total_requests, 0);
        assert!(!fresh.limited);

        limiter.allow("a1");
        limiter.allow("a1");
        limiter.allow("a1"); // denied

        let stats = limiter.stats("a1");
        assert_eq!(stats.available, 0);
        assert_eq!(stats.total_requests, 2);
        assert!(stats.limited);
    }

    #[test]
    fn test_sweep_evicts_only_idle() {
        let limiter = RateLimiter::new(100, 5);
        limiter.allow("a1");
        limiter.allow("a2");
        assert_eq!(limiter.bucket_count(), 2);

        // Nothing is older than an hour
        assert_eq!(limiter.sweep(MAX_IDLE), 0);
        assert_eq!(limiter.bucket_count(), 2);

        // Zero tolerance evicts everything
        assert_eq!(limiter.sweep(Duration::ZERO), 2);
        assert_eq!(limiter.bucket_count(), 0);
    }

    #[test]
    fn test_denied_requests_do_not_count() {
        let limiter = RateLimiter::new(100, 1);
        limiter.allow("a1");
        limiter.allow("a1");
        limiter.allow("a1");

        assert_eq!(limiter.stats("a1").total_requests, 1);
    }
}
