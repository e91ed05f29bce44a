//! A per-source token-bucket rate limiter with violation tracking and a
//! disjoint ban list, as specified for both the onion handshake path and
//! the HTTP middleware chain.

mod bucket;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use bucket::TokenBucket;

/// Tunables for a [`RateLimiter`].
#[derive(Clone, Copy, Debug)]
pub struct RateLimiterConfig {
    /// Sustained admissions per second per source.
    pub rps: f64,
    /// Burst capacity per source.
    pub burst: f64,
    /// Consecutive denials before a source is banned.
    pub max_violations: u32,
    /// How long a ban lasts once triggered.
    pub ban_duration: Duration,
    /// How often [`RateLimiter::cleanup`] should be invoked.
    pub cleanup_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            rps: 10.0,
            burst: 20.0,
            max_violations: 5,
            ban_duration: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(600),
        }
    }
}

struct Limiter {
    bucket: TokenBucket,
    violations: u32,
    last_seen: Instant,
}

/// Aggregate counters returned by [`RateLimiter::stats`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RateLimiterStats {
    /// Number of sources with an active token bucket.
    pub active_limiters: usize,
    /// Number of currently banned sources.
    pub banned: usize,
}

struct Inner {
    limiters: HashMap<String, Limiter>,
    bans: HashMap<String, Instant>,
}

/// A shared, cloneable rate limiter keyed by an arbitrary source string
/// (an IP address, a peer id, whatever the caller wants to throttle).
///
/// A source is never present in both the active-limiter map and the ban
/// map at once: triggering a ban removes the limiter entry, and
/// [`RateLimiter::unban`] / [`RateLimiter::reset`] start the source fresh.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    inner: Arc<RwLock<Inner>>,
}

impl RateLimiter {
    /// Build a new rate limiter with the given configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(Inner {
                limiters: HashMap::new(),
                bans: HashMap::new(),
            })),
        }
    }

    /// Check whether `source` is currently banned. Authoritative: callers
    /// should treat this as the single source of truth for ban state.
    pub async fn is_banned(&self, source: &str) -> bool {
        let inner = self.inner.read().await;
        match inner.bans.get(source) {
            Some(until) => Instant::now() < *until,
            None => false,
        }
    }

    /// Attempt to admit one request from `source`.
    ///
    /// Checks the ban map first; a banned source is always denied without
    /// touching its (nonexistent) token bucket. On admission, violations
    /// reset to zero. On denial, violations increment; reaching
    /// `max_violations` moves the source to the ban map and discards its
    /// limiter.
    pub async fn allow(&self, source: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        if let Some(until) = inner.bans.get(source) {
            if now < *until {
                return false;
            }
            // Ban has expired; fall through to a fresh limiter.
            inner.bans.remove(source);
        }

        let limiter = inner.limiters.entry(source.to_string()).or_insert_with(|| Limiter {
            bucket: TokenBucket::new(self.config.rps, self.config.burst, now),
            violations: 0,
            last_seen: now,
        });
        limiter.last_seen = now;

        if limiter.bucket.try_consume(now) {
            limiter.violations = 0;
            return true;
        }

        limiter.violations += 1;
        if limiter.violations >= self.config.max_violations {
            inner.limiters.remove(source);
            inner.bans.insert(source.to_string(), now + self.config.ban_duration);
            info!(source, "source exceeded rate limit violation threshold, banning");
        }
        false
    }

    /// Explicitly ban `source` for `duration`, discarding any existing limiter.
    pub async fn ban(&self, source: &str, duration: Duration) {
        let mut inner = self.inner.write().await;
        inner.limiters.remove(source);
        inner.bans.insert(source.to_string(), Instant::now() + duration);
    }

    /// Lift a ban on `source`, making it immediately eligible for admission.
    pub async fn unban(&self, source: &str) {
        let mut inner = self.inner.write().await;
        inner.bans.remove(source);
    }

    /// Clear all rate-limit and ban state for `source`.
    pub async fn reset(&self, source: &str) {
        let mut inner = self.inner.write().await;
        inner.limiters.remove(source);
        inner.bans.remove(source);
    }

    /// Return the current violation count for `source`, or zero if unknown.
    pub async fn get_violations(&self, source: &str) -> u32 {
        let inner = self.inner.read().await;
        inner.limiters.get(source).map(|l| l.violations).unwrap_or(0)
    }

    /// Return the instant a ban on `source` expires, if it is currently banned.
    pub async fn banned_until(&self, source: &str) -> Option<Instant> {
        let inner = self.inner.read().await;
        inner.bans.get(source).copied()
    }

    /// Return aggregate counters.
    pub async fn stats(&self) -> RateLimiterStats {
        let inner = self.inner.read().await;
        RateLimiterStats {
            active_limiters: inner.limiters.len(),
            banned: inner.bans.len(),
        }
    }

    /// Remove limiters idle for `2 * cleanup_interval` and bans whose
    /// expiry has passed. Intended to be driven by a periodic task; see
    /// [`RateLimiter::run_cleanup_loop`].
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let idle_threshold = self.config.cleanup_interval * 2;
        let mut inner = self.inner.write().await;

        let before_limiters = inner.limiters.len();
        inner.limiters.retain(|_, l| l.bucket.idle_for(now) < idle_threshold);

        let before_bans = inner.bans.len();
        inner.bans.retain(|_, until| now < *until);

        let removed_limiters = before_limiters - inner.limiters.len();
        let removed_bans = before_bans - inner.bans.len();
        if removed_limiters > 0 || removed_bans > 0 {
            debug!(removed_limiters, removed_bans, "rate limiter cleanup swept stale entries");
        }
    }

    /// Run [`RateLimiter::cleanup`] on `config.cleanup_interval`, until
    /// `shutdown` resolves.
    pub async fn run_cleanup_loop(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.cleanup_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.cleanup().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimiterConfig {
        RateLimiterConfig {
            rps: 1.0,
            burst: 1.0,
            max_violations: 3,
            ban_duration: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(600),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn escalates_to_a_ban_after_max_violations() {
        let limiter = RateLimiter::new(test_config());

        assert!(limiter.allow("1.2.3.4").await, "first admission should succeed");
        for i in 0..4 {
            let allowed = limiter.allow("1.2.3.4").await;
            assert!(!allowed, "admission {i} should be denied");
        }

        assert!(limiter.is_banned("1.2.3.4").await);
        let until = limiter.banned_until("1.2.3.4").await.unwrap();
        let remaining = until.saturating_duration_since(Instant::now());
        assert!(remaining <= Duration::from_secs(3600));
        assert!(remaining > Duration::from_secs(3500));

        // Denied continuously while banned, even though the bucket would refill.
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!limiter.allow("1.2.3.4").await);
    }

    #[tokio::test(start_paused = true)]
    async fn unban_makes_a_source_immediately_eligible() {
        let limiter = RateLimiter::new(test_config());
        limiter.ban("5.5.5.5", Duration::from_secs(3600)).await;
        assert!(limiter.is_banned("5.5.5.5").await);

        limiter.unban("5.5.5.5").await;
        assert!(!limiter.is_banned("5.5.5.5").await);
        assert!(limiter.allow("5.5.5.5").await);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_admission_resets_violations() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            rps: 1.0,
            burst: 1.0,
            max_violations: 3,
            ban_duration: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(600),
        });

        assert!(limiter.allow("a").await);
        assert!(!limiter.allow("a").await);
        assert_eq!(limiter.get_violations("a").await, 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.allow("a").await);
        assert_eq!(limiter.get_violations("a").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_removes_idle_limiters_and_expired_bans() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            rps: 1.0,
            burst: 1.0,
            max_violations: 100,
            ban_duration: Duration::from_secs(1),
            cleanup_interval: Duration::from_secs(10),
        });

        limiter.allow("idle-source").await;
        limiter.ban("short-ban", Duration::from_secs(1)).await;

        tokio::time::advance(Duration::from_secs(25)).await;
        limiter.cleanup().await;

        let stats = limiter.stats().await;
        assert_eq!(stats.active_limiters, 0);
        assert_eq!(stats.banned, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn a_source_is_never_both_limited_and_banned() {
        let limiter = RateLimiter::new(test_config());
        for _ in 0..5 {
            limiter.allow("flapping").await;
        }
        let inner = limiter.inner.read().await;
        let in_limiters = inner.limiters.contains_key("flapping");
        let in_bans = inner.bans.contains_key("flapping");
        assert!(!(in_limiters && in_bans));
    }
}
