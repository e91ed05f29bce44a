//! The token bucket used to pace admissions from a single source.

use tokio::time::{Duration, Instant};

/// A token bucket refilling continuously at `rate` tokens/second up to `burst`.
#[derive(Debug, Clone)]
pub(crate) struct TokenBucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub(crate) fn new(rate: f64, burst: f64, now: Instant) -> Self {
        Self {
            rate,
            burst,
            tokens: burst,
            last_refill: now,
        }
    }

    /// Refill based on elapsed time, then try to take one token.
    ///
    /// Returns `true` if a token was available and consumed.
    pub(crate) fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.last_refill = now;
        let added = elapsed.as_secs_f64() * self.rate;
        self.tokens = (self.tokens + added).min(self.burst);
    }

    /// Time since this bucket was last touched, for idle cleanup.
    pub(crate) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_refill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn consumes_burst_then_blocks_until_refill() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(1.0, 1.0, now);

        assert!(bucket.try_consume(Instant::now()));
        assert!(!bucket.try_consume(Instant::now()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(bucket.try_consume(Instant::now()));
    }
}
