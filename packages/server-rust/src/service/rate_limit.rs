//! Host-wide admission control.
//!
//! A token bucket refilled on the tokio clock. The check never waits: a call
//! either takes its tokens immediately or is rejected.

use parking_lot::Mutex;
use tokio::time::Instant;

/// Non-blocking rate limiter contract.
pub trait RateLimiter: Send + Sync {
    /// Takes `n` tokens if available. Returns `false` without side effects
    /// otherwise.
    fn try_consume(&self, n: u32) -> bool;
}

/// Token bucket with fractional refill.
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket holding `capacity` tokens, refilled at
    /// `refill_per_sec` tokens per second.
    #[must_use]
    pub fn new(capacity: u32, refill_per_sec: u32) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
            capacity: f64::from(capacity),
            refill_per_sec: f64::from(refill_per_sec),
        }
    }

    /// Bucket sized to one second of traffic at `rps`, with `burst` extra.
    #[must_use]
    pub fn per_second(rps: u32, burst: u32) -> Self {
        Self::new(rps.saturating_add(burst), rps)
    }

    /// Tokens currently available, after refill.
    #[must_use]
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
    }
}

impl RateLimiter for TokenBucket {
    fn try_consume(&self, n: u32) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        let wanted = f64::from(n);
        if state.tokens >= wanted {
            state.tokens -= wanted;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn zero_refill_bucket_admits_exactly_capacity() {
        let bucket = TokenBucket::new(1, 0);
        assert!(bucket.try_consume(1));
        assert!(!bucket.try_consume(1));
    }

    #[tokio::test]
    async fn rejected_call_takes_nothing() {
        let bucket = TokenBucket::new(3, 0);
        assert!(!bucket.try_consume(4));
        assert!(bucket.try_consume(3));
    }

    #[tokio::test(start_paused = true)]
    async fn refills_over_time_up_to_capacity() {
        let bucket = TokenBucket::new(2, 10);
        assert!(bucket.try_consume(2));
        assert!(!bucket.try_consume(1));

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(bucket.try_consume(1));
        assert!(!bucket.try_consume(1));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!((bucket.available() - 2.0).abs() < f64::EPSILON);
    }

    proptest::proptest! {
        #[test]
        fn zero_refill_never_admits_more_than_capacity(
            capacity in 0u32..64,
            asks in proptest::collection::vec(1u32..8, 0..64),
        ) {
            let bucket = TokenBucket::new(capacity, 0);
            let admitted: u32 = asks.iter().copied().filter(|n| bucket.try_consume(*n)).sum();
            proptest::prop_assert!(admitted <= capacity);
        }
    }

    #[tokio::test]
    async fn per_second_adds_burst() {
        let bucket = TokenBucket::per_second(5, 2);
        assert!(bucket.try_consume(7));
        assert!(!bucket.try_consume(1));
    }
}
