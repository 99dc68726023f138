//! Token-bucket rate limiter for externally rate-limited APIs.
//!
//! Permits accumulate at the refill rate up to the bucket capacity; each
//! gated call spends one. Callers sleep when the bucket is empty rather
//! than fail — the limiter reduces 429 recurrence, it does not eliminate
//! it.

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

struct BucketState {
    /// May go negative: a caller that overdraws sleeps off its deficit.
    tokens: f64,
    last_refill: Instant,
}

/// Concurrency-safe token bucket.
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

impl TokenBucket {
    /// A bucket that starts full.
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity: capacity.max(1.0),
            refill_per_sec: refill_per_sec.max(f64::MIN_POSITIVE),
        }
    }

    /// Spend one permit, sleeping until it is available.
    pub async fn acquire(&self) {
        let wait = {
            let mut state = self.state.lock().await;
            let elapsed = state.last_refill.elapsed().as_secs_f64();
            state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            state.last_refill = Instant::now();

            state.tokens -= 1.0;
            if state.tokens >= 0.0 {
                Duration::ZERO
            } else {
                Duration::from_secs_f64(-state.tokens / self.refill_per_sec)
            }
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity_is_free() {
        let bucket = TokenBucket::new(3.0, 1.0);
        let start = Instant::now();
        bucket.acquire().await;
        bucket.acquire().await;
        bucket.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_bucket_sleeps() {
        let bucket = TokenBucket::new(1.0, 2.0);
        let start = Instant::now();
        bucket.acquire().await;
        // Bucket drained; next permit accrues at 2/sec → 500ms.
        bucket.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_restores_permits() {
        let bucket = TokenBucket::new(1.0, 1.0);
        bucket.acquire().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        // Fully refilled (capped at capacity): no wait.
        let start = Instant::now();
        bucket.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_caps_at_capacity() {
        let bucket = TokenBucket::new(2.0, 10.0);
        tokio::time::sleep(Duration::from_secs(60)).await;
        let start = Instant::now();
        bucket.acquire().await;
        bucket.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        // Third must wait ~100ms despite the long idle period.
        bucket.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
