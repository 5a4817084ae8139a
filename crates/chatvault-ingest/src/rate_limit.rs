// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token bucket rate limiter for remote source requests.
//!
//! Tokens refill continuously at the configured rate up to the burst
//! capacity. `acquire` resolves immediately while tokens remain and sleeps
//! out the deficit otherwise. Waiters are served strictly FIFO: the bucket
//! state lives behind a `tokio::sync::Mutex` (which queues waiters fairly)
//! and a waiter keeps holding the lock while it sleeps, so a later caller
//! can never steal the tokens it is waiting for.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter refilling `rate` tokens per second with `burst`
    /// capacity. The bucket starts full.
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            rate,
            capacity: burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take `cost` tokens, waiting as long as necessary. Never times out,
    /// never errors.
    pub async fn acquire(&self, cost: f64) {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket);
        if bucket.tokens < cost {
            let deficit = cost - bucket.tokens;
            let wait = Duration::from_secs_f64(deficit / self.rate);
            // Sleep with the lock held so queued callers stay behind us.
            tokio::time::sleep(wait).await;
            self.refill(&mut bucket);
        }
        bucket.tokens = (bucket.tokens - cost).max(0.0);
    }

    /// Take a single token.
    pub async fn acquire_one(&self) {
        self.acquire(1.0).await;
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
        bucket.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn burst_is_served_immediately() {
        let limiter = RateLimiter::new(1.0, 3.0);
        let start = Instant::now();
        limiter.acquire_one().await;
        limiter.acquire_one().await;
        limiter.acquire_one().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn drained_bucket_paces_at_configured_rate() {
        let limiter = RateLimiter::new(1.0, 1.0);
        limiter.acquire_one().await;

        let start = Instant::now();
        limiter.acquire_one().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cost_scales_the_wait() {
        let limiter = RateLimiter::new(2.0, 1.0);
        limiter.acquire(1.0).await;

        // 4 tokens at 2/sec = 2 seconds.
        let start = Instant::now();
        limiter.acquire(4.0).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_complete_in_fifo_order_at_rate_intervals() {
        let limiter = Arc::new(RateLimiter::new(1.0, 1.0));
        let start = Instant::now();

        let mut handles = Vec::new();
        for i in 0..4u64 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                // Stagger arrival so the queue order is deterministic.
                tokio::time::sleep(Duration::from_millis(i)).await;
                limiter.acquire_one().await;
                (i, start.elapsed())
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results.sort_by_key(|(i, _)| *i);

        // First caller gets the burst token; each later caller completes
        // roughly one second after the previous one, in arrival order.
        assert!(results[0].1 < Duration::from_millis(100));
        for window in results.windows(2) {
            let gap = window[1].1.saturating_sub(window[0].1);
            assert!(
                gap >= Duration::from_millis(900),
                "caller {} finished only {gap:?} after caller {}",
                window[1].0,
                window[0].0
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_refills_up_to_burst_only() {
        let limiter = RateLimiter::new(1.0, 2.0);
        limiter.acquire(2.0).await;

        // Far longer than needed to refill the 2-token capacity.
        tokio::time::sleep(Duration::from_secs(60)).await;

        let start = Instant::now();
        limiter.acquire(2.0).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // A third token is not banked beyond the capacity.
        let start = Instant::now();
        limiter.acquire_one().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
