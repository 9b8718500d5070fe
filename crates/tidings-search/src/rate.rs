// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-bucket rate limiter for outbound provider calls.
//!
//! The bucket is configured from the provider's stated per-minute ceiling.
//! `acquire` suspends until a token is available, so callers never busy-wait
//! and never exceed the ceiling.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// An async token bucket.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// A bucket allowing `per_minute` acquisitions per minute, with burst
    /// capacity equal to the per-minute ceiling.
    pub fn per_minute(per_minute: u32) -> Self {
        let capacity = f64::from(per_minute.max(1));
        Self {
            capacity,
            refill_per_sec: capacity / 60.0,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Takes one token, suspending until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                // Seconds until the next whole token accrues.
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available (for tests and diagnostics).
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
        state.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_up_to_capacity_is_immediate() {
        let bucket = TokenBucket::per_minute(10);
        for _ in 0..10 {
            // Must not suspend noticeably.
            tokio::time::timeout(Duration::from_millis(50), bucket.acquire())
                .await
                .expect("burst acquire should not block");
        }
        assert!(bucket.available().await < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_bucket_waits_for_refill() {
        let bucket = TokenBucket::per_minute(60); // 1 token per second
        for _ in 0..60 {
            bucket.acquire().await;
        }
        let before = Instant::now();
        bucket.acquire().await;
        // With the paused clock, the sleep auto-advances; the wait must be
        // roughly one refill interval.
        assert!(before.elapsed() >= Duration::from_millis(900));
    }
}
