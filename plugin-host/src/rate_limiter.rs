use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::{Quota, RateLimiter as Governor};
use tokio::time::Instant;

/// Per-plugin rate limiter: two independent token buckets, one gating
/// request count, one gating response bandwidth. A limit of `0` disables
/// the corresponding bucket (always allows).
pub struct RateLimiter {
    requests: Option<Governor<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>>,
    bandwidth: Option<Governor<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>>,
    clock: DefaultClock,
}

/// Why a rate-limited wait did not complete with tokens granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterError {
    /// The deadline passed before tokens became available.
    DeadlineExceeded,
}

impl RateLimiter {
    #[must_use]
    pub fn new(requests_per_minute: u32, bandwidth_bytes_per_minute: u64) -> Self {
        Self {
            requests: bucket_for_rate_per_minute(requests_per_minute),
            bandwidth: bucket_for_rate_per_minute(u32::try_from(bandwidth_bytes_per_minute).unwrap_or(u32::MAX)),
            clock: DefaultClock::default(),
        }
    }

    /// Reserve one request token, waiting up to `deadline`. A disabled
    /// bucket (rate 0) always allows immediately.
    pub async fn allow_request(&self, deadline: Instant) -> Result<(), LimiterError> {
        self.wait_for(&self.requests, 1, deadline).await
    }

    /// Reserve `n` bandwidth tokens under the same deadline contract as
    /// [`Self::allow_request`].
    pub async fn allow_bandwidth(&self, n: u64, deadline: Instant) -> Result<(), LimiterError> {
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        self.wait_for(&self.bandwidth, n, deadline).await
    }

    async fn wait_for(
        &self,
        bucket: &Option<Governor<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>>,
        n: u32,
        deadline: Instant,
    ) -> Result<(), LimiterError> {
        let Some(limiter) = bucket else {
            return Ok(());
        };
        let Some(n) = NonZeroU32::new(n) else {
            return Ok(());
        };

        loop {
            match limiter.check_n(n) {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(not_until)) => {
                    let wait = not_until.wait_time_from(self.clock.now());
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LimiterError::DeadlineExceeded);
                    }
                    let remaining = deadline.saturating_duration_since(now);
                    let sleep_for = wait.min(remaining);
                    if sleep_for >= remaining {
                        tokio::time::sleep(remaining).await;
                        return Err(LimiterError::DeadlineExceeded);
                    }
                    tokio::time::sleep(sleep_for).await;
                }
                Err(insufficient) => {
                    // The burst itself can never satisfy this reservation.
                    let _ = insufficient;
                    return Err(LimiterError::DeadlineExceeded);
                }
            }
        }
    }
}

/// Build a token bucket whose sustained rate is `per_minute / 60` per
/// second and whose burst equals `per_minute`. A rate of zero disables
/// the bucket entirely.
fn bucket_for_rate_per_minute(
    per_minute: u32,
) -> Option<Governor<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>> {
    let per_minute = NonZeroU32::new(per_minute)?;
    let quota = Quota::per_minute(per_minute).allow_burst(per_minute);
    Some(Governor::direct(quota))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_rate_never_blocks() {
        let limiter = RateLimiter::new(0, 0);
        let deadline = Instant::now() + Duration::from_millis(10);
        for _ in 0..1000 {
            limiter.allow_request(deadline).await.unwrap();
        }
    }

    #[tokio::test]
    async fn burst_exhaustion_then_deadline_expiry_returns_rate_limited() {
        let limiter = RateLimiter::new(2, 0);
        let deadline = Instant::now() + Duration::from_millis(50);
        limiter.allow_request(deadline).await.unwrap();
        limiter.allow_request(deadline).await.unwrap();
        let result = limiter.allow_request(deadline).await;
        assert_eq!(result, Err(LimiterError::DeadlineExceeded));
    }
}
