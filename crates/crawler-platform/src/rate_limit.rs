//! Per-adapter rate-limit governance: a per-minute
//! request counter plus a minimum inter-request delay, uniformly sampled
//! per request.
//!
//! Grounded on `packages/extraction/src/crawlers/rate_limited.rs`'s use of
//! the `governor` crate for the per-minute quota, combined with
//! `original_source/crawler_engine/platforms/base.py`'s
//! `check_rate_limit` for the additional `search_delay_range` spacing,
//! which `governor`'s smooth-rate model doesn't express on its own.

use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use governor::{Quota, RateLimiter};
use rand::Rng;

use crate::config::PlatformConfig;

type MinuteLimiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Tracks a single adapter's rate limit state across calls.
pub struct RateGovernor {
    per_minute: MinuteLimiter,
    delay_range: (Duration, Duration),
    last_request: Mutex<Option<Instant>>,
}

impl RateGovernor {
    pub fn new(config: &PlatformConfig) -> Self {
        let per_minute = NonZeroU32::new(config.rate_limit_per_minute.max(1)).expect("rate_limit_per_minute clamped to >= 1");
        Self {
            per_minute: RateLimiter::direct(Quota::per_minute(per_minute)),
            delay_range: config.search_delay_range,
            last_request: Mutex::new(None),
        }
    }

    /// Blocks until both the per-minute window and the minimum
    /// inter-request spacing permit another call.
    pub async fn acquire(&self) {
        self.per_minute.until_ready().await;

        let wait = {
            let mut last = self.last_request.lock().unwrap();
            let now = Instant::now();
            let target = match *last {
                Some(prev) => {
                    let (min, max) = self.delay_range;
                    let spacing = if max > min {
                        let extra_ms = rand::thread_rng().gen_range(0..=(max - min).as_millis() as u64);
                        min + Duration::from_millis(extra_ms)
                    } else {
                        min
                    };
                    let elapsed = now.saturating_duration_since(prev);
                    spacing.saturating_sub(elapsed)
                }
                None => Duration::ZERO,
            };
            *last = Some(now + target);
            target
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(per_minute: u32, min: Duration, max: Duration) -> PlatformConfig {
        PlatformConfig::new("stub", "https://stub.example", "https://stub.example/search")
            .with_rate_limit_per_minute(per_minute)
            .with_search_delay_range(min, max)
    }

    #[tokio::test]
    async fn second_acquire_waits_out_minimum_spacing() {
        let governor = RateGovernor::new(&config_with(1000, Duration::from_millis(20), Duration::from_millis(20)));
        let start = Instant::now();
        governor.acquire().await;
        governor.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(18));
    }
}
