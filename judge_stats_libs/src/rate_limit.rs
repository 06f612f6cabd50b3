//! Fixed window rate limiter shared by every LeetCode request of a process.
//!
//! The window starts with `allowance` tokens and a reset instant `window` in the future.
//! Each fetch consumes one token. When the tokens run out, callers sleep until the reset
//! instant and then draw from the replenished window. The upstream service can cut the
//! window short by signaling its own reset instant.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_ALLOWANCE: u32 = 10;
pub const DEFAULT_WINDOW_SECONDS: i64 = 60;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        if let Ok(duration) = (deadline - Utc::now()).to_std() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

pub struct RateLimiter {
    allowance: u32,
    window: Duration,
    state: Mutex<RateLimitState>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(allowance: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let state = RateLimitState {
            remaining: allowance,
            reset_at: clock.now() + window,
        };

        Self {
            allowance,
            window,
            state: Mutex::new(state),
            clock,
        }
    }

    pub fn with_allowance(allowance: u32) -> Self {
        Self::new(
            allowance,
            Duration::seconds(DEFAULT_WINDOW_SECONDS),
            Arc::new(SystemClock),
        )
    }

    pub fn state(&self) -> RateLimitState {
        *self.lock()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Consume one token if the current window has any left.
    pub fn try_acquire(&self) -> bool {
        self.acquire_or_reset_at().is_ok()
    }

    /// Consume one token, sleeping until the window resets when none are left.
    pub async fn wait_for_slot(&self) {
        loop {
            let reset_at = match self.acquire_or_reset_at() {
                Ok(()) => return,
                Err(reset_at) => reset_at,
            };

            tracing::info!("Rate limit exhausted. Waiting until {}.", reset_at);
            self.clock.sleep_until(reset_at).await;
        }
    }

    /// Record that the upstream service refused a request until `reset_at`.
    pub fn on_rate_limit_signal(&self, reset_at: DateTime<Utc>) {
        let mut state = self.lock();
        state.remaining = 0;
        state.reset_at = reset_at;
        tracing::warn!("Upstream rate limit signaled. Resets at {}.", reset_at);
    }

    // The lock is never held across an await, so the check and the decrement are atomic.
    fn acquire_or_reset_at(&self) -> Result<(), DateTime<Utc>> {
        let now = self.clock.now();
        let mut state = self.lock();

        if now >= state.reset_at {
            state.remaining = self.allowance;
            state.reset_at = now + self.window;
        }

        if state.remaining > 0 {
            state.remaining -= 1;
            Ok(())
        } else {
            Err(state.reset_at)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_allowance(DEFAULT_ALLOWANCE)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Clock that only moves when someone sleeps on it.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        pub fn advance(&self, duration: Duration) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now = *now + duration;
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }

        async fn sleep_until(&self, deadline: DateTime<Utc>) {
            {
                let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
                if *now < deadline {
                    *now = deadline;
                }
            }
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::testing::ManualClock;
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn limiter(allowance: u32) -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new(epoch()));
        let limiter = RateLimiter::new(allowance, Duration::seconds(60), clock.clone());
        (clock, limiter)
    }

    #[test]
    fn test_initial_state() {
        let (_, limiter) = limiter(10);

        assert_eq!(
            limiter.state(),
            RateLimitState {
                remaining: 10,
                reset_at: epoch() + Duration::seconds(60),
            }
        );
    }

    #[test]
    fn test_try_acquire_exhausts_window() {
        let (_, limiter) = limiter(10);

        for _ in 0..10 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.state().remaining, 0);
    }

    #[test]
    fn test_window_resets_after_reset_instant() {
        let (clock, limiter) = limiter(2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        clock.advance(Duration::seconds(60));

        assert!(limiter.try_acquire());
        assert_eq!(limiter.state().remaining, 1);
        assert_eq!(
            limiter.state().reset_at,
            epoch() + Duration::seconds(120)
        );
    }

    #[tokio::test]
    async fn test_wait_for_slot_sleeps_until_reset() {
        let (clock, limiter) = limiter(1);
        limiter.wait_for_slot().await;
        assert_eq!(clock.now(), epoch());

        limiter.wait_for_slot().await;

        assert_eq!(clock.now(), epoch() + Duration::seconds(60));
        assert_eq!(limiter.state().remaining, 0);
    }

    #[tokio::test]
    async fn test_rate_limit_signal_overrides_window() {
        let (clock, limiter) = limiter(10);
        let upstream_reset = epoch() + Duration::seconds(300);

        limiter.on_rate_limit_signal(upstream_reset);
        assert!(!limiter.try_acquire());

        limiter.wait_for_slot().await;

        assert_eq!(clock.now(), upstream_reset);
        assert_eq!(limiter.state().remaining, 9);
    }

    #[tokio::test]
    async fn test_last_token_is_not_shared() {
        let (clock, limiter) = limiter(1);

        let (first, second) = tokio::join!(
            async {
                limiter.wait_for_slot().await;
                clock.now()
            },
            async {
                limiter.wait_for_slot().await;
                clock.now()
            }
        );

        // どちらか一方だけがリセット前にトークンを得る
        let before_reset = [first, second]
            .iter()
            .filter(|at| **at < epoch() + Duration::seconds(60))
            .count();
        assert_eq!(before_reset, 1);
    }
}
