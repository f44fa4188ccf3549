//! Global pacing of connection attempts

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Pool-wide cap on connection attempts per second
///
/// One permit is replenished every `1 / rate` seconds, so fractional rates
/// such as one attempt every two seconds (`0.5`) are honoured. Up to one
/// second's worth of attempts (at least one) may go out back to back.
///
/// The coordinator creates one and shares it with every worker through an
/// `Arc`.
///
/// ```
/// use flood_bench_core::worker::AttemptRateLimiter;
/// use std::time::Duration;
///
/// let limiter = AttemptRateLimiter::new(Some(0.5));
/// assert_eq!(limiter.interval(), Some(Duration::from_secs(2)));
/// assert!(!AttemptRateLimiter::unlimited().is_enabled());
/// ```
pub struct AttemptRateLimiter {
    limiter: Option<DirectLimiter>,
    rate_limit: Option<f64>,
    interval: Option<Duration>,
}

impl AttemptRateLimiter {
    /// Create a limiter for `rate_limit` attempts per second
    ///
    /// `None`, non-positive and unrepresentable rates disable limiting;
    /// `FloodConfig::validate` rejects the latter two before they get here.
    pub fn new(rate_limit: Option<f64>) -> Self {
        let interval = rate_limit.and_then(attempt_interval);
        let limiter = rate_limit
            .zip(interval)
            .and_then(|(rps, interval)| quota(rps, interval))
            .map(RateLimiter::direct);

        Self {
            interval: limiter.as_ref().and(interval),
            limiter,
            rate_limit,
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Wait for the next attempt permit
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Whether attempts are being paced at all
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Configured attempts per second
    pub fn rate_limit(&self) -> Option<f64> {
        self.rate_limit
    }

    /// Time between replenished permits
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

fn attempt_interval(rps: f64) -> Option<Duration> {
    if rps.is_nan() || rps <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / rps)
        .ok()
        .filter(|d| !d.is_zero())
}

fn quota(rps: f64, interval: Duration) -> Option<Quota> {
    // Float-to-int casts saturate, so huge rates stay in range
    let burst = NonZeroU32::new((rps.floor() as u32).max(1))?;
    Some(Quota::with_period(interval)?.allow_burst(burst))
}

impl Default for AttemptRateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for AttemptRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptRateLimiter")
            .field("rate_limit", &self.rate_limit)
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    async fn timed_wait(limiter: &AttemptRateLimiter) -> Duration {
        let start = Instant::now();
        limiter.wait().await;
        start.elapsed()
    }

    #[test]
    fn test_disabled_for_missing_or_non_positive_rate() {
        for rate in [None, Some(0.0), Some(-10.0), Some(f64::NAN)] {
            let limiter = AttemptRateLimiter::new(rate);
            assert!(!limiter.is_enabled(), "rate {rate:?}");
            assert!(limiter.interval().is_none());
        }
    }

    #[test]
    fn test_interval_is_inverse_rate() {
        let limiter = AttemptRateLimiter::new(Some(20.0));
        assert!(limiter.is_enabled());
        assert_eq!(limiter.rate_limit(), Some(20.0));
        assert_eq!(limiter.interval(), Some(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_sub_one_rate_is_not_rounded_up() {
        let limiter = AttemptRateLimiter::new(Some(0.5));
        assert_eq!(limiter.interval(), Some(Duration::from_secs(2)));

        assert!(timed_wait(&limiter).await < Duration::from_millis(50));
        // At one attempt per second the next permit would be ready by now
        let next = tokio::time::timeout(Duration::from_millis(1500), limiter.wait()).await;
        assert!(next.is_err(), "second permit arrived early");
    }

    #[tokio::test]
    async fn test_burst_then_paced() {
        let limiter = AttemptRateLimiter::new(Some(4.0));
        for _ in 0..4 {
            assert!(timed_wait(&limiter).await < Duration::from_millis(50));
        }
        assert!(timed_wait(&limiter).await >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = AttemptRateLimiter::unlimited();
        for _ in 0..100 {
            limiter.wait().await;
        }
    }

    #[test]
    fn test_debug_shows_interval() {
        let debug = format!("{:?}", AttemptRateLimiter::new(Some(100.0)));
        assert!(debug.contains("AttemptRateLimiter"));
        assert!(debug.contains("100.0"));
        assert!(debug.contains("10ms"));
    }
}
