//! Per-adapter request pacing.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum spacing between outbound requests.
///
/// State is local to one instance. The lock is held across the pacing sleep,
/// so callers sharing an instance are serialised and each one observes the
/// full interval after the previous request.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter that spaces requests by at least `min_interval`
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Create a limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Minimum spacing between two requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `min_interval` has elapsed since the previous call, then record this one
    pub async fn wait_if_needed(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tracing::trace!(
                    "Rate limiting: sleeping {:?}",
                    ready_at.saturating_duration_since(Instant::now())
                );
                sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consecutive_calls_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(120));

        let start = Instant::now();
        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;

        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(5));

        let start = Instant::now();
        limiter.wait_if_needed().await;

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_instances_do_not_share_state() {
        let first = RateLimiter::new(Duration::from_secs(5));
        let second = RateLimiter::new(Duration::from_secs(5));

        let start = Instant::now();
        first.wait_if_needed().await;
        second.wait_if_needed().await;

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        assert_eq!(limiter.min_interval(), Duration::ZERO);

        let start = std::time::Instant::now();
        tokio_test::block_on(async {
            for _ in 0..5 {
                limiter.wait_if_needed().await;
            }
        });
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
