//! Bounded polling with a delay between attempts

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::core::errors::Result;

/// Status checks made before a translation is abandoned
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// Delay before each status check
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How often and how patiently to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fetches allowed before giving up
    pub max_attempts: u32,
    /// Delay before the first fetch
    pub interval: Duration,
    /// Delay multiplier applied after every attempt; 1 keeps the interval fixed
    pub backoff_factor: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(MAX_POLL_ATTEMPTS, POLL_INTERVAL)
    }
}

impl PollPolicy {
    /// Fixed-interval policy
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            backoff_factor: 1,
        }
    }

    /// Multiply the delay by `factor` after every attempt; 0 is treated as 1
    pub fn with_backoff(mut self, factor: u32) -> Self {
        self.backoff_factor = factor.max(1);
        self
    }

    /// Delay before the given 1-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.interval
            .saturating_mul(self.backoff_factor.saturating_pow(exponent))
    }
}

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// The value stopped being pending
    Settled {
        /// Settled value
        value: T,
        /// Fetches made, 0 if `initial` was already settled
        attempts: u32,
    },
    /// The value was still pending after the last allowed attempt
    Exhausted {
        /// Last fetched value
        value: T,
        /// Always `max_attempts`
        attempts: u32,
    },
}

impl<T> PollOutcome<T> {
    /// Fetches made
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Settled { attempts, .. } | PollOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Last fetched value
    pub fn into_value(self) -> T {
        match self {
            PollOutcome::Settled { value, .. } | PollOutcome::Exhausted { value, .. } => value,
        }
    }
}

/// Re-fetch `initial` while `pending` holds, sleeping before each fetch.
///
/// At most `policy.max_attempts` fetches are made. A fetch error ends the
/// loop immediately and is returned as-is.
pub async fn poll_while<T, P, F, Fut>(
    policy: PollPolicy,
    initial: T,
    mut pending: P,
    mut fetch: F,
) -> Result<PollOutcome<T>>
where
    P: FnMut(&T) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut value = initial;
    let mut attempts = 0;

    while pending(&value) {
        if attempts >= policy.max_attempts {
            return Ok(PollOutcome::Exhausted { value, attempts });
        }

        attempts += 1;
        sleep(policy.delay_for(attempts)).await;
        debug!("Poll attempt {}/{}", attempts, policy.max_attempts);
        value = fetch().await?;
    }

    Ok(PollOutcome::Settled { value, attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ExportError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test(start_paused = true)]
    async fn test_settles_when_no_longer_pending() {
        let calls = &AtomicU32::new(0);
        let start = Instant::now();

        let outcome = poll_while(PollPolicy::default(), 0u32, |v| *v < 3, move || async move {
            Ok::<_, ExportError>(calls.fetch_add(1, Ordering::SeqCst) + 1)
        })
        .await;

        let outcome = assert_ok!(outcome);
        assert_eq!(outcome, PollOutcome::Settled { value: 3, attempts: 3 });
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_settled_does_not_fetch() {
        let calls = &AtomicU32::new(0);

        let outcome = poll_while(PollPolicy::default(), "done", |_| false, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ExportError>("fetched")
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.attempts(), 0);
        assert_eq!(outcome.into_value(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let start = Instant::now();

        let outcome = poll_while(PollPolicy::default(), (), |_| true, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ExportError>(())
        })
        .await
        .unwrap();

        assert!(matches!(outcome, PollOutcome::Exhausted { attempts: 30, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 30);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_stops_polling() {
        let calls = &AtomicU32::new(0);

        let outcome = poll_while(PollPolicy::default(), (), |_| true, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ExportError::api(500, "boom"))
        })
        .await;

        assert_err!(outcome);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_delays() {
        let policy = PollPolicy::new(5, Duration::from_secs(1)).with_backoff(2);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));

        let fixed = PollPolicy::default();
        assert_eq!(fixed.delay_for(1), fixed.delay_for(30));
    }
}
