//! Exponential backoff for transient infrastructure failures.
//!
//! Wraps a unit of work and re-runs it for as long as it fails with an error
//! the caller classifies as transient. There is no attempt limit, only a delay
//! ceiling. Errors that are not transient are returned on first sight.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tracing::{info, warn};

/// Default first delay.
pub const DEFAULT_START: Duration = Duration::from_millis(100);

/// Default multiplier applied after every failure.
pub const DEFAULT_FACTOR: u32 = 2;

/// Default delay ceiling.
pub const DEFAULT_MAX: Duration = Duration::from_secs(10);

/// Delay schedule for [`with_backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub start: Duration,
    /// Multiplier applied to the delay after each failure.
    pub factor: u32,
    /// Upper bound for any single delay.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            factor: DEFAULT_FACTOR,
            max: DEFAULT_MAX,
        }
    }
}

impl BackoffPolicy {
    pub fn new(start: Duration, factor: u32, max: Duration) -> Self {
        Self { start, factor, max }
    }

    /// The unbounded sequence of delays: `start`, `start * factor`, ... capped at `max`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let factor = self.factor.max(1);
        let max = self.max;
        std::iter::successors(Some(self.start.min(max)), move |delay| {
            Some(delay.saturating_mul(factor).min(max))
        })
    }
}

/// Run `operation` until it succeeds or fails with a non-transient error.
///
/// The delay grows across every failure of this call and never resets. Each
/// retry is logged with the operation name and the error.
///
/// # Arguments
///
/// * `policy` - Delay schedule
/// * `operation_name` - Name used in retry logs
/// * `is_transient` - Decides whether an error is worth retrying
/// * `operation` - Produces a fresh future for every attempt
pub async fn with_backoff<F, Fut, T, E, P>(
    policy: &BackoffPolicy,
    operation_name: &str,
    is_transient: P,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut failures: u64 = 0;
    // Advances in step with the strategy, one delay per transient failure.
    let mut upcoming = policy.delays();

    let result = RetryIf::spawn(policy.delays(), operation, |e: &E| {
        if !is_transient(e) {
            return false;
        }
        failures += 1;
        let delay = upcoming.next().unwrap_or(policy.max);
        warn!(
            operation = %operation_name,
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "Transient failure, retrying"
        );
        true
    })
    .await;

    if result.is_ok() && failures > 0 {
        info!(
            operation = %operation_name,
            failures = failures,
            "Operation succeeded after retry"
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Flaky,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn transient(e: &TestError) -> bool {
        *e == TestError::Flaky
    }

    #[test]
    fn test_delay_schedule_is_capped() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), 2, Duration::from_secs(1));
        let delays: Vec<u64> = policy.delays().take(6).map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_start_above_max_is_clamped() {
        let policy = BackoffPolicy::new(Duration::from_secs(30), 2, Duration::from_secs(10));
        assert_eq!(policy.delays().next(), Some(Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicUsize::new(0);
        let policy = BackoffPolicy::new(Duration::from_millis(100), 2, Duration::from_secs(1));
        let started = Instant::now();

        let result = with_backoff(&policy, "flaky", transient, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 5 {
                    Err(TestError::Flaky)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(5));
        // Five failures mean six calls
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        // 100 + 200 + 400 + 800 + 1000
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2500), "slept {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2600), "slept {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_propagates_immediately() {
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let result: Result<(), TestError> =
            with_backoff(&BackoffPolicy::default(), "fatal", transient, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Fatal) }
            })
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_after_transient_stops_retrying() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), TestError> =
            with_backoff(&BackoffPolicy::default(), "mixed", transient, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError::Flaky)
                    } else {
                        Err(TestError::Fatal)
                    }
                }
            })
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
