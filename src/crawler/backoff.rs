//! Adaptive backoff shared by all workers of one session
//!
//! Every worker sleeps for the current delay before each fetch. Failures grow
//! the delay multiplicatively, successes shrink it multiplicatively, and the
//! delay is always clamped to `[min_delay, max_delay]`. Because the state is
//! per session rather than per worker, the aggregate request rate against the
//! crawled site drops as soon as any worker sees trouble.

use crate::config::BackoffConfig;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Current backoff state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    /// Wait applied before the next fetch
    pub delay: Duration,

    /// Failures since the last success
    pub consecutive_failures: u32,
}

/// Shared throttle for a session's fetch workers
#[derive(Debug)]
pub struct BackoffCoordinator {
    state: Mutex<BackoffState>,
    min_delay: Duration,
    max_delay: Duration,
    growth_factor: f64,
    shrink_factor: f64,
}

impl BackoffCoordinator {
    /// Creates a coordinator from validated configuration
    ///
    /// The initial delay is clamped into the configured bounds.
    pub fn new(config: &BackoffConfig) -> Self {
        let min_delay = config.min_delay();
        let max_delay = config.max_delay().max(min_delay);

        Self {
            state: Mutex::new(BackoffState {
                delay: config.initial_delay().clamp(min_delay, max_delay),
                consecutive_failures: 0,
            }),
            min_delay,
            max_delay,
            growth_factor: config.growth_factor,
            shrink_factor: config.shrink_factor,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BackoffState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for the current delay
    ///
    /// The lock is released before sleeping; a concurrent report changes the
    /// delay for the next caller, not for sleepers already waiting.
    pub async fn wait(&self) {
        let delay = self.current_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Records a successful fetch and returns the new delay
    pub fn report_success(&self) -> Duration {
        let mut state = self.lock();
        state.consecutive_failures = 0;
        state.delay = self.scale(state.delay, self.shrink_factor);
        state.delay
    }

    /// Records a failed fetch and returns the new delay
    pub fn report_failure(&self) -> Duration {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        // A zero delay would never grow
        let base = state.delay.max(Duration::from_millis(1));
        state.delay = self.scale(base, self.growth_factor);

        tracing::warn!(
            "backing off: delay now {:?} after {} consecutive failures",
            state.delay,
            state.consecutive_failures
        );

        state.delay
    }

    pub fn current_delay(&self) -> Duration {
        self.lock().delay
    }

    pub fn snapshot(&self) -> BackoffState {
        *self.lock()
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    fn scale(&self, delay: Duration, factor: f64) -> Duration {
        let nanos = (delay.as_nanos() as f64 * factor).round();
        let scaled = if nanos.is_finite() && nanos < self.max_delay.as_nanos() as f64 {
            Duration::from_nanos(nanos.max(0.0) as u64)
        } else {
            self.max_delay
        };
        scaled.clamp(self.min_delay, self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(initial: u64, min: u64, max: u64) -> BackoffConfig {
        BackoffConfig {
            initial_delay_ms: initial,
            min_delay_ms: min,
            max_delay_ms: max,
            growth_factor: 2.0,
            shrink_factor: 0.5,
        }
    }

    #[test]
    fn test_failure_doubles_until_ceiling() {
        let backoff = BackoffCoordinator::new(&config(100, 50, 1000));

        assert_eq!(backoff.report_failure(), Duration::from_millis(200));
        assert_eq!(backoff.report_failure(), Duration::from_millis(400));
        assert_eq!(backoff.report_failure(), Duration::from_millis(800));
        assert_eq!(backoff.report_failure(), Duration::from_millis(1000));
        assert_eq!(backoff.report_failure(), Duration::from_millis(1000));
        assert_eq!(backoff.snapshot().consecutive_failures, 5);
    }

    #[test]
    fn test_success_halves_until_floor_and_resets_failures() {
        let backoff = BackoffCoordinator::new(&config(400, 100, 1000));
        backoff.report_failure();
        assert_eq!(backoff.snapshot().consecutive_failures, 1);

        assert_eq!(backoff.report_success(), Duration::from_millis(400));
        assert_eq!(backoff.snapshot().consecutive_failures, 0);
        assert_eq!(backoff.report_success(), Duration::from_millis(200));
        assert_eq!(backoff.report_success(), Duration::from_millis(100));
        assert_eq!(backoff.report_success(), Duration::from_millis(100));
    }

    #[test]
    fn test_delay_is_monotonic_and_bounded() {
        let backoff = BackoffCoordinator::new(&BackoffConfig::default());
        let (min, max) = (backoff.min_delay(), backoff.max_delay());

        let mut previous = backoff.current_delay();
        for _ in 0..20 {
            let next = backoff.report_failure();
            assert!(next >= previous);
            assert!(next >= min && next <= max);
            previous = next;
        }
        assert_eq!(previous, max);

        for _ in 0..40 {
            let next = backoff.report_success();
            assert!(next <= previous);
            assert!(next >= min && next <= max);
            previous = next;
        }
        assert_eq!(previous, min);
    }

    #[test]
    fn test_initial_delay_is_clamped() {
        let backoff = BackoffCoordinator::new(&config(5, 50, 1000));
        assert_eq!(backoff.current_delay(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_current_delay() {
        let backoff = BackoffCoordinator::new(&config(300, 100, 1000));

        let start = tokio::time::Instant::now();
        backoff.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
