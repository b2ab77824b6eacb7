//! Exponential backoff bounded by total elapsed time
//!
//! There is no attempt limit: an operation is retried until the next sleep
//! would carry the total elapsed time past `max_elapsed_time`, or until the
//! caller's context finishes.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use super::context::Context;

const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
const DEFAULT_MULTIPLIER: f64 = 1.5;
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_MAX_ELAPSED_TIME: Duration = Duration::from_secs(10);

/// Backoff settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    /// Each delay is drawn uniformly from `interval * (1 ± factor)`
    pub randomization_factor: f64,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_elapsed_time: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            multiplier: DEFAULT_MULTIPLIER,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_elapsed_time: DEFAULT_MAX_ELAPSED_TIME,
        }
    }
}

/// Terminal outcome of a failed retry loop
#[derive(Debug)]
pub enum RetryError<E> {
    /// The elapsed-time budget ran out; carries the last failure
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        last: E,
    },
    /// The caller's context finished first
    Cancelled { attempts: u32 },
}

impl BackoffPolicy {
    pub fn with_max_elapsed_time(mut self, max_elapsed_time: Duration) -> Self {
        self.max_elapsed_time = max_elapsed_time;
        self
    }

    /// Same policy without jitter, for deterministic schedules.
    pub fn without_jitter(mut self) -> Self {
        self.randomization_factor = 0.0;
        self
    }

    fn jittered(&self, interval: Duration) -> Duration {
        if self.randomization_factor <= 0.0 {
            return interval;
        }
        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let drawn = rand::thread_rng().gen_range((secs - delta)..=(secs + delta));
        Duration::from_secs_f64(drawn.max(0.0))
    }

    fn grow(&self, interval: Duration) -> Duration {
        let next = interval.as_secs_f64() * self.multiplier;
        if next >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(next)
        }
    }

    /// Run `operation` until it succeeds, the time budget runs out, or `ctx`
    /// finishes. The operation receives the 1-based attempt number.
    ///
    /// The operation future is raced against the context, so a cancelled
    /// caller does not wait for a hung attempt.
    pub async fn retry<T, E, F, Fut>(
        &self,
        ctx: &Context,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let start = Instant::now();
        let mut interval = self.initial_interval;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = ctx.done() => return Err(RetryError::Cancelled { attempts: attempt }),
                outcome = operation(attempt) => outcome,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let elapsed = start.elapsed();
            let delay = self.jittered(interval);
            interval = self.grow(interval);

            if elapsed + delay > self.max_elapsed_time {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    elapsed,
                    last: err,
                });
            }

            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, backing off"
            );

            tokio::select! {
                biased;
                _ = ctx.done() => return Err(RetryError::Cancelled { attempts: attempt }),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_first_try_without_sleeping() {
        let start = Instant::now();
        let result: Result<u32, RetryError<String>> = BackoffPolicy::default()
            .retry(&Context::background(), |attempt| async move { Ok(attempt) })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_failures() {
        let calls = AtomicU32::new(0);
        let result = BackoffPolicy::default()
            .without_jitter()
            .retry(&Context::background(), |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(format!("failure {n}"))
                    } else {
                        Ok("ready")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_elapsed_time() {
        let start = Instant::now();
        let result: Result<(), _> = BackoffPolicy::default()
            .without_jitter()
            .retry(&Context::background(), |_| async { Err("unreachable") })
            .await;

        // 0.5 + 0.75 + 1.125 + 1.6875 + 2.53125 = 6.59375s of sleeps; the next
        // 3.797s delay would overshoot the 10s budget.
        match result {
            Err(RetryError::Exhausted { attempts, elapsed, last }) => {
                assert_eq!(attempts, 6);
                assert_eq!(last, "unreachable");
                assert!(elapsed >= Duration::from_micros(6_593_750));
                assert!(elapsed < Duration::from_millis(6_600));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert!(start.elapsed() <= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn jittered_schedule_stays_within_budget() {
        let start = Instant::now();
        let result: Result<(), _> = BackoffPolicy::default()
            .retry(&Context::background(), |_| async { Err("down") })
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { .. })));
        let elapsed = start.elapsed();
        assert!(elapsed <= Duration::from_secs(10));
        assert!(elapsed >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let ctx = Context::background().with_timeout(Duration::from_millis(700));
        let start = Instant::now();
        let result: Result<(), _> = BackoffPolicy::default()
            .without_jitter()
            .retry(&ctx, |_| async { Err("down") })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 2 })));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(700));
        assert!(elapsed < Duration::from_millis(750));
    }

    #[tokio::test]
    async fn cancelled_context_wins_over_ready_operation() {
        let ctx = Context::background();
        ctx.cancel();

        let result: Result<(), RetryError<&str>> = BackoffPolicy::default()
            .retry(&ctx, |_| async { Ok(()) })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled { .. })));
    }

    #[test]
    fn interval_growth_is_capped() {
        let policy = BackoffPolicy {
            max_interval: Duration::from_secs(1),
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.grow(Duration::from_millis(500)), Duration::from_millis(750));
        assert_eq!(policy.grow(Duration::from_millis(900)), Duration::from_secs(1));
    }
}
