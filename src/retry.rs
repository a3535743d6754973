//! Bounded retry with a fixed delay between attempts.
//!
//! Attempt counts are small and every operation is coarse-grained (a whole
//! `docker build`, a whole push), so the delay does not grow between attempts.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// How often an operation is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least one attempt.
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            delay,
        }
    }

    /// A policy that makes exactly one attempt
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Configured number of attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between a failed attempt and the next one
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Returned once every attempt failed.
///
/// Only the error of the last attempt is kept.
#[derive(Error, Debug)]
#[error("after {attempts} attempts, last error: {last}")]
pub struct RetryError<E> {
    /// Number of attempts made (always the policy's `max_attempts`)
    pub attempts: u32,
    /// Error of the final attempt
    #[source]
    pub last: E,
}

/// Run `operation` until it succeeds or `policy` runs out of attempts.
///
/// A notice is logged after every failed attempt except the last, right before
/// sleeping for `policy.delay()`.
pub async fn retry<F, Fut, T, E>(
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(err) if attempt >= policy.max_attempts => {
                return Err(RetryError {
                    attempts: policy.max_attempts,
                    last: err,
                });
            }
            Err(err) => {
                log::info!(
                    "{} failed (attempt {}/{}), retrying in {:.1}s after error: {}",
                    operation_name,
                    attempt,
                    policy.max_attempts,
                    policy.delay.as_secs_f64(),
                    err
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::cell::Cell;
    use std::sync::{Mutex, Once};
    use tokio::time::Instant;

    /// Keeps every info record together with the (paused) clock reading
    struct CapturedLogs {
        records: Mutex<Vec<(Instant, String)>>,
    }

    impl Log for CapturedLogs {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            metadata.level() <= Level::Info
        }

        fn log(&self, record: &Record<'_>) {
            if self.enabled(record.metadata())
                && let Ok(mut records) = self.records.lock()
            {
                records.push((Instant::now(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURED: CapturedLogs = CapturedLogs {
        records: Mutex::new(Vec::new()),
    };

    /// Records logged so far whose message mentions `needle`
    fn captured_with(needle: &str) -> Vec<(Instant, String)> {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            log::set_logger(&CAPTURED).expect("no other logger in unit tests");
            log::set_max_level(LevelFilter::Info);
        });
        CAPTURED
            .records
            .lock()
            .expect("log capture lock")
            .iter()
            .filter(|(_, message)| message.contains(needle))
            .cloned()
            .collect()
    }

    fn failing_until(calls: &Cell<u32>, succeed_on: u32) -> impl Future<Output = Result<u32, String>> {
        calls.set(calls.get() + 1);
        let call = calls.get();
        async move {
            if call >= succeed_on {
                Ok(call)
            } else {
                Err(format!("failure #{call}"))
            }
        }
    }

    #[tokio::test]
    async fn test_never_failing_operation_runs_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(5, Duration::from_secs(10));

        let result = retry(policy, "noop", || failing_until(&calls, 1)).await;

        assert_eq!(result.ok(), Some(1));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_last_attempt() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(4, Duration::from_secs(2));
        let started = Instant::now();

        let result = retry(policy, "flaky", || failing_until(&calls, 4)).await;

        assert_eq!(result.ok(), Some(4));
        assert_eq!(calls.get(), 4);
        // three failures, three fixed pauses
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_reports_attempts_and_last_cause() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(10));
        let started = Instant::now();

        let err = retry(policy, "broken", || failing_until(&calls, u32::MAX))
            .await
            .expect_err("operation never succeeds");

        assert_eq!(calls.get(), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, "failure #3");
        assert_eq!(err.to_string(), "after 3 attempts, last error: failure #3");
        // no pause after the final attempt
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_notice_logged_before_each_pause_but_not_after_last_attempt() {
        // install the capture before anything is logged
        captured_with("");
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(10));
        let started = Instant::now();

        let err = retry(policy, "notice-check", || failing_until(&calls, u32::MAX))
            .await
            .expect_err("operation never succeeds");
        assert_eq!(err.attempts, 3);

        let notices = captured_with("notice-check");
        assert_eq!(notices.len(), 2);
        assert!(notices[0].1.contains("failure #1"));
        assert!(notices[1].1.contains("failure #2"));
        // each notice precedes the pause that follows its failure
        assert_eq!(notices[0].0, started);
        assert_eq!(notices[1].0, started + Duration::from_secs(10));
    }

    #[test]
    fn test_retry_error_keeps_last_cause_as_source() {
        use std::error::Error as _;

        let err = RetryError {
            attempts: 2,
            last: std::io::Error::other("registry unreachable"),
        };
        assert_eq!(err.to_string(), "after 2 attempts, last error: registry unreachable");
        assert_eq!(
            err.source().map(|s| s.to_string()).as_deref(),
            Some("registry unreachable")
        );
    }

    #[test]
    fn test_zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
        assert_eq!(RetryPolicy::once().max_attempts(), 1);
    }
}
