//! Bounded retry with a fixed pause between attempts.

use std::fmt::{self, Display};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// The error that ended a retry loop, with the number of attempts made.
#[derive(Debug)]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
}

impl<E: Display> Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} attempts)", self.error, self.attempts)
    }
}

/// Run `op` up to `times` attempts, sleeping `backoff` between failures.
///
/// `op` receives the 1-based attempt number. Errors for which `should_retry`
/// returns `false` are returned immediately. When every attempt fails the
/// last error is returned. No pause follows the final attempt.
///
/// `times == 0` is treated as a single attempt.
pub async fn attempt<T, E, F, Fut, R>(
    times: u32,
    backoff: Duration,
    should_retry: R,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let times = times.max(1);
    let mut n = 1;
    loop {
        match op(n).await {
            Ok(v) => return Ok(v),
            Err(error) if n >= times || !should_retry(&error) => {
                return Err(RetryError { error, attempts: n })
            }
            Err(e) => {
                warn!("Attempt {}/{} failed: {}", n, times, e);
                tokio::time::sleep(backoff).await;
                n += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let out: Result<&str, RetryError<String>> = attempt(3, Duration::ZERO, |_| true, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("fail {n}"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(out.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let out: Result<(), RetryError<String>> = attempt(3, Duration::ZERO, |_| true, |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("fail {n}")) }
        })
        .await;
        let err = out.unwrap_err();
        assert_eq!(err.error, "fail 3");
        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_stop_immediately() {
        let calls = AtomicU32::new(0);
        let out: Result<(), RetryError<String>> =
            attempt(5, Duration::ZERO, |e: &String| e != "fatal", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal".to_string()) }
            })
            .await;
        assert_eq!(out.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_times_runs_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), RetryError<String>> = attempt(0, Duration::ZERO, |_| true, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("x".to_string()) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts_only() {
        let start = tokio::time::Instant::now();
        let _: Result<(), RetryError<String>> = attempt(3, Duration::from_millis(500), |_| true, |_| async {
            Err("x".to_string())
        })
        .await;
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }
}
