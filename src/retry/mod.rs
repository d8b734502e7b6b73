//! Bounded fixed-delay retry for database actions that hit a dead connection.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

/// SQLSTATE codes outside class `08` that still mean the server dropped us.
const SHUTDOWN_SQLSTATES: [&str; 3] = ["57P01", "57P02", "57P03"];

/// How often and how far apart a failed action is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; an action runs at most `max_retries + 1` times.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 5;
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(50);

    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Run every action exactly once.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_DELAY)
    }
}

/// Run `action` under `policy`, retrying only failures `is_transient` accepts.
///
/// Non-transient failures return immediately. When the retry budget runs out
/// the last failure is returned unchanged. The wait between attempts is a
/// tokio timer, so no worker thread is held during backoff.
pub async fn retry_with<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    is_transient: C,
    mut action: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: fmt::Display,
{
    let mut retries = 0u32;
    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(e) if !is_transient(&e) => {
                debug!(error = %e, "Database action failed with non-transient error");
                return Err(e);
            }
            Err(e) if retries >= policy.max_retries => {
                error!(
                    attempts = retries + 1,
                    max_retries = policy.max_retries,
                    error = %e,
                    "Database action failed after max retries"
                );
                return Err(e);
            }
            Err(e) => {
                retries += 1;
                warn!(
                    retry = retries,
                    max_retries = policy.max_retries,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "Lost database connection, retrying"
                );
                sleep(policy.delay).await;
            }
        }
    }
}

/// Whether a sqlx error means the leased connection was stale or dropped.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_connection_sqlstate(&code)),
        _ => false,
    }
}

/// Connection-exception class `08` plus the admin/crash shutdown codes.
pub fn is_connection_sqlstate(code: &str) -> bool {
    code.starts_with("08") || SHUTDOWN_SQLSTATES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    fn connection_reset() -> sqlx::Error {
        sqlx::Error::Io(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.delay, Duration::from_millis(50));
    }

    #[test]
    fn classifies_connection_errors() {
        assert!(is_transient(&connection_reset()));
        assert!(is_transient(&sqlx::Error::WorkerCrashed));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient(&sqlx::Error::PoolClosed));
    }

    #[test]
    fn classifies_sqlstates() {
        assert!(is_connection_sqlstate("08000"));
        assert!(is_connection_sqlstate("08006"));
        assert!(is_connection_sqlstate("57P01"));
        assert!(!is_connection_sqlstate("23505"));
        assert!(!is_connection_sqlstate("40P01"));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_fifth_attempt_with_fixed_spacing() {
        let attempts = AtomicU32::new(0);
        let mut stamps = Vec::new();

        let result = retry_with(&RetryPolicy::default(), is_transient, || {
            stamps.push(Instant::now());
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 5 {
                    Err(connection_reset())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(assert_ok!(result), 5);
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        assert_eq!(stamps.len(), 5);
        for pair in stamps.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(50), "gap too short: {gap:?}");
            assert!(gap < Duration::from_millis(60), "gap too long: {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retries_and_surfaces_last_failure() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), sqlx::Error> = retry_with(&RetryPolicy::default(), is_transient, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                Err(sqlx::Error::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    format!("attempt {n}"),
                )))
            }
        })
        .await;

        let err = assert_err!(result);
        assert_eq!(attempts.load(Ordering::SeqCst), 6);
        assert!(err.to_string().contains("attempt 6"));
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), sqlx::Error> = retry_with(&RetryPolicy::default(), is_transient, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(sqlx::Error::RowNotFound) }
        })
        .await;

        assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(Instant::now(), started);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_runs_once() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), sqlx::Error> = retry_with(&RetryPolicy::none(), is_transient, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(connection_reset()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_classifier_and_error_type() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(10));

        let result: Result<u32, String> = retry_with(&policy, |e: &String| e == "stale", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("stale".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
