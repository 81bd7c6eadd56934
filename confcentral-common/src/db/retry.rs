//! Transaction contention retry
//!
//! A transaction aborted by lock contention has rolled back completely, so
//! the whole unit of work can be re-run. Retries are bounded by an attempt
//! count and by total elapsed time; exhaustion is reported as
//! [`Error::Transient`].

use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::RetrySettings;
use crate::{Error, Result};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 500;

/// Retry a transactional operation with exponential backoff while it fails on contention.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If contention error ([`Error::is_contention`]):
///    a. If attempts and elapsed time are within budget: log WARN, backoff, retry
///    b. Otherwise: log ERROR, return [`Error::Transient`]
/// 4. If other error: return error immediately (no retry)
///
/// `operation` must start a fresh transaction on every call.
pub async fn retry_on_contention<F, Fut, T>(
    operation_name: &str,
    settings: RetrySettings,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(settings.max_wait_ms);
    let max_attempts = settings.max_attempts.max(1);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Transaction succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if err.is_contention() => {
                let elapsed = start_time.elapsed();

                if attempt >= max_attempts || elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_attempts,
                        max_wait_ms = settings.max_wait_ms,
                        "Transaction abandoned: contention retry budget exhausted"
                    );
                    return Err(Error::Transient(format!(
                        "{} aborted by contention after {} attempts ({} ms)",
                        operation_name,
                        attempt,
                        elapsed.as_millis()
                    )));
                }

                let remaining = max_duration.saturating_sub(elapsed);
                let sleep_for = Duration::from_millis(backoff_ms).min(remaining);

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    backoff_ms = sleep_for.as_millis() as u64,
                    "Transaction aborted by contention, will retry after backoff"
                );

                tokio::time::sleep(sleep_for).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
            Err(err) => return Err(err),
        }
    }
}
