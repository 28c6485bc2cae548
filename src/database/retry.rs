//! Fixed-backoff retry for persistence calls

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::database::error::DbError;

/// How often and how patiently to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: usize,

    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// Sleeps `policy.backoff` between attempts, never after the last one.
pub async fn retry_fixed<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                last_error = e.to_string();
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    Err(DbError::RetriesExhausted {
        attempts,
        last_error,
    })
}
