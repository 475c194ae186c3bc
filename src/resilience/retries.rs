//! Bounded retry for idempotent chain reads.
//!
//! # Responsibilities
//! - Re-issue a read up to `max_attempts` times with a fixed pause
//! - Treat results rejected by the acceptance predicate as failures
//! - Bound the whole sequence by an overall deadline
//!
//! # Design Decisions
//! - No pause after the final attempt or after a success
//! - Never used for contract writes

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};

use crate::observability::metrics;

/// Default number of attempts per read.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// A read that never produced an acceptable value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed after {attempts} attempt(s){}", error_suffix(.last_error))]
pub struct RetryExhausted {
    pub operation: &'static str,
    pub attempts: u32,
    pub last_error: Option<String>,
}

fn error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default()
}

/// Fixed-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    /// Upper bound for all attempts and pauses together.
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            deadline: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Run `call` until it yields a value `accept` approves.
    pub async fn run<T, E, F, Fut, A>(
        &self,
        operation: &'static str,
        mut call: F,
        accept: A,
    ) -> Result<T, RetryExhausted>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        A: Fn(&T) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempts = 0u32;
        let mut last_error: Option<String> = None;

        let outcome = timeout(self.deadline, async {
            loop {
                attempts += 1;
                match call().await {
                    Ok(value) if accept(&value) => return Some(value),
                    Ok(_) => {
                        tracing::warn!(operation, attempt = attempts, "Inconclusive chain read");
                        last_error = Some("inconclusive result".to_string());
                    }
                    Err(e) => {
                        tracing::warn!(operation, attempt = attempts, error = %e, "Chain read failed");
                        last_error = Some(e.to_string());
                    }
                }

                if attempts >= max_attempts {
                    return None;
                }
                sleep(self.backoff).await;
            }
        })
        .await;
        metrics::record_read_attempts(operation, attempts);

        match outcome {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(RetryExhausted {
                operation,
                attempts,
                last_error,
            }),
            Err(_) => Err(RetryExhausted {
                operation,
                attempts,
                last_error: Some(format!(
                    "deadline of {}s exceeded{}",
                    self.deadline.as_secs(),
                    last_error.map(|e| format!(" after: {e}")).unwrap_or_default()
                )),
            }),
        }
    }
}
