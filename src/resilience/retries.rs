//! Retry logic.
//!
//! # Responsibilities
//! - Classify each attempt as success, retryable failure or fatal failure
//! - Execute retries with exponential backoff + jitter
//! - Surface the last error unchanged once the budget is spent
//!
//! # Design Decisions
//! - Retryable: timeouts, 429, and any status >= 500
//! - Classification matches on the error variant, never on message text
//! - Fatal failures end the loop immediately, no backoff sleep

use std::future::Future;
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Outcome of one attempt.
#[derive(Debug)]
pub enum AttemptResult<T> {
    Success(T),
    RetryableFailure(FetchError),
    FatalFailure(FetchError),
}

impl<T> AttemptResult<T> {
    pub fn classify(result: FetchResult<T>) -> Self {
        match result {
            Ok(value) => AttemptResult::Success(value),
            Err(e) if e.is_retryable() => AttemptResult::RetryableFailure(e),
            Err(e) => AttemptResult::FatalFailure(e),
        }
    }
}

/// Per-call retry budget and backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub jitter_ms: u64,
}

impl RetryPolicy {
    /// Sleep before the attempt following `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.backoff_base_ms, self.jitter_ms)
    }

    /// Drive `op` until it succeeds, fails fatally, or the budget runs out.
    ///
    /// `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, url: &str, mut op: F) -> FetchResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match AttemptResult::classify(op(attempt).await) {
                AttemptResult::Success(value) => return Ok(value),
                AttemptResult::FatalFailure(e) => {
                    tracing::debug!(url = %url, attempt, error = %e, "Non-retryable failure");
                    return Err(e);
                }
                AttemptResult::RetryableFailure(e) if attempt >= self.max_retries => {
                    tracing::warn!(url = %url, attempts = attempt + 1, error = %e, "Retries exhausted");
                    return Err(e);
                }
                AttemptResult::RetryableFailure(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::info!(url = %url, attempt, delay = ?delay, error = %e, "Retrying request");
                    metrics::record_retry();
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
