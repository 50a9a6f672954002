//! Timeout enforcement.
//!
//! The deadline races the whole attempt (send plus body read). Losing the
//! race drops the in-flight future, which aborts the underlying request.

use std::future::Future;
use std::time::Duration;

use crate::error::{FetchError, FetchResult};

/// Run `fut` with a deadline of `timeout_ms`, mapping expiry to `FetchError::Timeout`.
pub async fn with_deadline<T, F>(url: &str, timeout_ms: u64, fut: F) -> FetchResult<T>
where
    F: Future<Output = FetchResult<T>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            timeout_ms,
        }),
    }
}
