//! Error taxonomy for the fetch layer.
//!
//! Every failure surfaced by `fetch_retry`, `get_json` and `post_json` is a
//! `FetchError`. Callers branch on the variant (or on `status()`/`url()`),
//! never on the rendered message.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while issuing a request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Deadline elapsed before a complete response arrived.
    #[error("request to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Server answered with a status other than 2xx or 304.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Breaker rejected the call before any network I/O.
    #[error("circuit open for {url}, retry after {retry_after:?}")]
    CircuitOpen { url: String, retry_after: Duration },

    /// Response body was not valid JSON for the requested type.
    #[error("invalid JSON from {url}: {source}")]
    JsonParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Request body could not be serialized.
    #[error("failed to encode JSON body: {0}")]
    JsonEncode(#[source] serde_json::Error),

    /// Got `304 Not Modified` with nothing cached for the URL.
    #[error("304 Not Modified from {url} without a cached entry")]
    CacheProtocol { url: String },

    /// Connection, DNS or body read failure below the HTTP layer.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// Method, header or URL could not be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// URL of the offending request, if known.
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Timeout { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::CircuitOpen { url, .. }
            | FetchError::JsonParse { url, .. }
            | FetchError::CacheProtocol { url }
            | FetchError::Transport { url, .. } => Some(url.as_str()),
            FetchError::JsonEncode(_) | FetchError::InvalidRequest(_) => None,
        }
    }

    /// Whether another attempt may succeed: timeouts, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } => true,
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, FetchError::CircuitOpen { .. })
    }

    /// True for statuses that trip the circuit breaker.
    pub fn is_server_error(&self) -> bool {
        matches!(self, FetchError::HttpStatus { status, .. } if *status >= 500)
    }
}
