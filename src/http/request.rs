//! Per-call request options.
//!
//! # Responsibilities
//! - Carry method, headers, body and resilience overrides for one call
//! - Resolve unset knobs against the client's `RequestDefaults`
//! - Build the wire request, adding `If-None-Match` and `X-Request-ID`
//!
//! # Design Decisions
//! - Options are immutable per call; the client never mutates caller state
//! - Header names are case-insensitive: setting one replaces any spelling of it
//! - A request ID is reused across every attempt of one call

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, IF_NONE_MATCH};
use reqwest::Method;
use std::collections::HashMap;

use crate::config::schema::RequestDefaults;
use crate::error::{FetchError, FetchResult};
use crate::net::transport::OutgoingRequest;
use crate::resilience::retries::RetryPolicy;

/// Header carrying the per-call request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Options for a single `fetch_retry` call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    method: String,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    backoff_base_ms: Option<u64>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
            timeout_ms: None,
            max_retries: None,
            backoff_base_ms: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn backoff_base_ms(mut self, backoff_base_ms: u64) -> Self {
        self.backoff_base_ms = Some(backoff_base_ms);
        self
    }

    pub fn get_method(&self) -> &str {
        &self.method
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Deadline per attempt after applying defaults.
    pub fn effective_timeout_ms(&self, defaults: &RequestDefaults) -> u64 {
        self.timeout_ms.unwrap_or(defaults.timeout_ms)
    }

    pub fn retry_policy(&self, defaults: &RequestDefaults) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            backoff_base_ms: self.backoff_base_ms.unwrap_or(defaults.backoff_base_ms),
            jitter_ms: defaults.jitter_ms,
        }
    }

    /// Attach `request_id` unless the caller already set one.
    pub(crate) fn with_request_id(self, request_id: &str) -> Self {
        if self.get_header(X_REQUEST_ID).is_some() {
            return self;
        }
        self.header(X_REQUEST_ID, request_id)
    }

    /// Build the wire request for `url`, conditional on `etag` when given.
    pub fn to_outgoing(&self, url: &str, etag: Option<&str>) -> FetchResult<OutgoingRequest> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("invalid method '{}'", self.method)))?;

        let mut headers = HeaderMap::with_capacity(self.headers.len() + 1);
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidRequest(format!("invalid header name '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::InvalidRequest(format!("invalid value for header '{}'", name)))?;
            headers.insert(name, value);
        }

        if let Some(etag) = etag {
            let value = HeaderValue::from_str(etag)
                .map_err(|_| FetchError::InvalidRequest(format!("cached ETag for {} is not a valid header", url)))?;
            headers.insert(IF_NONE_MATCH, value);
        }

        Ok(OutgoingRequest {
            method,
            url: url.to_string(),
            headers,
            body: self.body.clone(),
        })
    }
}
