//! Resilient HTTP client.
//!
//! # Responsibilities
//! - Execute single attempts: breaker gate, conditional headers, deadline,
//!   304 reconstruction, ETag storage, breaker trips on 5xx
//! - Retry retryable failures with backoff (`fetch_retry`)
//! - JSON convenience wrappers (`get_json`, `post_json`)
//!
//! # Data Flow
//! ```text
//! get_json / post_json
//!     → fetch_retry
//!         → breaker gate (once per call)
//!         → RetryPolicy::run
//!             → attempt: cache lookup → transport under deadline → interpret
//!     → Response::json
//! ```
//!
//! # Design Decisions
//! - Cache and breakers are fields of the client; clones of the cache share state
//! - The breaker is consulted once per call, so retries inside a call still run
//!   after an earlier attempt tripped it; the next call fails fast
//! - A 304 with nothing cached is fatal (`CacheProtocol`), never retried
//! - A half-open probe call makes exactly one attempt

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, ETAG};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::EtagCache;
use crate::config::schema::ClientConfig;
use crate::error::{FetchError, FetchResult};
use crate::http::{RequestOptions, Response};
use crate::net::transport::{RawResponse, ReqwestTransport, Transport};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{BreakerPermit, BreakerSet};
use crate::resilience::timeouts::with_deadline;

/// Breaker admission held for the duration of one call.
type Gate = Option<BreakerPermit>;

/// HTTP client with timeouts, retries, a circuit breaker and an ETag cache.
pub struct HttpClient<T = ReqwestTransport> {
    transport: T,
    cache: EtagCache,
    breakers: BreakerSet,
    config: ClientConfig,
}

impl HttpClient<ReqwestTransport> {
    /// Build a client backed by reqwest.
    pub fn new(config: ClientConfig) -> FetchResult<Self> {
        let transport = ReqwestTransport::from_defaults(&config.request)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> HttpClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        tracing::debug!(
            timeout_ms = config.request.timeout_ms,
            max_retries = config.request.max_retries,
            breaker_scope = ?config.breaker.scope,
            cache_enabled = config.cache.enabled,
            "HTTP client created"
        );

        Self {
            transport,
            cache: EtagCache::from_config(&config.cache),
            breakers: BreakerSet::new(config.breaker.clone()),
            config,
        }
    }

    pub fn cache(&self) -> &EtagCache {
        &self.cache
    }

    pub fn breakers(&self) -> &BreakerSet {
        &self.breakers
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue one attempt, gated by the breaker. No retries.
    pub async fn execute(&self, url: &str, options: &RequestOptions) -> FetchResult<Response> {
        let gate = self.admit(url)?;
        let result = self.attempt(url, options, 0).await;
        settle(gate, &result);
        result
    }

    /// Issue a request with timeouts, retries and backoff.
    ///
    /// Returns the last error once the retry budget is spent. Non-retryable
    /// failures and an open breaker return immediately.
    pub async fn fetch_retry(&self, url: &str, options: RequestOptions) -> FetchResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "fetch",
            request_id = %request_id,
            method = %options.get_method(),
            url = %url
        );

        async move {
            let gate = self.admit(url)?;
            let mut policy = options.retry_policy(&self.config.request);
            if gate.as_ref().is_some_and(BreakerPermit::is_probe) {
                policy.max_retries = 0;
            }
            let options = options.with_request_id(&request_id);

            let result = policy
                .run(url, |attempt| self.attempt(url, &options, attempt))
                .await;

            settle(gate, &result);
            result
        }
        .instrument(span)
        .await
    }

    /// GET `url` and parse the body as JSON.
    pub async fn get_json<R: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> FetchResult<R> {
        let response = self.fetch_retry(url, options.method("GET")).await?;
        response.json()
    }

    /// POST `body` as JSON to `url` and parse the response body as JSON.
    pub async fn post_json<B, R>(&self, url: &str, body: &B, options: RequestOptions) -> FetchResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(FetchError::JsonEncode)?;
        let options = options
            .method("POST")
            .header(CONTENT_TYPE.as_str(), "application/json")
            .body(payload);

        let response = self.fetch_retry(url, options).await?;
        response.json()
    }

    fn admit(&self, url: &str) -> FetchResult<Gate> {
        if !self.breakers.enabled() {
            return Ok(None);
        }

        let breaker = self.breakers.for_url(url);
        match breaker.admit() {
            Ok(permit) => Ok(Some(permit)),
            Err(retry_after) => {
                tracing::warn!(
                    url = %url,
                    breaker = %breaker.name(),
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Circuit open, failing fast"
                );
                Err(FetchError::CircuitOpen {
                    url: url.to_string(),
                    retry_after,
                })
            }
        }
    }

    async fn attempt(&self, url: &str, options: &RequestOptions, attempt: u32) -> FetchResult<Response> {
        let started = Instant::now();
        let cached = if self.config.cache.enabled {
            self.cache.get(url)
        } else {
            None
        };

        let request = options.to_outgoing(url, cached.as_ref().map(|entry| entry.etag.as_str()))?;
        let timeout_ms = options.effective_timeout_ms(&self.config.request);

        tracing::debug!(
            url = %url,
            attempt,
            method = %request.method,
            conditional = cached.is_some(),
            timeout_ms,
            "Sending request"
        );

        let result = with_deadline(url, timeout_ms, self.transport.send(request))
            .await
            .and_then(|raw| self.interpret(url, raw));

        metrics::record_attempt(outcome_label(&result), started.elapsed());

        if let Err(e) = &result {
            if e.is_server_error() && self.breakers.enabled() {
                self.breakers.for_url(url).trip();
            }
        }

        result
    }

    fn interpret(&self, url: &str, raw: RawResponse) -> FetchResult<Response> {
        if raw.status == 304 {
            return match self.cache.reconstruct(url) {
                Some(body) => {
                    tracing::debug!(url = %url, bytes = body.len(), "Not modified, served from cache");
                    metrics::record_cache_event("hit");
                    Ok(Response::revalidated(raw.headers, body, url))
                }
                None => {
                    tracing::warn!(url = %url, "304 received with no cached entry");
                    metrics::record_cache_event("miss_304");
                    Err(FetchError::CacheProtocol { url: url.to_string() })
                }
            };
        }

        if !(200..300).contains(&raw.status) {
            return Err(FetchError::HttpStatus {
                status: raw.status,
                url: url.to_string(),
            });
        }

        if self.config.cache.enabled {
            self.store(url, &raw);
        }

        Ok(Response::new(raw.status, raw.headers, raw.body, url))
    }

    fn store(&self, url: &str, raw: &RawResponse) {
        let Some(etag) = raw.headers.get(ETAG).and_then(|v| v.to_str().ok()) else {
            return;
        };
        if etag.is_empty() {
            return;
        }

        // Bytes clones share the buffer; the caller keeps an identical view.
        let body: Bytes = raw.body.clone();
        tracing::debug!(url = %url, etag = %etag, bytes = body.len(), "Caching response");
        self.cache.put(url, etag, body);
        metrics::record_cache_event("store");
    }
}

fn settle(gate: Gate, result: &FetchResult<Response>) {
    let Some(permit) = gate else {
        return;
    };
    let healthy = match result {
        Ok(_) => true,
        Err(e) => !(e.is_server_error() || e.is_timeout() || matches!(e, FetchError::Transport { .. })),
    };
    permit.settle(healthy);
}

fn outcome_label(result: &FetchResult<Response>) -> &'static str {
    match result {
        Ok(res) if res.is_revalidated() => "not_modified",
        Ok(_) => "success",
        Err(FetchError::Timeout { .. }) => "timeout",
        Err(FetchError::HttpStatus { status, .. }) if *status >= 500 => "server_error",
        Err(FetchError::HttpStatus { .. }) => "client_error",
        Err(FetchError::CacheProtocol { .. }) => "cache_protocol",
        Err(_) => "transport_error",
    }
}
