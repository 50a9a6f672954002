//! Transport seam between the client and the network.
//!
//! # Responsibilities
//! - Send one request and read the full body
//! - Map connection and read failures to `FetchError::Transport`
//!
//! # Design Decisions
//! - The body is read inside `send` so the caller's deadline covers it
//! - Dropping the `send` future aborts the request
//! - Redirects and connection pooling are left to reqwest

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::future::Future;
use std::time::Duration;

use crate::config::schema::RequestDefaults;
use crate::error::{FetchError, FetchResult};

/// A request ready for the wire.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Status, headers and fully buffered body of one exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Anything that can perform a single HTTP exchange.
pub trait Transport: Send + Sync {
    fn send(&self, request: OutgoingRequest) -> impl Future<Output = FetchResult<RawResponse>> + Send;
}

/// Transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_defaults(defaults: &RequestDefaults) -> FetchResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(defaults.user_agent.as_str())
            .connect_timeout(Duration::from_millis(defaults.timeout_ms));
        if !defaults.system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::new(client))
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_builder() {
        FetchError::InvalidRequest(format!("{}: {}", url, e))
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> FetchResult<RawResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&request.url, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&request.url, e))?;

        Ok(RawResponse { status, headers, body })
    }
}
