//! Resilient HTTP request layer.
//!
//! A fetch client that adds per-attempt timeouts, bounded retries with
//! exponential backoff and jitter, a circuit breaker, and ETag-based
//! conditional requests on top of reqwest.
//!
//! ```no_run
//! use resilient_fetch::{ClientConfig, HttpClient, RequestOptions};
//!
//! # async fn demo() -> Result<(), resilient_fetch::FetchError> {
//! let client = HttpClient::new(ClientConfig::default())?;
//! let flags: serde_json::Value = client
//!     .get_json("https://api.example.com/flags", RequestOptions::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod observability;
pub mod resilience;

pub use cache::{CacheEntry, EtagCache};
pub use client::HttpClient;
pub use config::ClientConfig;
pub use error::{FetchError, FetchResult};
pub use http::{RequestOptions, Response};
pub use net::{ReqwestTransport, Transport};
