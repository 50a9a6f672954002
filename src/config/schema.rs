//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for an `HttpClient`.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request defaults (timeout, retries, backoff).
    pub request: RequestDefaults,

    /// Circuit breaker settings.
    pub breaker: BreakerConfig,

    /// ETag cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Defaults applied when a call does not override them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RequestDefaults {
    /// Per-attempt deadline in milliseconds.
    pub timeout_ms: u64,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub backoff_base_ms: u64,

    /// Upper bound (exclusive) of the random jitter added to each backoff.
    pub jitter_ms: u64,

    /// User-Agent sent by the reqwest transport.
    pub user_agent: String,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 2,
            backoff_base_ms: 300,
            jitter_ms: 50,
            user_agent: concat!("resilient-fetch/", env!("CARGO_PKG_VERSION")).to_string(),
            system_proxy: true,
        }
    }
}

/// Which requests share a breaker.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    /// One breaker for every URL.
    #[default]
    Global,
    /// One breaker per `host:port`.
    PerHost,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Enable the breaker.
    pub enabled: bool,

    /// How long the breaker stays open after a server error, in milliseconds.
    pub cooldown_ms: u64,

    /// Breaker granularity.
    pub scope: BreakerScope,

    /// Admit a single probe after the cooldown instead of closing outright.
    pub half_open: bool,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_ms: 2000,
            scope: BreakerScope::Global,
            half_open: false,
        }
    }
}

/// ETag cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Send conditional requests and store ETagged bodies.
    pub enabled: bool,

    /// Bound on cached URLs; unset means unbounded.
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}
