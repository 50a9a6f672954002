//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! client / resilience / cache produce:
//!     → tracing events and a per-call span with request_id
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
