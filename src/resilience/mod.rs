//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! fetch_retry:
//!     → circuit_breaker.rs (gate once, fail fast while open)
//!     → timeouts.rs (deadline around each attempt)
//!     → On failure: retries.rs (classify, sleep per backoff.rs, try again)
//!     → On status >= 500: circuit_breaker.rs (open for the cooldown)
//! ```
//!
//! # Design Decisions
//! - Every attempt has a deadline
//! - Retries only for timeouts, 429 and 5xx
//! - Breaker state is owned by the client, not a process global

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{Admission, BreakerPermit, BreakerSet, CircuitBreaker};
pub use retries::{AttemptResult, RetryPolicy};
