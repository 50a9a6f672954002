//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! OutgoingRequest (method, url, headers, body)
//!     → transport.rs (Transport trait; reqwest by default)
//!     → RawResponse (status, headers, buffered body)
//! ```
//!
//! # Design Decisions
//! - The client is generic over `Transport` so tests can script responses
//! - No retry, cache or breaker logic lives here

pub mod transport;

pub use transport::{OutgoingRequest, RawResponse, ReqwestTransport, Transport};
