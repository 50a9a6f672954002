//! HTTP request/response types.
//!
//! # Data Flow
//! ```text
//! caller
//!     → request.rs (RequestOptions, resolved against client defaults)
//!     → [client: breaker gate, cache lookup, transport, deadline]
//!     → response.rs (buffered Response, possibly revalidated from cache)
//!     → caller
//! ```

pub mod request;
pub mod response;

pub use request::{RequestOptions, X_REQUEST_ID};
pub use response::Response;
