//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! outgoing request
//!     → etag.rs lookup → If-None-Match header
//! 200 + ETag
//!     → etag.rs store {etag, body}
//! 304 Not Modified
//!     → etag.rs reconstruct → synthesized 200
//! ```

pub mod etag;

pub use etag::{CacheEntry, EtagCache};
