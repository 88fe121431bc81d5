//! Retrying, streaming HTTP executor for fetching files from peer nodes.
//!
//! This crate provides the blocking request machinery a node uses to pull
//! segment and index files from its peers over plain HTTP.
//!
//! # Architecture
//!
//! - [`request`]: Immutable per-request configuration and URL escaping
//! - [`sink`]: Consumers for streamed response bodies
//! - [`executor`]: Single-shot request execution and response metadata
//! - [`retry`]: Bounded retry around a caller-supplied unit of work
//! - [`download`]: Streaming a response body into a local file
//! - [`sync`]: Reconciling a local directory against an expected file set
//!
//! # Request Flow
//!
//! ```text
//! RequestConfig::new(url)
//!     ↓
//! HttpClient::execute_into(&config, sink)
//!     → send request (one exchange, no silent retry)
//!     → record status / length / type / checksum
//!     → fail on status >= 400 (unless disabled)
//!     → stream body chunks into the sink
//!     ↓
//! execute_with_retry(&policy, |client| ...)   (optional)
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use peerfetch::{HttpClient, RequestConfig, RetryPolicy};
//! use std::time::Duration;
//!
//! # fn main() -> peerfetch::Result<()> {
//! let policy = RetryPolicy::new(3, Duration::from_secs(1));
//! let mut client = HttpClient::new();
//!
//! client.execute_with_retry(&policy, |client| {
//!     let config = RequestConfig::new("http://10.0.0.7:8040/api/_tablet/_download?file=seg_0.dat")?;
//!     client.download(&config, "/data/snapshot/seg_0.dat").map(|_| ())
//! })?;
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod client;
pub mod download;
pub mod executor;
pub mod request;
pub mod retry;
pub mod sink;
pub mod sync;

// Re-export commonly used types
pub use executor::{ExecutionResult, HttpClient};
pub use peerfetch_core::{ErrorKind, FetchError, FetchSettings};
pub use request::{LowSpeedLimit, Method, RequestConfig, escape_url_path};
pub use retry::{RetryPolicy, execute_with_retry};
pub use sink::{ChunkCallback, Discard, ResponseSink, WriteSink};
pub use sync::SyncReport;

// Type alias for convenience
pub type Result<T> = peerfetch_core::Result<T>;
