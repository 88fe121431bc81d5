// Core modules
pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{FetchSettings, RetrySettings};
pub use error::{ErrorKind, FetchError, Result};
