//! Default values shared by the settings model and the executor

/// Transport defaults
pub mod http {
    /// Whole-exchange timeout in milliseconds (30 seconds)
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    /// User agent sent with every request
    pub const DEFAULT_USER_AGENT: &str = "peerfetch";

    /// Size of the read buffer used when streaming a response body (16 KiB)
    pub const READ_BUFFER_BYTES: usize = 16 * 1024;

    /// Response header carrying the content-integrity digest
    pub const CONTENT_CHECKSUM_HEADER: &str = "Content-MD5";

    /// Header used for token authentication between peer nodes
    pub const AUTH_TOKEN_HEADER: &str = "Auth-Token";

    /// Minimum body transfer rate; 0 disables the low-speed abort
    pub const DEFAULT_LOW_SPEED_LIMIT_BYTES_PER_SEC: u64 = 0;

    /// Window over which the low-speed limit is measured (5 minutes)
    pub const DEFAULT_LOW_SPEED_TIME_MS: u64 = 300_000;
}

/// Retry defaults
pub mod retry {
    /// Attempts made before giving up
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Pause between two attempts in milliseconds
    pub const DEFAULT_DELAY_MS: u64 = 1_000;
}
