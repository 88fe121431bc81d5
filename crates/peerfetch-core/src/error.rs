use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Coarse failure classes reported to callers.
///
/// Every [`FetchError`] variant maps onto exactly one kind, so callers can
/// branch on the class of failure without matching individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad caller input (URL, retry count, settings document)
    InvalidArgument,
    /// Connection, DNS, timeout, TLS or consumer-aborted transfer
    NetworkError,
    /// Remote returned a status >= 400 while fail-on-error was set
    HttpStatusError,
    /// Malformed or missing response metadata, local I/O failures
    InternalError,
    /// Received byte count disagrees with the advertised length
    DataCorruption,
}

#[derive(Error, Debug)]
pub enum FetchError {
    // Caller errors
    #[error("INVALID_ARGUMENT: {0}")]
    InvalidArgument(String),

    // Transport errors
    #[error("NETWORK_ERROR: {url}: {message}")]
    Network { url: String, message: String },

    #[error("NETWORK_ERROR: {url}: transfer aborted by consumer")]
    Aborted { url: String },

    #[error("NETWORK_ERROR: {url}: {message}")]
    Timeout { url: String, message: String },

    #[error(
        "NETWORK_ERROR: {url}: transfer speed {rate} B/s stayed below {limit} B/s for {}ms",
        window.as_millis()
    )]
    TooSlow {
        url: String,
        rate: u64,
        limit: u64,
        window: Duration,
    },

    #[error("HTTP_STATUS_ERROR: {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    // Response metadata errors
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),

    // Local filesystem errors
    #[error("INTERNAL_ERROR: I/O error during {operation} on {}: {source}", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Integrity errors
    #[error(
        "DATA_CORRUPTION: {}: server advertised {expected} bytes, received {actual}",
        path.display()
    )]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FetchError::Network { .. }
            | FetchError::Aborted { .. }
            | FetchError::Timeout { .. }
            | FetchError::TooSlow { .. } => ErrorKind::NetworkError,
            FetchError::HttpStatus { .. } => ErrorKind::HttpStatusError,
            FetchError::Internal(_) | FetchError::Io { .. } => ErrorKind::InternalError,
            FetchError::SizeMismatch { .. } => ErrorKind::DataCorruption,
        }
    }

    /// Wraps a local filesystem failure with the operation and path involved
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            FetchError::InvalidArgument("empty url".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            FetchError::Aborted {
                url: "http://peer/a".into()
            }
            .kind(),
            ErrorKind::NetworkError
        );
        assert_eq!(
            FetchError::Timeout {
                url: "http://peer/a".into(),
                message: "body read".into()
            }
            .kind(),
            ErrorKind::NetworkError
        );
        assert_eq!(
            FetchError::TooSlow {
                url: "http://peer/a".into(),
                rate: 10,
                limit: 1024,
                window: Duration::from_secs(30)
            }
            .kind(),
            ErrorKind::NetworkError
        );
        assert_eq!(
            FetchError::HttpStatus {
                url: "http://peer/a".into(),
                status: 404
            }
            .kind(),
            ErrorKind::HttpStatusError
        );
        assert_eq!(
            FetchError::io("write", "/tmp/x", std::io::Error::other("disk full")).kind(),
            ErrorKind::InternalError
        );
        assert_eq!(
            FetchError::SizeMismatch {
                path: "/tmp/x".into(),
                expected: 10,
                actual: 4
            }
            .kind(),
            ErrorKind::DataCorruption
        );
    }

    #[test]
    fn test_display_carries_code_prefix() {
        let err = FetchError::HttpStatus {
            url: "http://peer/seg.dat".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "HTTP_STATUS_ERROR: http://peer/seg.dat returned status 503"
        );

        let err = FetchError::SizeMismatch {
            path: "/data/seg.dat".into(),
            expected: 100,
            actual: 42,
        };
        assert!(err.to_string().starts_with("DATA_CORRUPTION: /data/seg.dat"));
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("42"));

        let err = FetchError::TooSlow {
            url: "http://peer/seg.dat".into(),
            rate: 12,
            limit: 1024,
            window: Duration::from_millis(1500),
        };
        assert_eq!(
            err.to_string(),
            "NETWORK_ERROR: http://peer/seg.dat: transfer speed 12 B/s stayed below 1024 B/s for 1500ms"
        );
    }

    #[test]
    fn test_io_error_exposes_source() {
        use std::error::Error as _;

        let err = FetchError::io(
            "create staging file",
            "/data/seg.dat",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("create staging file"));
    }
}
