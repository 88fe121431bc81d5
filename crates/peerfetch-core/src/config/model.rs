use super::consts;
use crate::error::{FetchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// `[http]` table of the node configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Abort a body transfer slower than this; 0 disables the check
    #[serde(default = "default_low_speed_limit")]
    pub low_speed_limit_bytes_per_sec: u64,
    #[serde(default = "default_low_speed_time_ms")]
    pub low_speed_time_ms: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// Whole-document view; only the `[http]` table is read
#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    http: FetchSettings,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            verify_tls: default_verify_tls(),
            user_agent: default_user_agent(),
            low_speed_limit_bytes_per_sec: default_low_speed_limit(),
            low_speed_time_ms: default_low_speed_time_ms(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl FetchSettings {
    /// Parses the `[http]` table out of a TOML document
    ///
    /// A missing table or missing keys fall back to the defaults in
    /// [`consts`](super::consts).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the document is not valid TOML or a key
    /// has the wrong type.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let document: Document = toml::from_str(source)
            .map_err(|e| FetchError::InvalidArgument(format!("invalid settings: {}", e)))?;
        Ok(document.http)
    }

    /// Reads and parses a settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| FetchError::io("read settings file", path, e))?;
        Self::from_toml_str(&source)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_millis(self.low_speed_time_ms)
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_timeout_ms() -> u64 {
    consts::http::DEFAULT_TIMEOUT_MS
}

fn default_verify_tls() -> bool {
    true
}

fn default_user_agent() -> String {
    consts::http::DEFAULT_USER_AGENT.to_string()
}

fn default_low_speed_limit() -> u64 {
    consts::http::DEFAULT_LOW_SPEED_LIMIT_BYTES_PER_SEC
}

fn default_low_speed_time_ms() -> u64 {
    consts::http::DEFAULT_LOW_SPEED_TIME_MS
}

fn default_max_attempts() -> u32 {
    consts::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_delay_ms() -> u64 {
    consts::retry::DEFAULT_DELAY_MS
}
