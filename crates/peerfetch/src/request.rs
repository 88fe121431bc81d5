//! Per-request configuration
//!
//! A [`RequestConfig`] is an immutable value handed to the executor for one
//! exchange. Reconfiguring means building a new value; nothing set for one
//! request leaks into the next.

use peerfetch_core::config::consts;
use peerfetch_core::{FetchError, FetchSettings, Result};
use std::time::Duration;
use url::Url;

/// HTTP methods used between peer nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

/// Minimum body transfer rate, measured over consecutive windows
///
/// A transfer whose average rate over one whole window falls below
/// `bytes_per_sec` is aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowSpeedLimit {
    pub bytes_per_sec: u64,
    pub window: Duration,
}

/// Target, method, headers, body and transport options of one request
#[derive(Clone)]
pub struct RequestConfig {
    url: Url,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    timeout: Duration,
    verify_tls: bool,
    basic_auth: Option<(String, String)>,
    bearer_token: Option<String>,
    fail_on_http_error: bool,
    low_speed_limit: Option<LowSpeedLimit>,
}

impl RequestConfig {
    /// Creates a GET request for `url` that fails on HTTP status >= 400
    ///
    /// Literal `%` characters in the URL path are escaped to `%25` before
    /// parsing, because peer file names may legitimately contain them.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the URL is empty, cannot be parsed, or
    /// does not use the `http`/`https` scheme.
    ///
    /// # Example
    ///
    /// ```
    /// use peerfetch::RequestConfig;
    ///
    /// let config = RequestConfig::new("http://peer:8040/seg/idx_0@props%2Emessage.idx").unwrap();
    /// assert!(config.url().as_str().ends_with("idx_0@props%252Emessage.idx"));
    /// ```
    pub fn new(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::InvalidArgument("URL is empty".to_string()));
        }

        let escaped = escape_url_path(url);
        let parsed = Url::parse(&escaped)
            .map_err(|e| FetchError::InvalidArgument(format!("invalid URL '{}': {}", url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidArgument(format!(
                "unsupported URL scheme '{}' in '{}'",
                parsed.scheme(),
                url
            )));
        }

        Ok(Self {
            url: parsed,
            method: Method::Get,
            headers: Vec::new(),
            body: None,
            timeout: Duration::from_millis(consts::http::DEFAULT_TIMEOUT_MS),
            verify_tls: true,
            basic_auth: None,
            bearer_token: None,
            fail_on_http_error: true,
            low_speed_limit: None,
        })
    }

    /// Creates a request whose transport options come from settings
    pub fn from_settings(url: &str, settings: &FetchSettings) -> Result<Self> {
        Ok(Self::new(url)?
            .with_timeout(settings.timeout())
            .with_verify_tls(settings.verify_tls)
            .with_low_speed_limit(settings.low_speed_limit_bytes_per_sec, settings.low_speed_time()))
    }

    /// Derives the request for one file below this request's URL
    ///
    /// The file name is appended as a single path segment; `%`, `/` and other
    /// reserved characters in it are percent-encoded. The query (which peers
    /// use to carry tokens) is kept; the fragment is dropped.
    pub fn join_file(&self, file_name: &str) -> Result<Self> {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::InvalidArgument(format!("URL cannot be a base: {}", self.url))
            })?
            .pop_if_empty()
            .push(file_name);

        let mut joined = self.clone();
        joined.url = url;
        Ok(joined)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a header; repeated names are sent in insertion order
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Sets the `Auth-Token` header used between peer nodes
    pub fn with_auth_token(self, token: impl Into<String>) -> Self {
        self.with_header(consts::http::AUTH_TOKEN_HEADER, token)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whole-exchange timeout; zero disables it
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_fail_on_http_error(mut self, fail_on_http_error: bool) -> Self {
        self.fail_on_http_error = fail_on_http_error;
        self
    }

    /// Aborts the body transfer when it stays below `bytes_per_sec` for a
    /// whole `window`; a zero rate or window disables the check
    pub fn with_low_speed_limit(mut self, bytes_per_sec: u64, window: Duration) -> Self {
        self.low_speed_limit = (bytes_per_sec > 0 && !window.is_zero()).then_some(LowSpeedLimit {
            bytes_per_sec,
            window,
        });
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        self.basic_auth
            .as_ref()
            .map(|(user, password)| (user.as_str(), password.as_str()))
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    pub fn fail_on_http_error(&self) -> bool {
        self.fail_on_http_error
    }

    pub fn low_speed_limit(&self) -> Option<LowSpeedLimit> {
        self.low_speed_limit
    }
}

impl std::fmt::Debug for RequestConfig {
    // Credentials are never printed
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url.as_str())
            .field("method", &self.method)
            .field("headers", &self.headers.len())
            .field("body", &self.body.as_ref().map(Vec::len))
            .field("timeout", &self.timeout)
            .field("verify_tls", &self.verify_tls)
            .field("basic_auth", &self.basic_auth.is_some())
            .field("bearer_token", &self.bearer_token.is_some())
            .field("fail_on_http_error", &self.fail_on_http_error)
            .field("low_speed_limit", &self.low_speed_limit)
            .finish()
    }
}

/// Escapes every literal `%` in the path component of `url` as `%25`
///
/// Scheme, authority, query and fragment are left untouched. Decoding the
/// escaped path once yields the original path text.
///
/// # Example
///
/// ```
/// use peerfetch::escape_url_path;
///
/// assert_eq!(
///     escape_url_path("http://peer/a%2Eb.idx?token=x%20y"),
///     "http://peer/a%252Eb.idx?token=x%20y"
/// );
/// ```
pub fn escape_url_path(url: &str) -> String {
    let authority_start = url.find("://").map_or(0, |i| i + 3);
    let Some(path_start) = url[authority_start..]
        .find(['/', '?', '#'])
        .map(|i| authority_start + i)
        .filter(|&i| url[i..].starts_with('/'))
    else {
        return url.to_string();
    };
    let path_end = url[path_start..]
        .find(['?', '#'])
        .map_or(url.len(), |i| path_start + i);

    let mut escaped = String::with_capacity(url.len() + 8);
    escaped.push_str(&url[..path_start]);
    escaped.push_str(&url[path_start..path_end].replace('%', "%25"));
    escaped.push_str(&url[path_end..]);
    escaped
}
