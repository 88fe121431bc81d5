//! Single-shot request execution
//!
//! [`HttpClient`] performs exactly one network exchange per call and never
//! retries on its own. It keeps one transport handle for connection reuse and
//! the metadata of the most recent response for the getters below. An
//! instance is not meant to be shared between threads; use one per worker.

use crate::client::build_transport;
use crate::request::{LowSpeedLimit, Method, RequestConfig};
use crate::sink::{ChunkCallback, Discard, ResponseSink};
use peerfetch_core::config::consts;
use peerfetch_core::{FetchError, FetchSettings, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use std::io::{self, Read};
use std::time::Instant;
use tracing::debug;

/// Metadata of one response, replaced on every execution
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    pub http_status: u16,
    /// Advertised body length; `None` when absent or not a valid length
    pub content_length: Option<u64>,
    pub content_type: String,
    pub content_checksum: Option<String>,
}

#[derive(Debug)]
pub struct HttpClient {
    user_agent: String,
    transport: Option<(bool, Client)>,
    last: Option<ExecutionResult>,
    raw_content_length: Option<String>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates an executor; the transport is built on first use
    pub fn new() -> Self {
        Self {
            user_agent: consts::http::DEFAULT_USER_AGENT.to_string(),
            transport: None,
            last: None,
            raw_content_length: None,
        }
    }

    pub fn with_settings(settings: &FetchSettings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            ..Self::new()
        }
    }

    /// Performs the exchange and drains the body without keeping it
    ///
    /// # Errors
    ///
    /// - `HttpStatusError` if the status is >= 400 and fail-on-error is set
    /// - `NetworkError` for connection, DNS, TLS and timeout failures
    pub fn execute(&mut self, config: &RequestConfig) -> Result<()> {
        self.execute_into(config, &mut Discard)
    }

    /// Performs the exchange and appends the body to `response`
    pub fn execute_collect(&mut self, config: &RequestConfig, response: &mut Vec<u8>) -> Result<()> {
        self.execute_into(config, response)
    }

    /// Performs the exchange, handing each chunk to `callback`
    ///
    /// Returning `false` from the callback aborts the transfer, which is
    /// reported as a `NetworkError`.
    pub fn execute_with<F>(&mut self, config: &RequestConfig, callback: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> bool,
    {
        self.execute_into(config, &mut ChunkCallback(callback))
    }

    /// Performs one exchange, streaming the body into `sink`
    ///
    /// Response metadata is recorded as soon as headers arrive, so the
    /// getters work even when the call fails on status or mid-body.
    pub fn execute_into(&mut self, config: &RequestConfig, sink: &mut dyn ResponseSink) -> Result<()> {
        self.last = None;
        self.raw_content_length = None;

        let url = config.url().as_str();
        let client = self.transport(config.verify_tls())?;

        let mut request = client.request(config.method().into(), config.url().clone());
        if !config.timeout().is_zero() {
            request = request.timeout(config.timeout());
        }
        for (name, value) in config.headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some((user, password)) = config.basic_auth() {
            request = request.basic_auth(user, Some(password));
        }
        if let Some(token) = config.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = config.body() {
            request = request.body(body.to_vec());
        }

        let mut response = request.send().map_err(|e| send_error(url, &e))?;
        self.record(&response);

        let status = response.status().as_u16();
        debug!(method = config.method().as_str(), url, status, "peer request answered");

        if config.fail_on_http_error() && status >= 400 {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }
        if config.method() == Method::Head {
            return Ok(());
        }

        let received = stream_body(url, &mut response, sink, config.low_speed_limit())?;
        debug!(url, received, "response body consumed");
        Ok(())
    }

    /// Issues `config` as a HEAD request
    pub fn head(&mut self, config: &RequestConfig) -> Result<()> {
        let config = config.clone().with_method(Method::Head);
        self.execute(&config)
    }

    /// POSTs `payload` and returns the response body as text
    pub fn execute_post_request(
        &mut self,
        config: &RequestConfig,
        payload: impl Into<Vec<u8>>,
    ) -> Result<String> {
        let config = config.clone().with_method(Method::Post).with_body(payload);
        self.execute_text(&config)
    }

    /// Sends a DELETE with `payload` and returns the response body as text
    pub fn execute_delete_request(
        &mut self,
        config: &RequestConfig,
        payload: impl Into<Vec<u8>>,
    ) -> Result<String> {
        let config = config.clone().with_method(Method::Delete).with_body(payload);
        self.execute_text(&config)
    }

    fn execute_text(&mut self, config: &RequestConfig) -> Result<String> {
        let mut response = Vec::new();
        self.execute_collect(config, &mut response)?;
        String::from_utf8(response).map_err(|e| {
            FetchError::Internal(format!(
                "response from {} is not valid UTF-8: {}",
                config.url(),
                e
            ))
        })
    }

    /// Metadata of the last response, if one arrived
    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last.as_ref()
    }

    /// Status of the last response; 0 if no response arrived
    pub fn get_http_status(&self) -> u16 {
        self.last.as_ref().map_or(0, |r| r.http_status)
    }

    /// Advertised length of the last response
    ///
    /// # Errors
    ///
    /// Returns `InternalError` if the header is absent, unparsable or
    /// negative. A missing length is never reported as zero.
    pub fn get_content_length(&self) -> Result<u64> {
        let raw = self.raw_content_length.as_deref().ok_or_else(|| {
            FetchError::Internal(
                "failed to get content length: response carries no Content-Length".to_string(),
            )
        })?;
        let value: i64 = raw.trim().parse().map_err(|_| {
            FetchError::Internal(format!(
                "failed to get content length: invalid Content-Length '{}'",
                raw
            ))
        })?;
        u64::try_from(value).map_err(|_| {
            FetchError::Internal(format!(
                "failed to get content length, it should be a non-negative value, actual is: {}",
                value
            ))
        })
    }

    /// Content-integrity header of the last response, if present
    pub fn get_content_checksum(&self) -> Option<&str> {
        self.last
            .as_ref()
            .and_then(|r| r.content_checksum.as_deref())
    }

    /// Content type of the last response; empty when unknown
    pub fn get_content_type(&self) -> &str {
        self.last.as_ref().map_or("", |r| r.content_type.as_str())
    }

    fn transport(&mut self, verify_tls: bool) -> Result<Client> {
        if let Some((verify, client)) = &self.transport
            && *verify == verify_tls
        {
            return Ok(client.clone());
        }

        let client = build_transport(&self.user_agent, verify_tls).map_err(|e| {
            FetchError::Internal(format!("failed to build HTTP transport: {}", describe(&e)))
        })?;
        self.transport = Some((verify_tls, client.clone()));
        Ok(client)
    }

    fn record(&mut self, response: &Response) {
        let headers = response.headers();
        let raw_content_length = header_text(headers, CONTENT_LENGTH.as_str());
        let content_length = raw_content_length
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok());

        self.last = Some(ExecutionResult {
            http_status: response.status().as_u16(),
            content_length,
            content_type: header_text(headers, CONTENT_TYPE.as_str()).unwrap_or_default(),
            content_checksum: header_text(headers, consts::http::CONTENT_CHECKSUM_HEADER),
        });
        self.raw_content_length = raw_content_length;
    }
}

/// Copies the body into `sink` chunk by chunk, returning the bytes received
///
/// The low-speed check runs whenever a read returns, so a peer that stalls
/// completely is only cut off by the request timeout.
pub(crate) fn stream_body(
    url: &str,
    body: &mut impl Read,
    sink: &mut dyn ResponseSink,
    low_speed: Option<LowSpeedLimit>,
) -> Result<u64> {
    let mut buffer = vec![0u8; consts::http::READ_BUFFER_BYTES];
    let mut received = 0u64;
    let mut monitor = low_speed.map(|limit| SpeedMonitor::new(limit, Instant::now()));

    loop {
        let bytes_read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(url, received, &e)),
        };

        received += bytes_read as u64;
        if sink.accept(&buffer[..bytes_read]).is_break() {
            return Err(FetchError::Aborted {
                url: url.to_string(),
            });
        }

        if let Some(monitor) = monitor.as_mut()
            && let Some(rate) = monitor.record(bytes_read as u64, Instant::now())
        {
            return Err(FetchError::TooSlow {
                url: url.to_string(),
                rate,
                limit: monitor.limit.bytes_per_sec,
                window: monitor.limit.window,
            });
        }
    }

    Ok(received)
}

/// Tracks the body transfer rate over consecutive windows
struct SpeedMonitor {
    limit: LowSpeedLimit,
    window_start: Instant,
    window_bytes: u64,
}

impl SpeedMonitor {
    fn new(limit: LowSpeedLimit, now: Instant) -> Self {
        Self {
            limit,
            window_start: now,
            window_bytes: 0,
        }
    }

    /// Adds `bytes` received at `now`; returns the rate of a window that
    /// completed below the limit
    fn record(&mut self, bytes: u64, now: Instant) -> Option<u64> {
        self.window_bytes += bytes;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.limit.window {
            return None;
        }

        let rate = (u128::from(self.window_bytes) * 1000 / elapsed.as_millis().max(1)) as u64;
        if rate < self.limit.bytes_per_sec {
            return Some(rate);
        }
        self.window_start = now;
        self.window_bytes = 0;
        None
    }
}

fn read_error(url: &str, received: u64, err: &io::Error) -> FetchError {
    if is_timeout(err) {
        FetchError::Timeout {
            url: url.to_string(),
            message: format!(
                "timed out reading response body after {} bytes: {}",
                received,
                describe(err)
            ),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: format!(
                "failed to read response body after {} bytes: {}",
                received,
                describe(err)
            ),
        }
    }
}

/// Body reads report transport failures as an `io::Error` wrapping the
/// `reqwest::Error`
fn is_timeout(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::TimedOut
        || err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout)
}

fn send_error(url: &str, err: &reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::InvalidArgument(format!("invalid request for {}: {}", url, describe(err)))
    } else if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            message: describe(err),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: describe(err),
        }
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// Flattens an error and its sources into one line
///
/// A cause that reads the same as the layer above it is skipped.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut previous = err.to_string();
    let mut message = previous.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if text != previous {
            message.push_str(": ");
            message.push_str(&text);
        }
        previous = text;
        source = cause.source();
    }
    message
}
