use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const SUMMARY_TIMEOUT_MS: u64 = 180_000;

const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout_ms: u64,
    /// When set, a 404 is returned as [`Fetched::NotFound`] instead of an error.
    pub is_404_expected: bool,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: Vec::new(),
            body: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            is_404_expected: false,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            headers: Vec::new(),
            body: Some(body),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            is_404_expected: false,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn expect_404(mut self) -> Self {
        self.is_404_expected = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Body(String),
    NotFound,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("connection failed: {0}")]
    Network(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::Status { status: 404, .. })
    }
}

pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<Fetched, TransportError>;

    /// Send and parse the body as JSON; `Ok(None)` only for an expected 404.
    fn send_json(&self, request: &HttpRequest) -> Result<Option<Value>, TransportError> {
        match self.send(request)? {
            Fetched::NotFound => Ok(None),
            Fetched::Body(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|err| TransportError::Decode(err.to_string())),
        }
    }
}

/// Blocking reqwest transport; one client reused across requests.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("thread-digest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self { client })
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| TransportError::Network(format!("invalid header name {name}: {err}")))?;
        let value = HeaderValue::from_str(value.trim()).map_err(|err| {
            TransportError::Network(format!("invalid header value for {name}: {err}"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

fn clip(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push('…');
    out
}

impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<Fetched, TransportError> {
        let mut headers = header_map(&request.headers)?;
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        let mut builder = builder.timeout(Duration::from_millis(request.timeout_ms));
        if let Some(body) = &request.body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            builder = builder.body(body.to_string());
        }

        let response = builder.headers(headers).send().map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout {
                    url: request.url.clone(),
                    timeout_ms: request.timeout_ms,
                }
            } else {
                TransportError::Network(err.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 404 && request.is_404_expected {
            return Ok(Fetched::NotFound);
        }
        let text = response.text().map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout {
                    url: request.url.clone(),
                    timeout_ms: request.timeout_ms,
                }
            } else {
                TransportError::Decode(err.to_string())
            }
        })?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: clip(&text),
            });
        }
        Ok(Fetched::Body(text))
    }
}
