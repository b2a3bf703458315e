//! Thin JSON client for the lookup APIs.

use crate::error::LookupError;
use crate::record::LookupRecord;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout. The remote APIs give no guarantee of their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded retry for transport failures only.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay before the n-th retry is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retry.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// A REST client bound to one API base URL and a set of default headers.
///
/// Cloning is cheap; clones share the underlying connection pool, so every
/// background worker can own its own handle.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, config: ClientConfig) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LookupError::Build)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: HeaderMap::new(),
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns a clone that sends `name: value` with every request.
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, LookupError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| LookupError::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| LookupError::InvalidHeader(name.to_string()))?;

        let mut client = self.clone();
        client.headers.insert(name, value);
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET {base}/{path}` and decode the JSON body.
    pub async fn get(&self, path: &str) -> Result<Value, LookupError> {
        let url = self.url(path);
        self.send(|| self.http.get(&url)).await
    }

    /// `POST {base}/{path}` with a JSON body and decode the JSON response.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, LookupError> {
        let url = self.url(path);
        self.send(|| self.http.post(&url).json(body)).await
    }

    /// GET a `{success, data}` envelope and return `data` as a record.
    ///
    /// Every failure (transport, content type, `success: false`) is logged and
    /// turned into an empty record.
    pub async fn get_data(&self, path: &str) -> LookupRecord {
        match self.get(path).await.and_then(require_success) {
            Ok(mut body) => LookupRecord::from_value(body["data"].take()),
            Err(e) => {
                debug!("GET {} yielded no data: {}", path, e);
                LookupRecord::empty()
            }
        }
    }

    async fn send<F>(&self, build: F) -> Result<Value, LookupError>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.send_once(build()).await {
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!("Request attempt {}/{} failed: {}", attempt, attempts, e);
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn send_once(&self, request: RequestBuilder) -> Result<Value, LookupError> {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(LookupError::Transport)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_json(&content_type) {
            return Err(LookupError::ContentType {
                status,
                content_type,
            });
        }

        let body = response.bytes().await.map_err(LookupError::Transport)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn is_json(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

/// Passes the body through when it carries `success: true`.
pub fn require_success(body: Value) -> Result<Value, LookupError> {
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }

    let cause = body
        .get("cause")
        .and_then(Value::as_str)
        .unwrap_or("success flag not set")
        .to_string();
    Err(LookupError::Rejected(cause))
}
