//! HTTP resilience client.
//!
//! One `HttpClient` is built per pipeline run and shared read-only by every
//! fetcher (it is `Send + Sync`; the underlying reqwest client keeps one
//! connection pool). Each call:
//!
//! - injects credentials by URL pattern (query key, header, or basic auth)
//! - retries failed attempts with capped exponential backoff, sleeping only the
//!   calling thread
//! - reports the final failure as a [`FetchError`] carrying the URL without its
//!   query string, so secrets never reach logs or error messages

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::Credentials;
use crate::data::retry::RetryPolicy;
use crate::error::FetchError;

const DEFAULT_ACCEPT: &str = "application/json, text/csv, */*";
const MAX_REDIRECTS: usize = 5;

/// A fully prepared GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub basic_auth: Option<(String, String)>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

/// Transport-level failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
    retryable: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retryable(&self) -> bool {
        self.retryable
    }
}

/// Executes one attempt. Implementations must be safe to share across threads.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Permanent {
                url: "<client>".to_string(),
                reason: e.without_url().to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.query)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((user, pass)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(pass));
        }

        // `without_url` keeps query-string credentials out of the message.
        let response = builder.send().map_err(|e| {
            let e = e.without_url();
            if e.is_builder() {
                TransportError::non_retryable(format!("invalid request: {e}"))
            } else if e.is_timeout() {
                TransportError::new(format!("request timeout: {e}"))
            } else if e.is_connect() {
                TransportError::new(format!("connection failed: {e}"))
            } else {
                TransportError::new(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("Unknown error").to_string();
        let body = response
            .text()
            .map_err(|e| TransportError::new(format!("failed to read response body: {}", e.without_url())))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    credentials: Credentials,
    user_agent: Option<String>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("retry", &self.retry)
            .field("credentials", &self.credentials)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Client backed by reqwest.
    pub fn new(retry: RetryPolicy, credentials: Credentials) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(retry.connect_timeout)?;
        Ok(Self::with_transport(Arc::new(transport), retry, credentials))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, retry: RetryPolicy, credentials: Credentials) -> Self {
        Self {
            transport,
            retry,
            credentials,
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent.filter(|ua| !ua.trim().is_empty());
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// GET `url` with retries; returns the body of the first successful attempt.
    pub fn fetch(&self, url: &str, params: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError> {
        let request = self.prepare(url, params, headers);
        let shown = redact_url(url);
        let mut last_status = None;
        let mut last_reason = String::new();

        for attempt in 1..=self.retry.max_attempts.max(1) {
            if self.retry.deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(FetchError::DeadlineExceeded { url: shown });
            }

            match self.transport.execute(&request) {
                Ok(resp) if RetryPolicy::is_success(resp.status) => {
                    debug!(url = %shown, attempt, status = resp.status, "request succeeded");
                    return Ok(resp);
                }
                Ok(resp) => {
                    last_status = Some(resp.status);
                    last_reason = format!("status {}: {}", resp.status, resp.reason);
                }
                Err(err) if !err.retryable() => {
                    return Err(FetchError::Permanent {
                        url: shown,
                        reason: err.message().to_string(),
                    });
                }
                Err(err) => {
                    last_status = None;
                    last_reason = err.message().to_string();
                }
            }

            if attempt < self.retry.max_attempts {
                let delay = self.retry.delay_after(attempt);
                if self.retry.would_exceed_deadline(delay) {
                    return Err(FetchError::DeadlineExceeded { url: shown });
                }
                warn!(url = %shown, attempt, delay_ms = delay.as_millis() as u64, reason = %last_reason, "request failed; retrying");
                std::thread::sleep(delay);
            }
        }

        Err(FetchError::Transient {
            url: shown,
            attempts: self.retry.max_attempts.max(1),
            status: last_status,
            reason: last_reason,
        })
    }

    /// GET and parse a JSON body.
    pub fn get_json(&self, url: &str, params: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<serde_json::Value, FetchError> {
        let resp = self.fetch(url, params, headers)?;
        serde_json::from_str(&resp.body)
            .map_err(|e| FetchError::shape(redact_url(url), format!("invalid JSON body: {e}")))
    }

    /// GET a text (CSV) body.
    pub fn get_text(&self, url: &str, params: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<String, FetchError> {
        self.fetch(url, params, headers).map(|resp| resp.body)
    }

    /// Merge caller params/headers with default headers and URL-matched credentials.
    fn prepare(&self, url: &str, params: &[(&str, &str)], headers: &[(&str, &str)]) -> HttpRequest {
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut merged = BTreeMap::new();
        merged.insert("accept".to_string(), DEFAULT_ACCEPT.to_string());
        if let Some(ua) = &self.user_agent {
            merged.insert("user-agent".to_string(), ua.clone());
        }
        for (k, v) in headers {
            merged.insert(k.to_ascii_lowercase(), v.to_string());
        }

        let lower = url.to_ascii_lowercase();
        if let Some(key) = &self.credentials.data_gov_api_key {
            if lower.contains("api.data.gov") && !query.iter().any(|(k, _)| k == "api_key") {
                query.push(("api_key".to_string(), key.clone()));
            }
        }
        if let Some(key) = &self.credentials.flightaware_api_key {
            if lower.contains("flightaware") {
                merged.entry("x-apikey".to_string()).or_insert_with(|| key.clone());
            }
        }
        let basic_auth = match &self.credentials.opensky {
            Some(pair) if lower.contains("opensky-network.org") => Some(pair.clone()),
            _ => None,
        };

        HttpRequest {
            url: url.to_string(),
            query,
            headers: merged,
            basic_auth,
            timeout: self.retry.timeout,
        }
    }
}

/// URL with any query string removed, safe to log.
pub fn redact_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}
