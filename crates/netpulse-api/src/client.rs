// Request client
//
// Wraps `reqwest::Client` with endpoint URL construction, response
// classification, the retry table, and anti-forgery token injection.
// Endpoint helpers (latest snapshot, history) live in `stats.rs` as
// inherent methods so this module stays focused on transport mechanics.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::models::Envelope;
use crate::outcome::{OutcomeKind, RequestOutcome, RetryPolicy};
use crate::token::{NoToken, TokenProvider};
use crate::transport::TransportConfig;

/// Header carrying the anti-forgery token on mutating requests.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const BODY_PREVIEW_CHARS: usize = 200;
const ENVELOPE_STATUSES: [&str; 4] = ["success", "ok", "waiting", "error"];

// ── Retry configuration ──────────────────────────────────────────────

/// Attempt budget and backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first. Never below 1.
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `backoff_base * n`.
    pub backoff_base: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// HTTP client for the appliance API.
///
/// Every call resolves to a [`RequestOutcome`]; nothing propagates as an
/// `Err` past this boundary. The only state carried between calls is
/// configuration, so the client is cheap to clone and share.
#[derive(Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RequestClient {
    /// Create a client from a base URL and transport config.
    ///
    /// The base URL is the appliance root (e.g. `https://192.168.1.1`);
    /// endpoint paths are joined onto it.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            timeout: transport.timeout,
            retry: RetryConfig::default(),
            tokens: Arc::new(NoToken),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            tokens: Arc::new(NoToken),
        })
    }

    /// Replace the retry configuration. `max_attempts` is clamped to 1.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = RetryConfig {
            max_attempts: retry.max_attempts.max(1),
            backoff_base: retry.backoff_base,
        };
        self
    }

    /// Replace the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Inject the anti-forgery token source for mutating requests.
    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry(&self) -> RetryConfig {
        self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── Request pipeline ─────────────────────────────────────────────

    /// Issue a request and classify the result, retrying transient
    /// failures within the attempt budget.
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        query: &[(&str, String)],
    ) -> RequestOutcome<Value> {
        let url = match self.endpoint_url(endpoint) {
            Ok(url) => url,
            Err(e) => {
                return RequestOutcome::ClientError {
                    status: None,
                    message: format!("invalid endpoint '{endpoint}': {e}"),
                };
            }
        };

        let token = if is_mutating(&method) {
            match self.token_header() {
                Ok(value) => Some(value),
                Err(message) => {
                    warn!(%method, %url, "{message}");
                    return RequestOutcome::ClientError {
                        status: None,
                        message,
                    };
                }
            }
        } else {
            None
        };

        let mut attempt: u32 = 1;
        loop {
            let outcome = self
                .send_once(&url, &method, body, query, token.as_ref())
                .await;
            let kind = outcome.kind();

            if kind.retry_policy() == RetryPolicy::Backoff && attempt < self.retry.max_attempts {
                let delay = self.retry.delay_after(attempt);
                warn!(
                    %method,
                    %url,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    reason = outcome.describe().unwrap_or_default(),
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if kind == OutcomeKind::NetworkFailure {
                warn!(%method, %url, attempts = attempt, "retry budget exhausted");
            } else {
                trace!(%method, %url, attempts = attempt, outcome = %kind, "request finished");
            }
            return outcome;
        }
    }

    /// One attempt: send, read, classify.
    async fn send_once(
        &self,
        url: &Url,
        method: &Method,
        body: Option<&Value>,
        query: &[(&str, String)],
        token: Option<&HeaderValue>,
    ) -> RequestOutcome<Value> {
        debug!("{method} {url}");

        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .timeout(self.timeout);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.header(CSRF_HEADER, token.clone());
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => return self.transport_failure(&e),
        };

        let status = resp.status();
        let retry_after = retry_after_secs(resp.headers());
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return self.transport_failure(&e),
        };

        classify(status, retry_after, &text)
    }

    fn transport_failure(&self, e: &reqwest::Error) -> RequestOutcome<Value> {
        if e.is_timeout() {
            RequestOutcome::NetworkFailure(format!(
                "request timed out after {}ms",
                self.timeout.as_millis()
            ))
        } else if e.is_builder() {
            RequestOutcome::ClientError {
                status: None,
                message: format!("request could not be built: {e}"),
            }
        } else {
            RequestOutcome::NetworkFailure(format!("transport error: {e}"))
        }
    }

    fn token_header(&self) -> Result<HeaderValue, String> {
        let token = self
            .tokens
            .token()
            .ok_or_else(|| "refusing mutating request without anti-forgery token".to_owned())?;
        let mut value = HeaderValue::from_str(token.expose_secret())
            .map_err(|_| "anti-forgery token is not a valid header value".to_owned())?;
        value.set_sensitive(true);
        Ok(value)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join an endpoint path (e.g. `"api/stats/latest"`) onto the base URL.
    pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(endpoint.trim_start_matches('/'))
    }
}

// ── Classification ───────────────────────────────────────────────────

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Map an HTTP status and body onto an outcome.
pub(crate) fn classify(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
) -> RequestOutcome<Value> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RequestOutcome::RateLimited { retry_after_secs };
    }
    if status.is_client_error() {
        let message = error_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("client error")
                .to_owned()
        });
        return RequestOutcome::ClientError {
            status: Some(status.as_u16()),
            message,
        };
    }
    if status.is_server_error() {
        return RequestOutcome::NetworkFailure(format!("HTTP {status}"));
    }
    if !status.is_success() {
        return RequestOutcome::NetworkFailure(format!("unexpected HTTP {status}"));
    }
    classify_payload(body)
}

/// Interpret a 2xx body: status envelope, bare payload, or garbage.
fn classify_payload(body: &str) -> RequestOutcome<Value> {
    if body.trim().is_empty() {
        return RequestOutcome::Success(Value::Null);
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
            return RequestOutcome::Error(format!(
                "malformed response: {e} (body preview: {preview:?})"
            ));
        }
    };

    if !is_envelope(&value) {
        return RequestOutcome::Success(value);
    }

    let envelope: Envelope = match serde_json::from_value(value) {
        Ok(envelope) => envelope,
        Err(e) => return RequestOutcome::Error(format!("malformed status envelope: {e}")),
    };

    match envelope.status.to_ascii_lowercase().as_str() {
        "success" | "ok" => RequestOutcome::Success(envelope.data.unwrap_or(Value::Null)),
        "waiting" => RequestOutcome::Waiting(
            envelope
                .message
                .unwrap_or_else(|| "waiting for data".into()),
        ),
        "error" => RequestOutcome::Error(
            envelope
                .message
                .unwrap_or_else(|| "appliance reported an error".into()),
        ),
        other => RequestOutcome::Error(format!("unknown response status '{other}'")),
    }
}

/// A body is a status envelope only when `status` carries one of the
/// envelope keywords. A bare row may report its own `status` metric.
fn is_envelope(value: &Value) -> bool {
    value
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| {
            ENVELOPE_STATUSES
                .iter()
                .any(|known| status.eq_ignore_ascii_case(known))
        })
}

/// Best-effort message extraction from an error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(String::from)
}

/// Ensure the base URL can carry relative paths and ends with `/`.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(Error::UnsupportedBaseUrl(raw.to_owned()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
