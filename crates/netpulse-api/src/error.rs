use thiserror::Error;

/// Construction-time errors for the `netpulse-api` crate.
///
/// Request calls never surface these: once a [`RequestClient`](crate::RequestClient)
/// exists, every call resolves to a [`RequestOutcome`](crate::RequestOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry relative endpoint paths (e.g. `mailto:`).
    #[error("URL cannot be used as an API base: {0}")]
    UnsupportedBaseUrl(String),

    /// TLS certificate loading or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A client setting is out of range.
    #[error("Invalid {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}
