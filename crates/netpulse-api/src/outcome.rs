// ── Request outcomes ──
//
// Every request resolves to exactly one `RequestOutcome`. Retry behavior
// is a property of the outcome kind, looked up in a single table.

use std::fmt;

/// Discriminated result of a request.
///
/// `Waiting` is a valid answer (the appliance has no data yet), not a
/// failure. Callers must match exhaustively; nothing here is an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    /// The server answered with data.
    Success(T),
    /// The server has no data yet (e.g. cold start).
    Waiting(String),
    /// The server answered with an error payload, or a malformed body.
    Error(String),
    /// HTTP 429. `retry_after_secs` comes from the `Retry-After` header.
    RateLimited { retry_after_secs: Option<u64> },
    /// Any other 4xx, or a request refused before it was sent.
    ClientError { status: Option<u16>, message: String },
    /// Timeout, connect failure, or HTTP 5xx.
    NetworkFailure(String),
}

/// Data-free tag of a [`RequestOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    Waiting,
    Error,
    RateLimited,
    ClientError,
    NetworkFailure,
}

/// What the client does after an attempt produced a given outcome kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// A final answer from the server. Returned as-is.
    Terminal,
    /// A failure that must not be repeated (throttling, bad request).
    Never,
    /// A transient failure, retried with backoff within the attempt budget.
    Backoff,
}

/// User-facing failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Success or waiting: nothing to report as a failure.
    NotAFailure,
    /// Shown to the user; the next natural poll tick tries again.
    Recoverable,
    /// Shown to the user; no layer retries it.
    NonRetryable,
}

impl OutcomeKind {
    /// The retry table.
    pub const fn retry_policy(self) -> RetryPolicy {
        match self {
            Self::Success | Self::Waiting | Self::Error => RetryPolicy::Terminal,
            Self::RateLimited | Self::ClientError => RetryPolicy::Never,
            Self::NetworkFailure => RetryPolicy::Backoff,
        }
    }

    pub const fn failure_class(self) -> FailureClass {
        match self {
            Self::Success | Self::Waiting => FailureClass::NotAFailure,
            Self::Error | Self::NetworkFailure => FailureClass::Recoverable,
            Self::RateLimited | Self::ClientError => FailureClass::NonRetryable,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Waiting => "waiting",
            Self::Error => "error",
            Self::RateLimited => "rate_limited",
            Self::ClientError => "client_error",
            Self::NetworkFailure => "network_failure",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> RequestOutcome<T> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::Waiting(_) => OutcomeKind::Waiting,
            Self::Error(_) => OutcomeKind::Error,
            Self::RateLimited { .. } => OutcomeKind::RateLimited,
            Self::ClientError { .. } => OutcomeKind::ClientError,
            Self::NetworkFailure(_) => OutcomeKind::NetworkFailure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Transform the success payload, keeping every other variant.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestOutcome<U> {
        self.try_map(|v| Ok(f(v)))
    }

    /// Transform the success payload with a fallible conversion. A failed
    /// conversion becomes [`RequestOutcome::Error`].
    pub fn try_map<U>(self, f: impl FnOnce(T) -> Result<U, String>) -> RequestOutcome<U> {
        match self {
            Self::Success(v) => match f(v) {
                Ok(u) => RequestOutcome::Success(u),
                Err(message) => RequestOutcome::Error(message),
            },
            Self::Waiting(m) => RequestOutcome::Waiting(m),
            Self::Error(m) => RequestOutcome::Error(m),
            Self::RateLimited { retry_after_secs } => {
                RequestOutcome::RateLimited { retry_after_secs }
            }
            Self::ClientError { status, message } => {
                RequestOutcome::ClientError { status, message }
            }
            Self::NetworkFailure(m) => RequestOutcome::NetworkFailure(m),
        }
    }

    /// Human-readable description for non-success outcomes.
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Waiting(m) | Self::Error(m) | Self::NetworkFailure(m) => Some(m.clone()),
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(format!("rate limited, retry after {secs}s")),
            Self::RateLimited {
                retry_after_secs: None,
            } => Some("rate limited".into()),
            Self::ClientError {
                status: Some(status),
                message,
            } => Some(format!("HTTP {status}: {message}")),
            Self::ClientError {
                status: None,
                message,
            } => Some(message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_back_off() {
        let backoff: Vec<OutcomeKind> = [
            OutcomeKind::Success,
            OutcomeKind::Waiting,
            OutcomeKind::Error,
            OutcomeKind::RateLimited,
            OutcomeKind::ClientError,
            OutcomeKind::NetworkFailure,
        ]
        .into_iter()
        .filter(|k| k.retry_policy() == RetryPolicy::Backoff)
        .collect();
        assert_eq!(backoff, vec![OutcomeKind::NetworkFailure]);
    }

    #[test]
    fn throttling_and_client_errors_are_never_retried() {
        assert_eq!(OutcomeKind::RateLimited.retry_policy(), RetryPolicy::Never);
        assert_eq!(OutcomeKind::ClientError.retry_policy(), RetryPolicy::Never);
        assert_eq!(
            OutcomeKind::RateLimited.failure_class(),
            FailureClass::NonRetryable
        );
    }

    #[test]
    fn waiting_is_not_a_failure() {
        assert_eq!(OutcomeKind::Waiting.retry_policy(), RetryPolicy::Terminal);
        assert_eq!(
            OutcomeKind::Waiting.failure_class(),
            FailureClass::NotAFailure
        );
    }

    #[test]
    fn try_map_turns_conversion_failure_into_error() {
        let outcome: RequestOutcome<i32> = RequestOutcome::Success(7);
        let mapped: RequestOutcome<u8> = outcome.try_map(|_| Err("bad row".into()));
        assert_eq!(mapped, RequestOutcome::Error("bad row".into()));
    }

    #[test]
    fn try_map_preserves_failures() {
        let outcome: RequestOutcome<i32> = RequestOutcome::RateLimited {
            retry_after_secs: Some(5),
        };
        let mapped = outcome.map(|v| v * 2);
        assert_eq!(mapped.kind(), OutcomeKind::RateLimited);
        assert_eq!(
            mapped.describe().as_deref(),
            Some("rate limited, retry after 5s")
        );
    }
}
