// ── Core error types ──
//
// Errors surfaced by netpulse-core. Request failures are not errors here:
// they travel as `RequestOutcome` values. These cover snapshot validation,
// preference persistence, and configuration.

use thiserror::Error;

use netpulse_api::OutcomeKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("Unknown mode '{value}' (expected 'live' or one of 15m, 30m, 1h, 6h, 12h, 24h, 7d)")]
    InvalidMode { value: String },

    // ── Request errors ───────────────────────────────────────────────
    #[error("Appliance has no data yet: {message}")]
    Waiting { message: String },

    #[error("Request failed ({kind}): {message}")]
    Request { kind: OutcomeKind, message: String },

    // ── Persistence errors ───────────────────────────────────────────
    #[error("Preference store error: {message}")]
    Preferences { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netpulse_api::Error> for CoreError {
    fn from(err: netpulse_api::Error) -> Self {
        match err {
            netpulse_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            netpulse_api::Error::UnsupportedBaseUrl(url) => CoreError::Config {
                message: format!("URL cannot be used as an appliance base: {url}"),
            },
            netpulse_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            netpulse_api::Error::InvalidConfig { field, reason } => CoreError::Config {
                message: format!("{field}: {reason}"),
            },
        }
    }
}

/// Collapse a request outcome into a `Result` for one-shot callers.
///
/// `Waiting` becomes [`CoreError::Waiting`] so callers can tell "no data
/// yet" apart from a failure.
pub fn outcome_into_result<T>(outcome: netpulse_api::RequestOutcome<T>) -> Result<T, CoreError> {
    use netpulse_api::RequestOutcome;

    let kind = outcome.kind();
    match outcome {
        RequestOutcome::Success(value) => Ok(value),
        RequestOutcome::Waiting(message) => Err(CoreError::Waiting { message }),
        other => Err(CoreError::Request {
            kind,
            message: other.describe().unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpulse_api::RequestOutcome;

    #[test]
    fn waiting_is_kept_apart_from_failures() {
        let outcome: RequestOutcome<()> = RequestOutcome::Waiting("warming up".into());
        assert!(matches!(
            outcome_into_result(outcome),
            Err(CoreError::Waiting { .. })
        ));
    }

    #[test]
    fn failures_keep_their_kind() {
        let outcome: RequestOutcome<()> = RequestOutcome::ClientError {
            status: Some(404),
            message: "gone".into(),
        };
        let Err(CoreError::Request { kind, message }) = outcome_into_result(outcome) else {
            panic!("expected request error");
        };
        assert_eq!(kind, OutcomeKind::ClientError);
        assert_eq!(message, "HTTP 404: gone");
    }
}
