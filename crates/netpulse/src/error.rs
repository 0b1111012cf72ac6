//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use netpulse_config::ConfigError;
use netpulse_core::{CoreError, OutcomeKind};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const WAITING: i32 = 4;
    pub const RATE_LIMITED: i32 = 5;
    pub const CONFIG: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Appliance responses ──────────────────────────────────────────

    #[error("The appliance has no data yet: {message}")]
    #[diagnostic(
        code(netpulse::waiting),
        help("Statistics collection may have just started. Try again in a minute.")
    )]
    Waiting { message: String },

    #[error("Rate limited by the appliance: {message}")]
    #[diagnostic(
        code(netpulse::rate_limited),
        help("Wait before retrying, or raise the polling interval with --interval.")
    )]
    RateLimited { message: String },

    #[error("Request rejected: {message}")]
    #[diagnostic(
        code(netpulse::rejected),
        help(
            "Check the device id and, for mutating requests, the token\n\
             (--token, or token_env in the profile)."
        )
    )]
    Rejected { message: String },

    #[error("Could not reach the appliance: {message}")]
    #[diagnostic(
        code(netpulse::connection_failed),
        help(
            "Check that the appliance is running and reachable.\n\
             Self-signed certificate? Try: netpulse snapshot --insecure"
        )
    )]
    Connection { message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(netpulse::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netpulse::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No appliance configured")]
    #[diagnostic(
        code(netpulse::no_appliance),
        help(
            "Create a profile with: netpulse config init\n\
             Or pass --appliance / set NETPULSE_APPLIANCE.\n\
             Config expected at: {path}"
        )
    )]
    NoAppliance { path: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(netpulse::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: netpulse config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Preference store error: {message}")]
    #[diagnostic(code(netpulse::preferences))]
    Preferences { message: String },

    #[error(transparent)]
    #[diagnostic(code(netpulse::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(netpulse::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Waiting { .. } => exit_code::WAITING,
            Self::RateLimited { .. } => exit_code::RATE_LIMITED,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Connection { .. } => exit_code::CONNECTION,
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoAppliance { .. } | Self::ProfileNotFound { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Waiting { message } => CliError::Waiting { message },

            CoreError::Request { kind, message } => match kind {
                OutcomeKind::RateLimited => CliError::RateLimited { message },
                OutcomeKind::ClientError => CliError::Rejected { message },
                OutcomeKind::NetworkFailure => CliError::Connection { message },
                OutcomeKind::Waiting => CliError::Waiting { message },
                OutcomeKind::Error | OutcomeKind::Success => CliError::Api { message },
            },

            CoreError::InvalidSnapshot { reason } => CliError::Api { message: reason },

            CoreError::InvalidMode { value } => CliError::Validation {
                field: "range".into(),
                reason: format!("unknown range '{value}'"),
            },

            CoreError::Preferences { message } => CliError::Preferences { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoAppliance => CliError::NoAppliance {
                path: netpulse_config::config_path().display().to_string(),
            },
            ConfigError::UnknownProfile { name, available } => CliError::ProfileNotFound {
                name,
                available: profile_list(&available),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Client(e) => CoreError::from(e).into(),
            other => CliError::Config(Box::new(other)),
        }
    }
}

/// Comma-separated profile names for help text.
fn profile_list(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
