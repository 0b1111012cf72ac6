//! Shared configuration for netpulse tools.
//!
//! TOML profiles merged with `NETPULSE_*` environment variables, token
//! resolution (env var, then plaintext), translation into a ready
//! `RequestClient` and `DashboardConfig`, and the file-backed preference
//! store that remembers the selected time range across runs.

mod prefs;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use netpulse_api::{RequestClient, RetryConfig, StaticToken, TlsMode, TransportConfig};
use netpulse_core::DashboardConfig;

pub use prefs::FilePreferences;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String, available: Vec<String> },

    #[error("no appliance URL configured (set one with --appliance or a profile)")]
    NoAppliance,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("client setup failed: {0}")]
    Client(#[from] netpulse_api::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named appliance profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-attempt request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Live polling period, seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default = "default_live_capacity")]
    pub live_capacity: usize,

    #[serde(default = "default_true")]
    pub backfill: bool,

    /// Banner lifetime, seconds.
    #[serde(default = "default_notice_ttl")]
    pub notice_ttl: u64,

    /// Total attempts for transient failures.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
            live_capacity: default_live_capacity(),
            backfill: true,
            notice_ttl: default_notice_ttl(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    60
}
fn default_live_capacity() -> usize {
    30
}
fn default_true() -> bool {
    true
}
fn default_notice_ttl() -> u64 {
    5
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}

/// A named appliance profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Appliance base URL (e.g., "https://192.168.1.1").
    pub appliance: String,

    /// Device whose metrics are shown. Absent means all.
    pub device: Option<String>,

    /// Anti-forgery token (plaintext -- prefer `token_env`).
    pub token: Option<String>,

    /// Environment variable name containing the anti-forgery token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override live polling period.
    pub poll_interval: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "netpulse", "netpulse")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netpulse");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the selected time range is remembered between runs.
pub fn preferences_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("preferences.toml"),
        |dirs| dirs.data_dir().join("preferences.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment.
///
/// Nested keys use a double underscore: `NETPULSE_DEFAULTS__POLL_INTERVAL=15`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETPULSE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

impl Config {
    /// Look up a profile by name, or the default profile when `name` is
    /// `None`. A missing default profile yields `Ok(None)`.
    pub fn profile(&self, name: Option<&str>) -> Result<Option<(&str, &Profile)>, ConfigError> {
        match name {
            Some(name) => self
                .profiles
                .get_key_value(name)
                .map(|(k, p)| Some((k.as_str(), p)))
                .ok_or_else(|| ConfigError::UnknownProfile {
                    name: name.into(),
                    available: self.profile_names(),
                }),
            None => Ok(self
                .default_profile
                .as_deref()
                .and_then(|name| self.profiles.get_key_value(name))
                .map(|(k, p)| (k.as_str(), p))),
        }
    }

    /// Configured profile names, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// Resolve the anti-forgery token: `token_env` variable, then plaintext.
pub fn resolve_token(profile: &Profile) -> Option<SecretString> {
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            if !val.is_empty() {
                return Some(SecretString::from(val));
            }
        }
    }
    profile
        .token
        .as_ref()
        .filter(|t| !t.is_empty())
        .map(|t| SecretString::from(t.clone()))
}

fn tls_mode(profile: &Profile, defaults: &Defaults) -> TlsMode {
    if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    }
}

/// Build a ready request client for a profile.
pub fn build_client(profile: &Profile, defaults: &Defaults) -> Result<RequestClient, ConfigError> {
    if profile.appliance.trim().is_empty() {
        return Err(ConfigError::NoAppliance);
    }
    if defaults.retry_attempts == 0 {
        return Err(ConfigError::Validation {
            field: "retry_attempts".into(),
            reason: "must be at least 1".into(),
        });
    }

    let transport = TransportConfig {
        tls: tls_mode(profile, defaults),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    };
    let mut client = RequestClient::new(&profile.appliance, &transport)?.with_retry(RetryConfig {
        max_attempts: defaults.retry_attempts,
        backoff_base: Duration::from_millis(defaults.retry_backoff_ms),
    });
    if let Some(token) = resolve_token(profile) {
        client = client.with_token_provider(Arc::new(StaticToken::new(token)));
    }
    Ok(client)
}

/// Dashboard tuning for a profile.
pub fn dashboard_config(profile: &Profile, defaults: &Defaults) -> DashboardConfig {
    DashboardConfig {
        poll_interval: Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval)),
        live_capacity: defaults.live_capacity,
        backfill: defaults.backfill,
        notice_ttl: Duration::from_secs(defaults.notice_ttl),
        ..DashboardConfig::default()
    }
}
