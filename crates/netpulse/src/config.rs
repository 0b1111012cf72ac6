//! Glue between global flags and `netpulse-config`: pick the profile,
//! overlay flags, and build the client and dashboard settings.

use netpulse_api::RequestClient;
use netpulse_config::{Config, ConfigError, Profile};
use netpulse_core::DashboardConfig;
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a data command needs.
pub struct Session {
    pub client: RequestClient,
    pub device: Option<String>,
    pub dashboard: DashboardConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The active profile with flag overrides applied. An explicitly named
/// profile must exist; the default one may be absent when flags supply
/// the appliance.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<Profile, CliError> {
    let name = active_profile_name(global, config);
    let mut profile = match config.profiles.get(&name) {
        Some(p) => p.clone(),
        None if global.profile.is_some() => {
            return Err(ConfigError::UnknownProfile {
                name,
                available: config.profile_names(),
            }
            .into());
        }
        None => Profile::default(),
    };

    if let Some(ref appliance) = global.appliance {
        profile.appliance.clone_from(appliance);
    }
    if global.device.is_some() {
        profile.device.clone_from(&global.device);
    }
    if global.token.is_some() {
        profile.token.clone_from(&global.token);
        profile.token_env = None;
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    debug!(profile = %name, appliance = %profile.appliance, "resolved profile");
    Ok(profile)
}

/// Build the session for a data command from the config file and flags.
pub fn session(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = netpulse_config::load_config_or_default();
    let profile = resolve_profile(global, &cfg)?;
    let client = netpulse_config::build_client(&profile, &cfg.defaults)?;
    Ok(Session {
        client,
        device: profile.device.clone().filter(|d| !d.is_empty()),
        dashboard: netpulse_config::dashboard_config(&profile, &cfg.defaults),
    })
}
