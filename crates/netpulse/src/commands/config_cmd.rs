//! Config subcommand handlers.

use std::sync::Arc;

use dialoguer::Input;

use netpulse_config::{Config, FilePreferences, Profile};
use netpulse_core::ModeController;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// Replace plaintext tokens so `config show` is safe to paste.
fn redact(cfg: &mut Config) {
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(REDACTED.into());
        }
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let mut cfg = netpulse_config::load_config().unwrap_or_default();
            eprintln!("netpulse configuration");
            eprintln!("   Config path: {}\n", netpulse_config::config_path().display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default(active_profile_name(global, &cfg))
                .interact_text()
                .map_err(prompt_err)?;

            let appliance: String = Input::new()
                .with_prompt("Appliance URL")
                .default("https://192.168.1.1".into())
                .interact_text()
                .map_err(prompt_err)?;

            let device: String = Input::new()
                .with_prompt("Device id (empty for all)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let token_env: String = Input::new()
                .with_prompt("Environment variable holding the token (empty for none)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let profile = Profile {
                appliance,
                device: optional(&device),
                token_env: optional(&token_env),
                ..Profile::default()
            };
            // Validates the URL before anything is written.
            netpulse_config::build_client(&profile, &cfg.defaults)?;

            cfg.profiles.insert(profile_name.clone(), profile);
            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }
            let path = netpulse_config::save_config(&cfg)?;
            eprintln!("   Saved profile '{profile_name}' to {}", path.display());
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = netpulse_config::load_config()?;
            redact(&mut cfg);
            let out = match global.output {
                OutputFormat::Json => output::render_json_pretty(&cfg)?,
                OutputFormat::JsonCompact => output::render_json_compact(&cfg)?,
                OutputFormat::Yaml => output::render_yaml(&cfg)?,
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(&cfg).map_err(|e| CliError::Render(e.to_string()))?
                }
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let out = format!(
                "{}\n{}",
                netpulse_config::config_path().display(),
                netpulse_config::preferences_path().display()
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Range: remembered dashboard selection ───────────────────
        ConfigCommand::Range { value } => {
            let prefs = Arc::new(FilePreferences::open_default());
            let mut controller = ModeController::load(prefs);
            if let Some(range) = value {
                controller.transition(range.mode());
            }
            output::print_output(controller.mode().preference_value(), global.quiet);
            Ok(())
        }
    }
}
