#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use netpulse_config::{Config, Defaults, FilePreferences, Profile, load_config_from, save_config_to};
use netpulse_core::{Mode, ModeController, TimeRange};

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut cfg = Config::default();
    cfg.defaults.poll_interval = 15;
    cfg.profiles.insert(
        "default".into(),
        Profile {
            appliance: "https://192.168.1.1".into(),
            device: Some("gw-01".into()),
            token_env: Some("NETPULSE_LAB_TOKEN".into()),
            ..Profile::default()
        },
    );
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.defaults.poll_interval, 15);
    let (name, profile) = loaded.profile(None).unwrap().unwrap();
    assert_eq!(name, "default");
    assert_eq!(profile.appliance, "https://192.168.1.1");
    assert_eq!(profile.device.as_deref(), Some("gw-01"));
}

#[test]
fn partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[defaults]\nlive_capacity = 60\n\n[profiles.lab]\nappliance = \"http://10.0.0.2\"\n",
    )
    .unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.defaults.live_capacity, 60);
    assert_eq!(loaded.defaults.poll_interval, Defaults::default().poll_interval);
    assert_eq!(loaded.defaults.notice_ttl, 5);
    assert!(loaded.profile(Some("lab")).unwrap().is_some());

    let dash = netpulse_config::dashboard_config(
        loaded.profile(Some("lab")).unwrap().unwrap().1,
        &loaded.defaults,
    );
    assert_eq!(dash.live_capacity, 60);
    assert_eq!(dash.notice_ttl, Duration::from_secs(5));
}

#[test]
fn mode_controller_restores_range_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = Arc::new(FilePreferences::new(dir.path().join("prefs.toml")));

    let mut controller = ModeController::load(prefs.clone());
    assert_eq!(controller.mode(), Mode::Live);
    controller.transition(Mode::Historical(TimeRange::Hours6));

    let restored = ModeController::load(prefs);
    assert_eq!(restored.mode(), Mode::Historical(TimeRange::Hours6));
}
