// Loading and saving config files from a scratch directory.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use tradedash_config::{Config, Defaults, Profile, load_config_from, profile_to_sync_config, save_config_to};

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
    assert_eq!(cfg, Config::default());
}

#[test]
fn test_partial_file_merges_over_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_profile = "paper"

[defaults]
poll_interval_secs = 4

[profiles.paper]
server = "http://127.0.0.1:8080"
push = false
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.default_profile_name(), "paper");
    assert_eq!(
        cfg.defaults,
        Defaults {
            poll_interval_secs: 4,
            ..Defaults::default()
        }
    );

    let profile = cfg.profile("paper").unwrap();
    let sync = profile_to_sync_config(profile, &cfg.defaults).unwrap();
    assert_eq!(sync.poll_interval, Duration::from_secs(4));
    assert_eq!(sync.reconnect.delay, Duration::from_millis(3000));
    assert!(!sync.push_enabled);
}

#[test]
fn test_saved_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config {
        default_profile: Some("live".into()),
        ..Config::default()
    };
    cfg.profiles.insert(
        "live".into(),
        Profile {
            reconnect_delay_ms: Some(1500),
            ..Profile::new("https://dash.example.com")
        },
    );
    cfg.profiles.insert("paper".into(), Profile::new("http://localhost:8080"));

    save_config_to(&cfg, &path).unwrap();
    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.profile_names(), vec!["live", "paper"]);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "defaults = \"nope\"").unwrap();
    assert!(load_config_from(&path).is_err());
}
