mod common;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serial_test::serial;
use wakeguard::config::{
    Config, ConfigError, InhibitConfig, PowerBackend, SupervisorConfig, CONFIG_ENV_VAR,
};
use wakeguard::job::GroupPolicy;

use common::temp_config;

/// Test that Config::default() produces the documented values.
#[test]
fn test_config_default_values() {
    let config = Config::default();

    assert!(config.inhibit.idle);
    assert!(!config.inhibit.display);
    assert!(!config.inhibit.ac_only);

    assert!(config.supervisor.kill_on_close);
    assert_eq!(config.supervisor.poll_interval_ms, 100);

    assert_eq!(config.power.backend, PowerBackend::SystemdInhibit);
}

/// Test that Config::config_path() returns a path ending with the expected filename.
#[test]
fn test_config_path_ends_with_expected() {
    let path = Config::config_path();
    assert!(path.ends_with("wakeguard/config.toml"));
}

/// Test that an explicit path always wins.
#[test]
#[serial]
fn test_resolve_path_prefers_explicit() {
    std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = Config::resolve_path(Some(Path::new("/explicit.toml")));
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, PathBuf::from("/explicit.toml"));
}

/// Test that the environment variable overrides the default location.
#[test]
#[serial]
fn test_resolve_path_uses_env_var() {
    std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = Config::resolve_path(None);
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, PathBuf::from("/from/env.toml"));
    assert_eq!(Config::resolve_path(None), Config::config_path());
}

/// Test that a missing file yields the defaults.
#[test]
fn test_missing_file_is_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("absent.toml")).expect("defaults");
    assert_eq!(config, Config::default());
}

/// Test that valid TOML parses correctly and unset keys keep their defaults.
#[test]
fn test_parse_partial_toml() {
    let (_dir, path) = temp_config(
        r#"
[inhibit]
display = true

[power]
backend = "none"
"#,
    );

    let config = Config::load_from(&path).expect("Should parse valid TOML");

    assert_eq!(
        config.inhibit,
        InhibitConfig {
            idle: true,
            display: true,
            ac_only: false,
        }
    );
    assert_eq!(config.supervisor, SupervisorConfig::default());
    assert_eq!(config.power.backend, PowerBackend::None);
}

/// Test that invalid TOML produces a parse error naming the file.
#[test]
fn test_parse_invalid_toml() {
    let (_dir, path) = temp_config("this is not valid toml [[[");

    match Config::load_from(&path) {
        Err(ConfigError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected ParseError, got: {other:?}"),
    }
}

/// Test that an unknown power backend is rejected.
#[test]
fn test_parse_unknown_backend() {
    let (_dir, path) = temp_config("[power]\nbackend = \"caffeinate\"\n");
    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::ParseError { .. })
    ));
}

/// Test validation fails when the poll interval is zero.
#[test]
fn test_validation_fails_zero_poll_interval() {
    let (_dir, path) = temp_config("[supervisor]\npoll_interval_ms = 0\n");

    match Config::load_from(&path).unwrap_err() {
        ConfigError::ValidationError { message } => {
            assert!(message.contains("poll_interval_ms"), "got: {message}");
        }
        other => panic!("Expected ValidationError, got: {other:?}"),
    }
}

/// Test round-trip serialization/deserialization.
#[test]
fn test_config_roundtrip() {
    let mut original = Config::default();
    original.inhibit.ac_only = true;
    original.supervisor.kill_on_close = false;
    original.power.backend = PowerBackend::None;

    let serialized = toml::to_string(&original).expect("Should serialize");
    let deserialized: Config = toml::from_str(&serialized).expect("Should deserialize");

    assert_eq!(original, deserialized);
}

/// Test that supervisor settings become the group policy.
#[test]
fn test_supervisor_config_to_group_policy() {
    let policy = GroupPolicy::from(&SupervisorConfig {
        kill_on_close: false,
        poll_interval_ms: 250,
    });

    assert!(!policy.kill_on_close);
    assert_eq!(policy.poll_interval, Duration::from_millis(250));
    assert!(policy.lend_terminal);
}
