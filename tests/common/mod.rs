//! Shared test utilities.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

/// Config that never touches the real power manager.
pub const NOOP_POWER_CONFIG: &str = r#"[power]
backend = "none"
"#;

/// Create a temporary config file with `content`.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

/// Signal name unique to this test process and `tag`.
pub fn unique_name(tag: &str) -> String {
    format!("wakeguard-test-{}-{tag}.sock", std::process::id())
}

pub fn wakeguard_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_wakeguard"))
}

/// Whether a session currently owns `name`. Connecting without sending a
/// message leaves the session running.
pub fn session_is_listening(name: &str) -> bool {
    use interprocess::local_socket::traits::Stream as _;
    use interprocess::local_socket::{GenericNamespaced, Stream, ToNsName};

    match name.to_ns_name::<GenericNamespaced>() {
        Ok(ns_name) => Stream::connect(ns_name).is_ok(),
        Err(_) => false,
    }
}

/// Poll until a session owns `name`, panicking after five seconds.
pub fn wait_for_session(name: &str) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while !session_is_listening(name) {
        assert!(
            std::time::Instant::now() < deadline,
            "session '{name}' never became reachable"
        );
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
}
