//! File layering and env precedence through the public loader.

use navconf::{ConfigError, NavConfig};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn later_files_override_only_what_they_set() {
    let dir = TempDir::new().unwrap();
    let system = write(
        &dir,
        "system.toml",
        "[bind]\nhost = \"10.0.0.1\"\nhttp_port = 7000\n\n[analysis]\nframe_rate = 20\n",
    );
    let local = write(&dir, "local.toml", "[bind]\nhttp_port = 7100\n");

    let (config, sources) = NavConfig::load_layers(&[system.clone(), local.clone()], |_| None)
        .unwrap();

    assert_eq!(config.bind.host, "10.0.0.1");
    assert_eq!(config.bind.http_port, 7100);
    assert_eq!(config.analysis.frame_rate, 20);
    assert_eq!(sources.files, vec![system, local]);
}

#[test]
fn env_port_wins_over_files() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "navigate.toml", "[bind]\nhttp_port = 7000\n");

    let (config, sources) = NavConfig::load_layers(&[file], |key| {
        (key == "NAVIGATE_HTTP_PORT").then(|| "7200".to_string())
    })
    .unwrap();

    assert_eq!(config.bind.http_port, 7200);
    assert_eq!(sources.env_overrides, vec!["NAVIGATE_HTTP_PORT"]);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = NavConfig::load_layers(&[missing], |_| None).unwrap_err();
    assert!(matches!(err, ConfigError::FileRead { .. }));
}

#[test]
fn cli_path_replaces_local_override() {
    let dir = TempDir::new().unwrap();
    let cli = write(&dir, "custom.toml", "[telemetry]\nlog_level = \"warn\"\n");

    let files = navconf::discover_config_files_with_override(Some(&cli));
    assert_eq!(files.last(), Some(&cli));
}
