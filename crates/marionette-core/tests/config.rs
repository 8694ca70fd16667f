//! Integration tests for runtime configuration files
//!
//! Tests cover:
//! - Loading marionette.toml from disk
//! - Defaults for missing tables
//! - Validation and parse failures

use marionette_core::{ConfigError, RuntimeConfig};
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("marionette.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[queue]
max_pending = 64

[objects]
max_objects = 1000

[log]
filter = "marionette_core=debug"
"#,
    );

    let config = RuntimeConfig::from_file(&path).unwrap();
    assert_eq!(config.queue.max_pending, 64);
    assert_eq!(config.objects.max_objects, Some(1000));
    assert_eq!(config.log.filter, "marionette_core=debug");
}

#[test]
fn test_missing_tables_use_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[objects]\nmax_objects = 5\n");

    let config = RuntimeConfig::from_file(&path).unwrap();
    assert_eq!(config.queue.max_pending, 8192);
    assert_eq!(config.log.filter, "warn");
    assert_eq!(config.objects.max_objects, Some(5));
}

#[test]
fn test_empty_file_is_default() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    assert_eq!(RuntimeConfig::from_file(&path).unwrap(), RuntimeConfig::default());
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = RuntimeConfig::from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}

#[test]
fn test_invalid_values_rejected() {
    let dir = TempDir::new().unwrap();

    let path = write_config(&dir, "[queue]\nmax_pending = 0\n");
    assert!(matches!(
        RuntimeConfig::from_file(&path),
        Err(ConfigError::ValidationError(_))
    ));

    let path = write_config(&dir, "[queue]\nmax_pending = \"lots\"\n");
    assert!(matches!(
        RuntimeConfig::from_file(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_serialized_config_reloads() {
    let mut config = RuntimeConfig::default();
    config.queue.max_pending = 12;
    config.objects.max_objects = Some(3);

    let text = toml::to_string(&config).unwrap();
    assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
}
