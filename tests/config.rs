//! Tests for loading and validating configuration.

use dynsplit::DynSplitConfig;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("dynsplit.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_config_from_json_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{"split_fraction": 0.25, "signal_timeout_ms": 750, "initial_splits": 8, "parallelism": 3}"#,
    );
    let config = DynSplitConfig::from_json_file(&path).unwrap();
    assert_eq!(config.split_fraction, 0.25);
    assert_eq!(config.signal_timeout(), Duration::from_millis(750));
    assert_eq!(config.initial_splits, 8);
    assert_eq!(config.worker_threads(), 3);
}

#[test]
fn test_missing_fields_use_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{"initial_splits": 2}"#);
    let config = DynSplitConfig::from_json_file(&path).unwrap();
    assert_eq!(
        config,
        DynSplitConfig {
            initial_splits: 2,
            ..Default::default()
        }
    );
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{"split_fraction": -0.1}"#);
    let err = DynSplitConfig::from_json_file(&path).unwrap_err();
    assert!(err.to_string().contains("split_fraction"));
}

#[test]
fn test_unreadable_and_malformed_files() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");
    let err = DynSplitConfig::from_json_file(&missing).unwrap_err();
    assert!(err.to_string().contains("failed to read config"));

    let path = write_config(&dir, "{ not json");
    let err = DynSplitConfig::from_json_file(&path).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn test_config_round_trips_through_serde() {
    let config = DynSplitConfig {
        parallelism: Some(4),
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: DynSplitConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
