//! Tests for the metrics module.
#![cfg(feature = "metrics")]

use dynsplit::metrics::TrackerMetrics;
use dynsplit::{OffsetRange, OffsetRangeTracker, SharedTracker};
use serde_json::{json, Value};
use tempfile::TempDir;

fn tracked(start: i64, end: i64, metrics: &TrackerMetrics) -> SharedTracker<OffsetRangeTracker> {
    SharedTracker::new(OffsetRangeTracker::new(OffsetRange::new(start, end)))
        .with_metrics(metrics.clone())
}

#[test]
fn test_claims_and_splits_are_counted() {
    let metrics = TrackerMetrics::new();
    let tracker = tracked(0, 10, &metrics);

    assert!(tracker.try_claim(0));
    assert!(tracker.try_claim(1));
    assert!(tracker.try_split(0.5).is_ok());
    assert!(tracker.try_split(3.0).is_err());
    let mut i = 2;
    while tracker.try_claim(i) {
        i += 1;
    }

    // The split kept [0, 6), so offset 6 exhausts the tracker.
    assert_eq!(i, 6);
    assert_eq!(metrics.splits_succeeded(), 1);
    assert_eq!(metrics.splits_rejected(), 1);
    assert_eq!(metrics.claims_accepted(), 6);
    assert_eq!(metrics.claims_rejected(), 1);
    assert_eq!(metrics.claims_attempted(), 7);
}

#[test]
fn test_processing_errors_are_counted() {
    let metrics = TrackerMetrics::new();
    let tracker = tracked(0, 4, &metrics);
    assert!(tracker.try_claim(0));
    tracker.fail(&anyhow::anyhow!("disk full"));
    assert!(!tracker.try_claim(1));

    assert_eq!(metrics.processing_errors(), 1);
    assert_eq!(metrics.claims_accepted(), 1);
    assert_eq!(metrics.claims_rejected(), 1);
}

#[test]
fn test_metrics_shared_between_trackers() {
    let metrics = TrackerMetrics::new();
    for (start, end) in [(0, 3), (10, 12)] {
        let tracker = tracked(start, end, &metrics);
        let mut i = start;
        while tracker.try_claim(i) {
            i += 1;
        }
    }
    assert_eq!(metrics.claims_accepted(), 5);
    assert_eq!(metrics.claims_rejected(), 2);
}

#[test]
fn test_snapshot() {
    let metrics = TrackerMetrics::new();
    metrics.record_claim(true);
    metrics.record_split(true);
    metrics.record_split(false);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot["claims_attempted"], json!(1));
    assert_eq!(snapshot["splits_succeeded"], json!(1));
    assert_eq!(snapshot["splits_rejected"], json!(1));
    assert_eq!(snapshot["processing_errors"], json!(0));

    // Printing reads the same counters and leaves them untouched.
    metrics.print();
    assert_eq!(metrics.snapshot(), snapshot);
}

#[test]
fn test_metrics_save_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("metrics.json");

    let metrics = TrackerMetrics::new();
    metrics.record_claim(true);
    metrics.record_claim(false);
    metrics.save_to_file(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let saved: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(saved, metrics.snapshot());
    assert_eq!(saved["claims_rejected"], json!(1));
}

#[test]
fn test_save_to_missing_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing").join("metrics.json");
    let err = TrackerMetrics::new().save_to_file(&path).unwrap_err();
    assert!(err.to_string().contains("failed to create metrics file"));
}
