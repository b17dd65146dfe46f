//! Counters for claim and split activity.
//!
//! A [`TrackerMetrics`] is a cheap, cloneable handle to a set of atomic
//! counters. Attach it to one or more trackers with
//! [`SharedTracker::with_metrics`](crate::SharedTracker::with_metrics), then
//! read a JSON snapshot, print it, or save it to a file once the bundle is done.
//!
//! # Example
//!
//! ```
//! use dynsplit::metrics::TrackerMetrics;
//! use dynsplit::{OffsetRange, OffsetRangeTracker, SharedTracker};
//!
//! let metrics = TrackerMetrics::new();
//! let tracker = SharedTracker::new(OffsetRangeTracker::new(OffsetRange::new(0, 2)))
//!     .with_metrics(metrics.clone());
//!
//! let mut i = 0;
//! while tracker.try_claim(i) {
//!     i += 1;
//! }
//! assert_eq!(metrics.claims_accepted(), 2);
//! assert_eq!(metrics.claims_rejected(), 1);
//! ```

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Counters {
    claims_accepted: AtomicU64,
    claims_rejected: AtomicU64,
    splits_succeeded: AtomicU64,
    splits_rejected: AtomicU64,
    processing_errors: AtomicU64,
}

/// Thread-safe claim/split counters.
#[derive(Clone, Default)]
pub struct TrackerMetrics {
    inner: Arc<Counters>,
}

impl TrackerMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_claim(&self, accepted: bool) {
        let counter = if accepted {
            &self.inner.claims_accepted
        } else {
            &self.inner.claims_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_split(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.inner.splits_succeeded
        } else {
            &self.inner.splits_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processing_error(&self) {
        self.inner.processing_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn claims_accepted(&self) -> u64 {
        self.inner.claims_accepted.load(Ordering::Relaxed)
    }

    /// Claims that returned `false`, whether from exhaustion or an error.
    #[must_use]
    pub fn claims_rejected(&self) -> u64 {
        self.inner.claims_rejected.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn claims_attempted(&self) -> u64 {
        self.claims_accepted() + self.claims_rejected()
    }

    #[must_use]
    pub fn splits_succeeded(&self) -> u64 {
        self.inner.splits_succeeded.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn splits_rejected(&self) -> u64 {
        self.inner.splits_rejected.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn processing_errors(&self) -> u64 {
        self.inner.processing_errors.load(Ordering::Relaxed)
    }

    /// Current counter values as a JSON object.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        json!({
            "claims_attempted": self.claims_attempted(),
            "claims_accepted": self.claims_accepted(),
            "claims_rejected": self.claims_rejected(),
            "splits_succeeded": self.splits_succeeded(),
            "splits_rejected": self.splits_rejected(),
            "processing_errors": self.processing_errors(),
        })
    }

    /// Print a human-readable summary to stdout.
    pub fn print(&self) {
        println!("\n=== Tracker Metrics ===");
        if let Value::Object(map) = self.snapshot() {
            for (name, value) in map {
                println!("  {name}: {value}");
            }
        }
        println!("=======================\n");
    }

    /// Save the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        let mut file = File::create(path)
            .with_context(|| format!("failed to create metrics file {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
