//! Configuration for bundle processing and the split coordination harness.
//!
//! ```no_run
//! use dynsplit::config::DynSplitConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = DynSplitConfig::from_json_file("dynsplit.json")?;
//! assert!(config.split_fraction <= 1.0);
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables shared by [`BundleRunner`](crate::process::BundleRunner) and the
/// [`coordination`](crate::coordination) harness.
///
/// Missing fields in a JSON file fall back to [`Default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynSplitConfig {
    /// Fraction of the unclaimed remainder kept as primary when splitting.
    pub split_fraction: f64,
    /// Upper bound on each harness rendezvous, in milliseconds.
    pub signal_timeout_ms: u64,
    /// Number of pieces the default `split_restriction` produces per element.
    pub initial_splits: usize,
    /// Worker threads for bundle processing. `None` means one per CPU.
    pub parallelism: Option<usize>,
}

impl Default for DynSplitConfig {
    fn default() -> Self {
        Self {
            split_fraction: 0.5,
            signal_timeout_ms: 5_000,
            initial_splits: 1,
            parallelism: None,
        }
    }
}

impl DynSplitConfig {
    /// Load and validate a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`validate`](Self::validate).
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error describing the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.split_fraction) {
            bail!("split_fraction must be in [0, 1], got {}", self.split_fraction);
        }
        if self.signal_timeout_ms == 0 {
            bail!("signal_timeout_ms must be positive");
        }
        if self.initial_splits == 0 {
            bail!("initial_splits must be at least 1");
        }
        if self.parallelism == Some(0) {
            bail!("parallelism must be at least 1 when set");
        }
        Ok(())
    }

    #[must_use]
    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }

    /// Worker threads to use, resolving `None` to the CPU count.
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.parallelism.unwrap_or_else(num_cpus::get).max(1)
    }
}
