//! # dynsplit
//!
//! Restriction tracking and dynamic splitting for **splittable transforms**,
//! in the style of Apache Beam's splittable `DoFn`s.
//!
//! A splittable transform processes each element over a *restriction*: a
//! contiguous span of work such as a range of offsets. While an
//! element-processing thread claims positions one at a time, a split-request
//! thread may shrink the unclaimed remainder into a kept *primary* and a
//! *residual* that is handed back for redistribution. Both sides go through
//! one lock per tracker, and this crate makes that protocol safe and testable.
//!
//! ## Key pieces
//!
//! - [`Restriction`] / [`OffsetRange`] - spans of work with split-point arithmetic
//! - [`RestrictionTracker`] / [`OffsetRangeTracker`] - claim, split, progress, done, error
//! - [`SharedTracker`] - the single-lock wrapper shared by the claiming and splitting threads
//! - [`coordination`] - checkpoints that force each claim/split interleaving deterministically
//! - [`process`] - splittable functions, per-element processing, and parallel bundles
//!
//! ## Quick start
//!
//! ```
//! use dynsplit::*;
//!
//! let tracker = SharedTracker::new(OffsetRangeTracker::new(OffsetRange::new(0, 20)));
//!
//! // A split request arrives before any claim: keep half, hand back half.
//! let split = tracker.try_split(0.5).unwrap();
//! assert_eq!(split.primary, OffsetRange::new(0, 10));
//! assert_eq!(split.residual, OffsetRange::new(10, 20));
//!
//! // The processing loop stops as soon as a claim fails.
//! let mut emitted = Vec::new();
//! let mut i = 0;
//! while tracker.try_claim(i) {
//!     emitted.push(i);
//!     i += 1;
//! }
//! assert_eq!(emitted, (0..10).collect::<Vec<_>>());
//! assert!(tracker.is_done());
//! ```
//!
//! ## Error model
//!
//! - Exhaustion is not an error: [`RestrictionTracker::try_claim`] returns `false`.
//! - Invalid split requests return a [`TrackerError`] and leave the tracker unchanged.
//! - Out-of-order claims and failed processing callbacks are recorded on the
//!   tracker; it is then done and refuses every later claim.
//!
//! ## Feature Flags
//!
//! - `metrics` (default) - claim/split counters via [`metrics::TrackerMetrics`]

pub mod config;
pub mod coordination;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod process;
pub mod progress;
pub mod restriction;
pub mod split;
pub mod testing;
pub mod tracker;

// General re-exports
pub use config::DynSplitConfig;
pub use error::{TrackerError, TrackerResult};
pub use process::{BundleRunner, SplitHandle, SplittableFn};
pub use progress::Progress;
pub use restriction::{OffsetRange, Restriction};
pub use split::SplitResult;
pub use tracker::{OffsetRangeTracker, PositionOf, RestrictionTracker, SharedTracker};
