//! Running splittable functions over restrictions.
//!
//! A [`SplittableFn`] describes per-element work that can be divided while it
//! runs: it creates an initial restriction for each element, optionally
//! subdivides it before processing, and then claims positions through a
//! tracker as it emits output.
//!
//! [`BundleRunner`] processes a batch of elements. Every (element,
//! restriction) pair becomes an independent work item with its own tracker,
//! and work items run in parallel on a Rayon pool.
//! [`BundleRunner::process_with_splitter`] runs one element while another
//! thread issues split requests through a [`SplitHandle`], collecting the
//! residuals the splits return.
//!
//! # Example
//!
//! ```
//! use dynsplit::process::{BundleRunner, SplittableFn};
//! use dynsplit::{OffsetRange, OffsetRangeTracker, SharedTracker};
//!
//! /// Emits every integer in `[0, n)`.
//! struct Count;
//!
//! impl SplittableFn for Count {
//!     type Element = i64;
//!     type Output = i64;
//!     type Tracker = OffsetRangeTracker;
//!
//!     fn create_initial_restriction(&self, n: &i64) -> OffsetRange {
//!         OffsetRange::new(0, *n)
//!     }
//!
//!     fn create_tracker(&self, restriction: OffsetRange) -> OffsetRangeTracker {
//!         OffsetRangeTracker::new(restriction)
//!     }
//!
//!     fn process_element(
//!         &self,
//!         tracker: &SharedTracker<OffsetRangeTracker>,
//!         _n: &i64,
//!         emit: &mut dyn FnMut(i64),
//!     ) -> anyhow::Result<()> {
//!         let mut i = tracker.current_restriction().start;
//!         while tracker.try_claim(i) {
//!             emit(i);
//!             i += 1;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let outcome = BundleRunner::new(Count).run_bundle(&[3, 2])?;
//! assert_eq!(outcome.outputs, vec![0, 1, 2, 0, 1]);
//! # Ok(())
//! # }
//! ```

use crate::config::DynSplitConfig;
use crate::error::TrackerError;
#[cfg(feature = "metrics")]
use crate::metrics::TrackerMetrics;
use crate::progress::Progress;
use crate::restriction::Restriction;
use crate::split::SplitResult;
use crate::tracker::{RestrictionTracker, SharedTracker};
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::thread;
use tracing::{debug, warn};

/// Restriction type used by splittable function `F`.
pub type RestrictionOf<F> = <<F as SplittableFn>::Tracker as RestrictionTracker>::Restriction;

/// Per-element work that can be split while it runs.
pub trait SplittableFn: Send + Sync {
    type Element: Send + Sync;
    type Output: Send;
    type Tracker: RestrictionTracker;

    /// The whole span of work for `element`.
    fn create_initial_restriction(&self, element: &Self::Element) -> RestrictionOf<Self>;

    /// Subdivide a restriction before processing starts.
    ///
    /// `desired_splits` is a hint taken from [`DynSplitConfig::initial_splits`].
    /// The default keeps the restriction whole.
    fn split_restriction(
        &self,
        _element: &Self::Element,
        restriction: RestrictionOf<Self>,
        _desired_splits: usize,
    ) -> Vec<RestrictionOf<Self>> {
        vec![restriction]
    }

    /// Estimated cost of processing `restriction`.
    fn restriction_size(&self, _element: &Self::Element, restriction: &RestrictionOf<Self>) -> f64 {
        restriction.size()
    }

    fn create_tracker(&self, restriction: RestrictionOf<Self>) -> Self::Tracker;

    /// Claim positions through `tracker` and emit output for each one, stopping
    /// when a claim fails.
    ///
    /// # Errors
    ///
    /// An error is recorded on the tracker and fails the work item.
    fn process_element(
        &self,
        tracker: &SharedTracker<Self::Tracker>,
        element: &Self::Element,
        emit: &mut dyn FnMut(Self::Output),
    ) -> Result<()>;
}

/// One element paired with one of its restrictions.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkItem<R> {
    /// Index of the element in the bundle.
    pub element: usize,
    pub restriction: R,
    pub size: f64,
}

/// Result of processing one element over one restriction.
#[derive(Debug)]
pub struct ElementOutcome<O, R> {
    pub outputs: Vec<O>,
    /// The tracker's restriction when processing stopped.
    pub restriction: R,
    pub progress: Progress,
    pub error: Option<TrackerError>,
}

impl<O, R> ElementOutcome<O, R> {
    /// # Errors
    ///
    /// Returns the recorded tracker error, if any.
    pub fn into_result(self) -> Result<Vec<O>, TrackerError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.outputs),
        }
    }
}

/// Run `dofn` for `element` over the restriction owned by `tracker`.
///
/// If the callback fails, the failure is recorded on the tracker. If it
/// returns without attempting every position, the outcome carries
/// [`TrackerError::Unfinished`].
pub fn process_sized_element<F: SplittableFn>(
    dofn: &F,
    element: &F::Element,
    tracker: &SharedTracker<F::Tracker>,
) -> ElementOutcome<F::Output, RestrictionOf<F>> {
    let mut outputs = Vec::new();
    let result = dofn.process_element(tracker, element, &mut |out| outputs.push(out));
    let error = match result {
        Err(err) => {
            warn!(error = %format!("{err:#}"), "process_element failed");
            tracker.fail(&err);
            tracker.error()
        }
        Ok(()) => tracker.check_done().err(),
    };
    ElementOutcome {
        outputs,
        restriction: tracker.current_restriction(),
        progress: tracker.progress(),
        error,
    }
}

/// Split-request access to a tracker that another thread is processing.
///
/// Residuals of successful splits are kept so the caller can reschedule them.
pub struct SplitHandle<T: RestrictionTracker> {
    tracker: SharedTracker<T>,
    residuals: Mutex<Vec<T::Restriction>>,
}

impl<T: RestrictionTracker> SplitHandle<T> {
    #[must_use]
    pub fn new(tracker: SharedTracker<T>) -> Self {
        Self {
            tracker,
            residuals: Mutex::new(Vec::new()),
        }
    }

    /// Split the unclaimed remainder of the in-flight restriction.
    ///
    /// # Errors
    ///
    /// See [`RestrictionTracker::try_split`]; the tracker is unchanged on error.
    pub fn try_split(&self, fraction: f64) -> Result<SplitResult<T::Restriction>, TrackerError> {
        let split = self.tracker.try_split(fraction)?;
        if split.has_residual() {
            self.residuals.lock().push(split.residual.clone());
        }
        Ok(split)
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.tracker.progress()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.tracker.is_done()
    }

    /// Residuals collected so far, in split order.
    #[must_use]
    pub fn residuals(&self) -> Vec<T::Restriction> {
        self.residuals.lock().clone()
    }

    fn into_residuals(self) -> Vec<T::Restriction> {
        self.residuals.into_inner()
    }
}

/// Result of processing one element while split requests arrived concurrently.
#[derive(Debug)]
pub struct DynamicSplitOutcome<O, R> {
    pub element: ElementOutcome<O, R>,
    /// Work handed back by successful splits, to be processed elsewhere.
    pub residuals: Vec<R>,
    pub split_error: Option<anyhow::Error>,
}

impl<O, R> DynamicSplitOutcome<O, R> {
    /// Fail if either the processing thread or the split thread failed.
    ///
    /// # Errors
    ///
    /// Returns the processing error first, then the split error.
    pub fn into_result(self) -> Result<(Vec<O>, Vec<R>)> {
        if let Some(err) = self.element.error {
            return Err(err).context("processing thread failed");
        }
        if let Some(err) = self.split_error {
            return Err(err.context("split thread failed"));
        }
        Ok((self.element.outputs, self.residuals))
    }
}

/// Summary of a processed bundle.
#[derive(Debug)]
pub struct BundleOutcome<O> {
    /// Outputs of every work item, in work-item order.
    pub outputs: Vec<O>,
    pub work_items: usize,
    /// Sum of the restriction sizes that were processed.
    pub total_size: f64,
}

/// Processes bundles of elements with a splittable function.
pub struct BundleRunner<F: SplittableFn> {
    dofn: F,
    config: DynSplitConfig,
    #[cfg(feature = "metrics")]
    metrics: TrackerMetrics,
}

impl<F: SplittableFn> BundleRunner<F> {
    #[must_use]
    pub fn new(dofn: F) -> Self {
        Self {
            dofn,
            config: DynSplitConfig::default(),
            #[cfg(feature = "metrics")]
            metrics: TrackerMetrics::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DynSplitConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DynSplitConfig {
        &self.config
    }

    /// Counters shared by every tracker this runner creates.
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn metrics(&self) -> &TrackerMetrics {
        &self.metrics
    }

    /// A fresh shared tracker for `restriction`.
    pub fn tracker_for(&self, restriction: RestrictionOf<F>) -> SharedTracker<F::Tracker> {
        let tracker = SharedTracker::new(self.dofn.create_tracker(restriction));
        #[cfg(feature = "metrics")]
        let tracker = tracker.with_metrics(self.metrics.clone());
        tracker
    }

    /// Expand elements into sized work items.
    #[must_use]
    pub fn work_items(&self, elements: &[F::Element]) -> Vec<WorkItem<RestrictionOf<F>>> {
        elements
            .iter()
            .enumerate()
            .flat_map(|(index, element)| {
                let initial = self.dofn.create_initial_restriction(element);
                self.dofn
                    .split_restriction(element, initial, self.config.initial_splits)
                    .into_iter()
                    .map(move |restriction| WorkItem {
                        element: index,
                        size: self.dofn.restriction_size(element, &restriction),
                        restriction,
                    })
            })
            .collect()
    }

    /// Process every element of the bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the thread pool
    /// cannot be built, or any work item fails. The error names the element
    /// and restriction that failed first in work-item order.
    pub fn run_bundle(&self, elements: &[F::Element]) -> Result<BundleOutcome<F::Output>> {
        self.config.validate()?;
        let items = self.work_items(elements);
        let work_items = items.len();
        let total_size: f64 = items.iter().map(|item| item.size).sum();
        debug!(elements = elements.len(), work_items, total_size, "running bundle");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads())
            .build()
            .context("failed to build bundle thread pool")?;
        let results: Vec<_> = pool.install(|| {
            items
                .into_par_iter()
                .map(|item| {
                    let tracker = self.tracker_for(item.restriction.clone());
                    let outcome = process_sized_element(&self.dofn, &elements[item.element], &tracker);
                    (item, outcome)
                })
                .collect()
        });

        let mut outputs = Vec::new();
        for (item, outcome) in results {
            let produced = outcome.into_result().with_context(|| {
                format!("element {} failed over {}", item.element, item.restriction)
            })?;
            outputs.extend(produced);
        }
        Ok(BundleOutcome {
            outputs,
            work_items,
            total_size,
        })
    }

    /// Process `element` over `restriction` with a fresh tracker.
    ///
    /// Use this to pick up a residual returned by a split.
    pub fn process_restriction(
        &self,
        element: &F::Element,
        restriction: RestrictionOf<F>,
    ) -> ElementOutcome<F::Output, RestrictionOf<F>> {
        let tracker = self.tracker_for(restriction);
        process_sized_element(&self.dofn, element, &tracker)
    }

    /// Process `element` over `restriction` on the calling thread while
    /// `splitter` runs on another thread with a [`SplitHandle`] to the same
    /// tracker.
    ///
    /// Both sides report independently; use
    /// [`DynamicSplitOutcome::into_result`] to fail when either side failed.
    pub fn process_with_splitter<S>(
        &self,
        element: &F::Element,
        restriction: RestrictionOf<F>,
        splitter: S,
    ) -> DynamicSplitOutcome<F::Output, RestrictionOf<F>>
    where
        S: FnOnce(&SplitHandle<F::Tracker>) -> Result<()> + Send,
    {
        let tracker = self.tracker_for(restriction);
        let handle = SplitHandle::new(tracker.clone());

        let (element_outcome, split_result) = thread::scope(|s| {
            let splitting = s.spawn(|| splitter(&handle));
            let outcome = process_sized_element(&self.dofn, element, &tracker);
            let split_result = splitting
                .join()
                .unwrap_or_else(|_| Err(anyhow!("split thread panicked")));
            (outcome, split_result)
        });

        let residuals = handle.into_residuals();
        debug!(residuals = residuals.len(), "element processed with dynamic splits");
        DynamicSplitOutcome {
            element: element_outcome,
            residuals,
            split_error: split_result.err(),
        }
    }
}
