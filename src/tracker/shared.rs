use super::{PositionOf, RestrictionTracker};
use crate::error::TrackerResult;
#[cfg(feature = "metrics")]
use crate::metrics::TrackerMetrics;
use crate::progress::Progress;
use crate::split::SplitResult;
use crate::TrackerError;
use parking_lot::Mutex;
use std::sync::Arc;

/// A tracker shared between a claiming thread and a splitting thread.
///
/// Cloning is cheap and every clone refers to the same tracker. All operations
/// take one exclusive lock for their whole critical section, so claims and
/// splits are serialized; which one runs first under contention is
/// unspecified. The tracker itself never blocks or calls back into the shared
/// handle while locked; only an `*_inspect` hook can hold the lock longer.
pub struct SharedTracker<T> {
    inner: Arc<Mutex<T>>,
    #[cfg(feature = "metrics")]
    metrics: Option<TrackerMetrics>,
}

impl<T> Clone for SharedTracker<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            #[cfg(feature = "metrics")]
            metrics: self.metrics.clone(),
        }
    }
}

impl<T: RestrictionTracker> SharedTracker<T> {
    #[must_use]
    pub fn new(tracker: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Record claim and split outcomes into `metrics`.
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, metrics: TrackerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn try_claim(&self, position: PositionOf<T>) -> bool {
        self.try_claim_inspect(position, || {})
    }

    /// Claim `position`, running `while_locked` after the lock is acquired and
    /// before the claim takes effect.
    pub fn try_claim_inspect(&self, position: PositionOf<T>, while_locked: impl FnOnce()) -> bool {
        let claimed = {
            let mut tracker = self.inner.lock();
            while_locked();
            tracker.try_claim(position)
        };
        #[cfg(feature = "metrics")]
        if let Some(m) = &self.metrics {
            m.record_claim(claimed);
        }
        claimed
    }

    /// Split the unclaimed remainder.
    ///
    /// # Errors
    ///
    /// See [`RestrictionTracker::try_split`].
    pub fn try_split(&self, fraction: f64) -> TrackerResult<SplitResult<T::Restriction>> {
        self.try_split_inspect(fraction, || {})
    }

    /// Split, running `while_locked` after the lock is acquired and before the
    /// split boundary is computed.
    ///
    /// # Errors
    ///
    /// See [`RestrictionTracker::try_split`].
    pub fn try_split_inspect(
        &self,
        fraction: f64,
        while_locked: impl FnOnce(),
    ) -> TrackerResult<SplitResult<T::Restriction>> {
        let result = {
            let mut tracker = self.inner.lock();
            while_locked();
            tracker.try_split(fraction)
        };
        #[cfg(feature = "metrics")]
        if let Some(m) = &self.metrics {
            m.record_split(result.is_ok());
        }
        result
    }

    /// Give up all unclaimed work.
    ///
    /// # Errors
    ///
    /// See [`RestrictionTracker::checkpoint`].
    pub fn checkpoint(&self) -> TrackerResult<SplitResult<T::Restriction>> {
        self.try_split(0.0)
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.inner.lock().progress()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.lock().is_done()
    }

    #[must_use]
    pub fn error(&self) -> Option<TrackerError> {
        self.inner.lock().error()
    }

    #[must_use]
    pub fn current_restriction(&self) -> T::Restriction {
        self.inner.lock().current_restriction()
    }

    /// Record a processing failure on the tracker.
    pub fn fail(&self, err: &anyhow::Error) {
        self.inner.lock().fail(format!("{err:#}"));
        #[cfg(feature = "metrics")]
        if let Some(m) = &self.metrics {
            m.record_processing_error();
        }
    }

    /// # Errors
    ///
    /// See [`RestrictionTracker::check_done`].
    pub fn check_done(&self) -> TrackerResult<()> {
        self.inner.lock().check_done()
    }

    /// Whether some thread currently holds the tracker lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}
