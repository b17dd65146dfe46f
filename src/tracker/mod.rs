//! Restriction trackers.
//!
//! A [`RestrictionTracker`] owns the mutable progress state of one restriction:
//! the restriction itself (whose end may shrink as splits happen), a cursor
//! marking how far claims have advanced, and a terminal error slot.
//!
//! Trackers take `&mut self` and are not synchronized on their own. Wrap one
//! in a [`SharedTracker`] to hand it to both an element-processing thread and
//! a split-request thread; every operation then runs under a single lock.
//!
//! # Lifecycle
//!
//! ```text
//! Active --(try_claim)*--> Exhausted
//!    \
//!     `--(try_split)--> Active' (primary, keeps claiming)  +  Residual (new tracker)
//! ```

mod offset_range;
mod shared;

pub use offset_range::OffsetRangeTracker;
pub use shared::SharedTracker;

use crate::error::{TrackerError, TrackerResult};
use crate::progress::Progress;
use crate::restriction::Restriction;
use crate::split::SplitResult;

/// Position type claimed by tracker `T`.
pub type PositionOf<T> = <<T as RestrictionTracker>::Restriction as Restriction>::Position;

/// Claim/split capability for one restriction family.
pub trait RestrictionTracker: Send + 'static {
    type Restriction: Restriction;

    /// Attempt to claim `position`.
    ///
    /// Returns `true` if the position lies inside the current restriction and
    /// is past every previously attempted position. Returns `false` once the
    /// restriction is exhausted, and from then on for every later call. A
    /// position that moves backwards records an error before returning `false`.
    fn try_claim(&mut self, position: PositionOf<Self>) -> bool;

    /// Split the unclaimed remainder at `fraction` of its size.
    ///
    /// On success the tracker keeps the primary and the residual is returned
    /// for redistribution. On failure the tracker is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidFraction`] for a fraction outside `[0, 1]`,
    /// or [`TrackerError::NothingToSplit`] when no unclaimed work remains.
    fn try_split(&mut self, fraction: f64) -> TrackerResult<SplitResult<Self::Restriction>>;

    /// Completed and remaining work.
    fn progress(&self) -> Progress;

    /// Whether every position has been claimed, the tracker stopped, or an error was recorded.
    fn is_done(&self) -> bool;

    /// The recorded terminal error, if any.
    fn error(&self) -> Option<TrackerError>;

    /// The restriction as currently owned, including the claimed prefix.
    fn current_restriction(&self) -> Self::Restriction;

    /// Record a processing failure. The tracker stops and refuses further claims.
    fn fail(&mut self, message: String);

    /// Verify that every position of the restriction was attempted.
    ///
    /// # Errors
    ///
    /// Returns the recorded error if there is one, or [`TrackerError::Unfinished`].
    fn check_done(&self) -> TrackerResult<()>;

    /// Give up all unclaimed work, returning it as the residual.
    ///
    /// # Errors
    ///
    /// Same as [`try_split`](Self::try_split) with fraction `0.0`.
    fn checkpoint(&mut self) -> TrackerResult<SplitResult<Self::Restriction>> {
        self.try_split(0.0)
    }
}
