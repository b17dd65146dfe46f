//! Error types reported by restriction trackers.
//!
//! Exhausting a restriction is *not* an error: [`try_claim`] simply returns
//! `false`. The variants below cover the cases where a caller asked for
//! something the tracker cannot do (an invalid claim or split), or where the
//! processing callback failed and the failure was recorded on the tracker.
//!
//! Positions and restrictions are carried in their rendered form so that the
//! error type stays independent of the restriction family that produced it.
//!
//! [`try_claim`]: crate::RestrictionTracker::try_claim

use std::fmt;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Everything a tracker can refuse or record.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// A split fraction outside `[0, 1]` (or NaN).
    InvalidFraction(f64),
    /// The unclaimed remainder of the restriction is empty, or the tracker
    /// has already stopped.
    NothingToSplit { restriction: String },
    /// A split position that does not lie inside the restriction.
    InvalidSplitPoint { position: String, restriction: String },
    /// A restriction whose bounds are inverted.
    InvalidRestriction { start: String, end: String },
    /// A claim for a position before the start of the restriction.
    ClaimBeforeStart { position: String, restriction: String },
    /// A claim that does not move past the last attempted position.
    NonMonotonicClaim { position: String, last_attempted: String },
    /// Processing stopped before every position of the restriction was attempted.
    Unfinished { restriction: String, next: String },
    /// The element-processing callback failed after claiming `position`.
    Processing { position: String, message: String },
}

impl TrackerError {
    /// Whether this error was recorded by a failed processing callback.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing { .. })
    }

    /// Whether this error rejected a split request.
    #[must_use]
    pub fn is_split_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidFraction(_) | Self::NothingToSplit { .. } | Self::InvalidSplitPoint { .. }
        )
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFraction(fraction) => {
                write!(f, "split fraction {fraction} is outside [0, 1]")
            }
            Self::NothingToSplit { restriction } => {
                write!(f, "nothing left to split in {restriction}")
            }
            Self::InvalidSplitPoint { position, restriction } => {
                write!(f, "split point {position} is outside {restriction}")
            }
            Self::InvalidRestriction { start, end } => {
                write!(f, "invalid restriction: start {start} is after end {end}")
            }
            Self::ClaimBeforeStart { position, restriction } => {
                write!(f, "cannot claim position {position} before the start of {restriction}")
            }
            Self::NonMonotonicClaim { position, last_attempted } => write!(
                f,
                "cannot claim position {position}: last attempted position was {last_attempted}"
            ),
            Self::Unfinished { restriction, next } => write!(
                f,
                "work in {restriction} was not fully attempted, next unclaimed position is {next}"
            ),
            Self::Processing { position, message } => {
                write!(f, "processing failed at position {position}: {message}")
            }
        }
    }
}

impl std::error::Error for TrackerError {}
