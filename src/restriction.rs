//! Restrictions: contiguous, totally ordered spans of work.
//!
//! A restriction is created once per element by a splittable function, may be
//! subdivided before processing starts, and is then owned by exactly one
//! tracker. Splitting a restriction at a position yields two restrictions whose
//! union is the original and whose intersection is empty.

use crate::error::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A span of work with split-point arithmetic.
pub trait Restriction: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Totally ordered position type that trackers claim.
    type Position: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// First position of the span (inclusive).
    fn start(&self) -> Self::Position;

    /// End of the span (exclusive).
    fn end(&self) -> Self::Position;

    /// Cost estimate used for split-fraction arithmetic and progress.
    fn size(&self) -> f64;

    /// Split into `[start, position)` and `[position, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidSplitPoint`] if `position` is outside `[start, end]`.
    fn split_at(&self, position: Self::Position) -> TrackerResult<(Self, Self)>;

    /// Whether the span contains no positions.
    fn is_empty(&self) -> bool {
        self.start() >= self.end()
    }
}

/// A half-open range of `i64` offsets, `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetRange {
    pub start: i64,
    pub end: i64,
}

impl OffsetRange {
    /// Create a new range.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`. Use [`OffsetRange::try_new`] for untrusted bounds.
    #[must_use]
    pub fn new(start: i64, end: i64) -> Self {
        assert!(start <= end, "invalid offset range: start {start} > end {end}");
        Self { start, end }
    }

    /// Create a new range, rejecting inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRestriction`] if `start > end`.
    pub fn try_new(start: i64, end: i64) -> TrackerResult<Self> {
        if start > end {
            return Err(TrackerError::InvalidRestriction {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Number of offsets in the range.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Divide the range into `n` contiguous pieces of near-equal size.
    ///
    /// Pieces that would be empty are dropped, so fewer than `n` ranges come
    /// back when the range has fewer than `n` offsets. `n <= 1` returns the
    /// range unchanged.
    #[must_use]
    pub fn even_splits(&self, n: usize) -> Vec<Self> {
        if n <= 1 {
            return vec![*self];
        }
        let n = n as i128;
        let size = i128::from(self.end) - i128::from(self.start);
        let start = i128::from(self.start);
        // i128 keeps `i * size` from overflowing for ranges spanning most of i64
        let bound = |i: i128| (start + i * size / n) as i64;
        (0..n)
            .map(|i| Self { start: bound(i), end: bound(i + 1) })
            .filter(|piece| piece.end > piece.start)
            .collect()
    }
}

impl Restriction for OffsetRange {
    type Position = i64;

    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }

    fn size(&self) -> f64 {
        self.end as f64 - self.start as f64
    }

    fn split_at(&self, position: i64) -> TrackerResult<(Self, Self)> {
        if position < self.start || position > self.end {
            return Err(TrackerError::InvalidSplitPoint {
                position: position.to_string(),
                restriction: self.to_string(),
            });
        }
        Ok((
            Self { start: self.start, end: position },
            Self { start: position, end: self.end },
        ))
    }
}

impl fmt::Display for OffsetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl TryFrom<Range<i64>> for OffsetRange {
    type Error = TrackerError;

    fn try_from(r: Range<i64>) -> TrackerResult<Self> {
        Self::try_new(r.start, r.end)
    }
}
