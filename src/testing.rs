//! Testing utilities for splittable functions and trackers.
//!
//! - **Assertions**: check that emitted offsets and split results partition a
//!   range with no position repeated or dropped
//! - **Drivers**: claim every offset of a tracker the way a processing loop would
//!
//! Deterministic claim/split interleavings live in [`coordination`](crate::coordination).
//!
//! # Example
//!
//! ```
//! use dynsplit::testing::*;
//! use dynsplit::{OffsetRange, OffsetRangeTracker, RestrictionTracker};
//!
//! let mut tracker = OffsetRangeTracker::new(OffsetRange::new(0, 20));
//! let split = tracker.try_split(0.5).unwrap();
//! let claimed = claim_all(&mut tracker);
//!
//! assert_partition(&OffsetRange::new(0, 20), 0, &split);
//! assert_contiguous(&claimed, 0, split.primary.end);
//! ```

use crate::restriction::OffsetRange;
use crate::split::SplitResult;
use crate::tracker::{OffsetRangeTracker, RestrictionTracker};
use std::fmt::Debug;

/// Assert that `split` divides the unclaimed part of `original`.
///
/// `cursor` is the first unclaimed offset when the split happened. The primary
/// must start there, meet the residual without a gap, and the residual must
/// run to the end of `original`.
///
/// # Panics
///
/// Panics with a description of the first violated property.
pub fn assert_partition(original: &OffsetRange, cursor: i64, split: &SplitResult<OffsetRange>) {
    let SplitResult { primary, residual } = split;
    assert_eq!(
        primary.start, cursor,
        "Primary {primary} should start at the cursor {cursor}"
    );
    assert_eq!(
        primary.end, residual.start,
        "Primary {primary} and residual {residual} should meet"
    );
    assert_eq!(
        residual.end, original.end,
        "Residual {residual} should end where {original} ends"
    );
    assert!(
        primary.start <= primary.end && primary.end <= original.end,
        "Primary {primary} should lie inside {original}"
    );
}

/// Assert that `emitted` is exactly `start, start + 1, ..., end - 1`.
///
/// # Panics
///
/// Panics on the first repeated, skipped, or out-of-range offset.
pub fn assert_contiguous(emitted: &[i64], start: i64, end: i64) {
    let expected: Vec<i64> = (start..end).collect();
    assert_eq!(
        emitted.len(),
        expected.len(),
        "Emitted {} offsets, expected {} for [{start}, {end})\n  Emitted: {emitted:?}",
        emitted.len(),
        expected.len()
    );
    for (i, (got, want)) in emitted.iter().zip(&expected).enumerate() {
        assert_eq!(
            got, want,
            "Offset mismatch at index {i}\n  Emitted: {emitted:?}"
        );
    }
}

/// Assert that a sequence never moves backwards.
///
/// # Panics
///
/// Panics at the first decrease.
pub fn assert_monotonic<T: Debug + PartialOrd>(positions: &[T]) {
    for pair in positions.windows(2) {
        assert!(
            pair[0] <= pair[1],
            "Sequence decreased from {:?} to {:?}\n  Full: {positions:?}",
            pair[0],
            pair[1]
        );
    }
}

/// Claim offsets from the cursor onward until a claim fails, returning the claimed offsets.
pub fn claim_all(tracker: &mut OffsetRangeTracker) -> Vec<i64> {
    let mut claimed = Vec::new();
    let mut offset = tracker.cursor();
    while tracker.try_claim(offset) {
        claimed.push(offset);
        offset += 1;
    }
    claimed
}
