//! The result of a successful split.

use crate::restriction::Restriction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A pair of restrictions produced by splitting the unclaimed remainder.
///
/// `primary` is the part of the remainder kept by the tracker that was split;
/// `residual` is handed back to the caller, who schedules it as new,
/// independent work. Together with the prefix claimed before the split they
/// reconstruct the original restriction: `primary.end == residual.start`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitResult<R> {
    pub primary: R,
    pub residual: R,
}

impl<R: Restriction> SplitResult<R> {
    #[must_use]
    pub fn new(primary: R, residual: R) -> Self {
        Self { primary, residual }
    }

    /// Whether the split handed any work back.
    ///
    /// Splitting at fraction `1.0` keeps everything, leaving an empty residual.
    #[must_use]
    pub fn has_residual(&self) -> bool {
        !self.residual.is_empty()
    }

    /// Whether the two halves meet without a gap or an overlap.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.primary.end() == self.residual.start()
    }
}

impl<R: fmt::Display> fmt::Display for SplitResult<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "primary {} / residual {}", self.primary, self.residual)
    }
}
