//! Progress reporting for an in-flight restriction.

use serde::{Deserialize, Serialize};

/// Amount of work completed and remaining, in units of [`Restriction::size`].
///
/// [`Restriction::size`]: crate::Restriction::size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub done: f64,
    pub remaining: f64,
}

impl Progress {
    #[must_use]
    pub fn new(done: f64, remaining: f64) -> Self {
        Self { done, remaining }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.done + self.remaining
    }

    /// Share of the work already completed, in `[0, 1]`.
    ///
    /// An empty restriction counts as fully completed.
    #[must_use]
    pub fn fraction_completed(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            1.0
        } else {
            (self.done / total).clamp(0.0, 1.0)
        }
    }

    #[must_use]
    pub fn fraction_remaining(&self) -> f64 {
        1.0 - self.fraction_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions() {
        let p = Progress::new(5.0, 15.0);
        assert_eq!(p.total(), 20.0);
        assert_eq!(p.fraction_completed(), 0.25);
        assert_eq!(p.fraction_remaining(), 0.75);
    }

    #[test]
    fn empty_is_complete() {
        let p = Progress::default();
        assert_eq!(p.fraction_completed(), 1.0);
        assert_eq!(p.fraction_remaining(), 0.0);
    }
}
