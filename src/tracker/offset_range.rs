use super::RestrictionTracker;
use crate::error::{TrackerError, TrackerResult};
use crate::progress::Progress;
use crate::restriction::{OffsetRange, Restriction};
use crate::split::SplitResult;
use tracing::{debug, trace, warn};

/// Tracker claiming offsets of an [`OffsetRange`] in strictly increasing order.
///
/// The cursor is the next unclaimed offset: `start` before any claim, and one
/// past the last attempted offset afterwards. Splits never move the end of the
/// range below the cursor.
#[derive(Clone, Debug)]
pub struct OffsetRangeTracker {
    rest: OffsetRange,
    last_attempted: Option<i64>,
    stopped: bool,
    err: Option<TrackerError>,
}

impl OffsetRangeTracker {
    #[must_use]
    pub fn new(rest: OffsetRange) -> Self {
        Self {
            rest,
            last_attempted: None,
            stopped: false,
            err: None,
        }
    }

    /// The next offset that has not been attempted.
    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.last_attempted.map_or(self.rest.start, |last| last.saturating_add(1))
    }

    #[must_use]
    pub fn last_attempted(&self) -> Option<i64> {
        self.last_attempted
    }

    fn record(&mut self, err: TrackerError) {
        warn!(restriction = %self.rest, error = %err, "tracker stopped with error");
        self.stopped = true;
        // The first error wins; later failures are consequences of it.
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    fn last_attempted_label(&self) -> String {
        self.last_attempted
            .map_or_else(|| "none".to_string(), |p| p.to_string())
    }
}

impl RestrictionTracker for OffsetRangeTracker {
    type Restriction = OffsetRange;

    fn try_claim(&mut self, position: i64) -> bool {
        if self.stopped {
            return false;
        }
        if position < self.rest.start {
            self.record(TrackerError::ClaimBeforeStart {
                position: position.to_string(),
                restriction: self.rest.to_string(),
            });
            return false;
        }
        if let Some(last) = self.last_attempted {
            if position <= last {
                self.record(TrackerError::NonMonotonicClaim {
                    position: position.to_string(),
                    last_attempted: last.to_string(),
                });
                return false;
            }
        }

        self.last_attempted = Some(position);
        if position >= self.rest.end {
            debug!(restriction = %self.rest, position, "restriction exhausted");
            self.stopped = true;
            return false;
        }
        trace!(position, "claimed");
        true
    }

    fn try_split(&mut self, fraction: f64) -> TrackerResult<SplitResult<OffsetRange>> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(TrackerError::InvalidFraction(fraction));
        }
        let cursor = self.cursor();
        if self.stopped || cursor >= self.rest.end {
            return Err(TrackerError::NothingToSplit {
                restriction: self.rest.to_string(),
            });
        }

        // Ranges may be wider than i64::MAX, so the width is computed in i128.
        let remaining = i128::from(self.rest.end) - i128::from(cursor);
        let offset = ((remaining as f64) * fraction).floor() as i128;
        let split_point = i64::try_from(i128::from(cursor) + offset.clamp(0, remaining))
            .map_err(|_| TrackerError::InvalidSplitPoint {
                position: (i128::from(cursor) + offset).to_string(),
                restriction: self.rest.to_string(),
            })?;

        let (kept, residual) = self.rest.split_at(split_point)?;
        self.rest = kept;
        let primary = OffsetRange {
            start: cursor,
            end: split_point,
        };
        debug!(%primary, %residual, fraction, "split restriction");
        Ok(SplitResult::new(primary, residual))
    }

    fn progress(&self) -> Progress {
        let size = self.rest.size();
        let remaining = (self.rest.end as f64 - self.cursor() as f64).clamp(0.0, size);
        Progress::new(size - remaining, remaining)
    }

    fn is_done(&self) -> bool {
        self.err.is_some() || self.stopped || self.cursor() >= self.rest.end
    }

    fn error(&self) -> Option<TrackerError> {
        self.err.clone()
    }

    fn current_restriction(&self) -> OffsetRange {
        self.rest
    }

    fn fail(&mut self, message: String) {
        let position = self.last_attempted_label();
        self.record(TrackerError::Processing { position, message });
    }

    fn check_done(&self) -> TrackerResult<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if self.rest.is_empty() || self.cursor() >= self.rest.end {
            return Ok(());
        }
        Err(TrackerError::Unfinished {
            restriction: self.rest.to_string(),
            next: self.cursor().to_string(),
        })
    }
}
