use super::{signaling_pair, Checkpoint, CheckpointControl, Interleaving, SignalingTracker};
use crate::config::DynSplitConfig;
use crate::restriction::OffsetRange;
use crate::split::SplitResult;
use crate::tracker::{OffsetRangeTracker, SharedTracker};
use anyhow::{anyhow, bail, ensure, Context, Result};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;
use tracing::debug;

type Probe = SignalingTracker<OffsetRangeTracker>;

/// One processing thread and one split request over an offset range.
///
/// The processing thread claims `start, start + 1, ...` until a claim fails
/// and emits every claimed offset. Claim checkpoints fire for
/// `block_position`, which defaults to the start of the range.
#[derive(Clone, Debug)]
pub struct SplitScenario {
    pub restriction: OffsetRange,
    pub fraction: f64,
    pub block_position: i64,
    pub timeout: Duration,
}

/// What a scenario produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioOutcome {
    pub interleaving: Interleaving,
    pub original: OffsetRange,
    pub block_position: i64,
    /// Offsets emitted by the processing thread, in claim order.
    pub emitted: Vec<i64>,
    pub split: SplitResult<OffsetRange>,
    /// The tracker's restriction once processing finished.
    pub final_restriction: OffsetRange,
}

impl SplitScenario {
    #[must_use]
    pub fn new(restriction: OffsetRange) -> Self {
        Self::from_config(restriction, &DynSplitConfig::default())
    }

    #[must_use]
    pub fn from_config(restriction: OffsetRange, config: &DynSplitConfig) -> Self {
        Self {
            restriction,
            fraction: config.split_fraction,
            block_position: restriction.start,
            timeout: config.signal_timeout(),
        }
    }

    #[must_use]
    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// Fire the claim checkpoints when claiming `position`.
    #[must_use]
    pub fn block_at(mut self, position: i64) -> Self {
        self.block_position = position;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the scenario under `interleaving`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is misconfigured, a checkpoint is not
    /// reached in time, a worker thread panics, the split is rejected, or the
    /// processing thread leaves an error on the tracker.
    pub fn run(&self, interleaving: Interleaving) -> Result<ScenarioOutcome> {
        ensure!(
            (0.0..=1.0).contains(&self.fraction),
            "split fraction {} is outside [0, 1]",
            self.fraction
        );
        ensure!(
            self.block_position >= self.restriction.start
                && self.block_position <= self.restriction.end,
            "block position {} is outside {}",
            self.block_position,
            self.restriction
        );

        let tracker = SharedTracker::new(OffsetRangeTracker::new(self.restriction));
        let (probe, control) = signaling_pair(tracker.clone(), self.block_position, self.timeout);
        debug!(%interleaving, restriction = %self.restriction, "running split scenario");

        let (emitted, split) = thread::scope(|s| match interleaving {
            Interleaving::NonBlocking => self.non_blocking(s, &probe, control),
            Interleaving::ClaimBlocksSplit => self.claim_blocks_split(s, &probe, control),
            Interleaving::SplitBlocksClaim => self.split_blocks_claim(s, &probe, control),
        })
        .with_context(|| format!("{interleaving} scenario over {}", self.restriction))?;

        if let Some(err) = tracker.error() {
            return Err(err).context("processing thread left an error on the tracker");
        }
        Ok(ScenarioOutcome {
            interleaving,
            original: self.restriction,
            block_position: self.block_position,
            emitted,
            split,
            final_restriction: tracker.current_restriction(),
        })
    }

    /// Split to completion, then start processing.
    fn non_blocking<'scope>(
        &self,
        s: &'scope Scope<'scope, '_>,
        probe: &Probe,
        control: CheckpointControl,
    ) -> Result<(Vec<i64>, SplitResult<OffsetRange>)> {
        let splitting = spawn_split(s, probe, self.fraction);
        control.pass(Checkpoint::SplitStarted)?;
        control.pass(Checkpoint::SplitLocked)?;
        let split = join(splitting, "split")?.context("split request failed")?;

        let processing = spawn_processing(s, probe);
        // The processing thread only reaches the block position if the primary extends to it.
        if self.block_position <= split.primary.end {
            control.pass(Checkpoint::ClaimStarted)?;
            control.pass(Checkpoint::ClaimLocked)?;
            control.pass(Checkpoint::ClaimVisible)?;
        }
        let emitted = join(processing, "processing")?;
        Ok((emitted, split))
    }

    /// Hold the block-position claim inside the lock while the split queues behind it.
    fn claim_blocks_split<'scope>(
        &self,
        s: &'scope Scope<'scope, '_>,
        probe: &Probe,
        control: CheckpointControl,
    ) -> Result<(Vec<i64>, SplitResult<OffsetRange>)> {
        let processing = spawn_processing(s, probe);
        control.pass(Checkpoint::ClaimStarted)?;
        control.await_arrival(Checkpoint::ClaimLocked)?;

        let splitting = spawn_split(s, probe, self.fraction);
        control.pass(Checkpoint::SplitStarted)?;

        // Finish the claim, but keep processing from claiming anything else
        // until the split has gone through.
        control.release(Checkpoint::ClaimLocked)?;
        control.await_arrival(Checkpoint::ClaimVisible)?;
        control.pass(Checkpoint::SplitLocked)?;
        let split = join(splitting, "split")?.context("split request failed")?;

        control.release(Checkpoint::ClaimVisible)?;
        let emitted = join(processing, "processing")?;
        Ok((emitted, split))
    }

    /// Hold the split inside the lock while the block-position claim queues behind it.
    fn split_blocks_claim<'scope>(
        &self,
        s: &'scope Scope<'scope, '_>,
        probe: &Probe,
        control: CheckpointControl,
    ) -> Result<(Vec<i64>, SplitResult<OffsetRange>)> {
        let processing = spawn_processing(s, probe);
        control.await_arrival(Checkpoint::ClaimStarted)?;

        let splitting = spawn_split(s, probe, self.fraction);
        control.pass(Checkpoint::SplitStarted)?;
        control.await_arrival(Checkpoint::SplitLocked)?;

        control.release(Checkpoint::ClaimStarted)?;
        control.release(Checkpoint::SplitLocked)?;
        let split = join(splitting, "split")?.context("split request failed")?;

        control.pass(Checkpoint::ClaimLocked)?;
        control.pass(Checkpoint::ClaimVisible)?;
        let emitted = join(processing, "processing")?;
        Ok((emitted, split))
    }
}

impl ScenarioOutcome {
    /// Check that the emitted offsets and the split partition the original range.
    ///
    /// The processing thread must have emitted exactly
    /// `[original.start, primary.end)`, the residual must pick up where the
    /// primary ends and run to the original end, and the primary must start
    /// where the interleaving says the cursor was when the split took the lock.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated property.
    pub fn verify(&self) -> Result<()> {
        let SplitResult { primary, residual } = &self.split;
        ensure!(
            self.split.is_contiguous(),
            "primary {primary} and residual {residual} do not meet"
        );
        ensure!(
            residual.end == self.original.end,
            "residual {residual} does not run to the end of {}",
            self.original
        );
        ensure!(
            primary.start >= self.original.start
                && primary.start <= primary.end
                && primary.end <= self.original.end,
            "primary {primary} is not inside {}",
            self.original
        );

        let expected: Vec<i64> = (self.original.start..primary.end).collect();
        if self.emitted != expected {
            bail!(
                "emitted {:?}, expected every offset of [{}, {})",
                self.emitted,
                self.original.start,
                primary.end
            );
        }
        ensure!(
            self.final_restriction == OffsetRange::new(self.original.start, primary.end),
            "tracker ended with {}, expected [{}, {})",
            self.final_restriction,
            self.original.start,
            primary.end
        );

        let expected_start = match self.interleaving {
            Interleaving::NonBlocking => self.original.start,
            Interleaving::ClaimBlocksSplit => self.block_position + 1,
            Interleaving::SplitBlocksClaim => self.block_position,
        };
        ensure!(
            primary.start == expected_start,
            "{} split saw cursor {}, expected {expected_start}",
            self.interleaving,
            primary.start
        );
        Ok(())
    }
}

fn spawn_processing<'scope>(
    s: &'scope Scope<'scope, '_>,
    probe: &Probe,
) -> ScopedJoinHandle<'scope, Vec<i64>> {
    let probe = probe.clone();
    s.spawn(move || {
        let mut emitted = Vec::new();
        let mut offset = probe.current_restriction().start;
        while probe.try_claim(offset) {
            emitted.push(offset);
            offset += 1;
        }
        emitted
    })
}

fn spawn_split<'scope>(
    s: &'scope Scope<'scope, '_>,
    probe: &Probe,
    fraction: f64,
) -> ScopedJoinHandle<'scope, crate::TrackerResult<SplitResult<OffsetRange>>> {
    let probe = probe.clone();
    s.spawn(move || probe.try_split(fraction))
}

fn join<T>(handle: ScopedJoinHandle<'_, T>, role: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("{role} thread panicked"))
}
