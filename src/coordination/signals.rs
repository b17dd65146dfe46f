use super::Checkpoint;
use crate::error::TrackerResult;
use crate::progress::Progress;
use crate::split::SplitResult;
use crate::tracker::{PositionOf, RestrictionTracker, SharedTracker};
use crate::TrackerError;
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;
use tracing::trace;

/// Tracker-side half of one checkpoint.
struct Gate {
    arrived: Mutex<SyncSender<()>>,
    proceed: Mutex<Receiver<()>>,
}

/// A [`SharedTracker`] that pauses at each [`Checkpoint`] until the paired
/// [`CheckpointControl`] lets it continue.
///
/// Claim checkpoints fire only for `block_position`; every other claim runs
/// straight through. Split checkpoints fire on every split, so at most one
/// split should be requested per scenario.
pub struct SignalingTracker<T: RestrictionTracker> {
    tracker: SharedTracker<T>,
    block_position: PositionOf<T>,
    gates: Arc<Vec<Gate>>,
}

impl<T: RestrictionTracker> Clone for SignalingTracker<T> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            block_position: self.block_position,
            gates: Arc::clone(&self.gates),
        }
    }
}

/// Driver-side half: observes arrivals and releases paused threads.
///
/// Dropping the control releases every thread still paused, so an abandoned
/// scenario runs to completion instead of hanging.
pub struct CheckpointControl {
    arrived: Vec<Receiver<()>>,
    proceed: Vec<SyncSender<()>>,
    timeout: Duration,
}

/// Wrap `tracker` with checkpoints, returning the tracker handle for the
/// worker threads and the control for the coordinating thread.
pub fn signaling_pair<T: RestrictionTracker>(
    tracker: SharedTracker<T>,
    block_position: PositionOf<T>,
    timeout: Duration,
) -> (SignalingTracker<T>, CheckpointControl) {
    let mut gates = Vec::with_capacity(Checkpoint::ALL.len());
    let mut arrived = Vec::with_capacity(Checkpoint::ALL.len());
    let mut proceed = Vec::with_capacity(Checkpoint::ALL.len());
    for _ in Checkpoint::ALL {
        let (arrived_tx, arrived_rx) = sync_channel(1);
        let (proceed_tx, proceed_rx) = sync_channel(1);
        gates.push(Gate {
            arrived: Mutex::new(arrived_tx),
            proceed: Mutex::new(proceed_rx),
        });
        arrived.push(arrived_rx);
        proceed.push(proceed_tx);
    }
    (
        SignalingTracker {
            tracker,
            block_position,
            gates: Arc::new(gates),
        },
        CheckpointControl {
            arrived,
            proceed,
            timeout,
        },
    )
}

impl<T: RestrictionTracker> SignalingTracker<T> {
    fn pause(&self, checkpoint: Checkpoint) {
        let gate = &self.gates[checkpoint.index()];
        trace!(%checkpoint, "checkpoint reached");
        // A disconnected control means the driver gave up; keep going.
        if gate.arrived.lock().send(()).is_err() {
            return;
        }
        let _ = gate.proceed.lock().recv();
    }

    /// Claim `position`, pausing before the lock, inside it, and after the
    /// claim is visible when `position` is the block position.
    pub fn try_claim(&self, position: PositionOf<T>) -> bool {
        let signal = position == self.block_position;
        if signal {
            self.pause(Checkpoint::ClaimStarted);
        }
        let claimed = self.tracker.try_claim_inspect(position, || {
            if signal {
                self.pause(Checkpoint::ClaimLocked);
            }
        });
        if signal {
            self.pause(Checkpoint::ClaimVisible);
        }
        claimed
    }

    /// Split, pausing before the lock and inside it.
    ///
    /// # Errors
    ///
    /// See [`RestrictionTracker::try_split`].
    pub fn try_split(&self, fraction: f64) -> TrackerResult<SplitResult<T::Restriction>> {
        self.pause(Checkpoint::SplitStarted);
        self.tracker
            .try_split_inspect(fraction, || self.pause(Checkpoint::SplitLocked))
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.tracker.progress()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.tracker.is_done()
    }

    #[must_use]
    pub fn error(&self) -> Option<TrackerError> {
        self.tracker.error()
    }

    #[must_use]
    pub fn current_restriction(&self) -> T::Restriction {
        self.tracker.current_restriction()
    }

    #[must_use]
    pub fn tracker(&self) -> &SharedTracker<T> {
        &self.tracker
    }
}

impl CheckpointControl {
    /// Wait until a thread reaches `checkpoint`. The thread stays paused.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing arrives within the timeout, or if every
    /// tracker handle was dropped.
    pub fn await_arrival(&self, checkpoint: Checkpoint) -> Result<()> {
        match self.arrived[checkpoint.index()].recv_timeout(self.timeout) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) => Err(anyhow!(
                "timed out after {:?} waiting for checkpoint {checkpoint}",
                self.timeout
            )),
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow!("tracker dropped before reaching checkpoint {checkpoint}"))
            }
        }
    }

    /// Let the thread paused at `checkpoint` continue.
    ///
    /// # Errors
    ///
    /// Returns an error if every tracker handle was dropped.
    pub fn release(&self, checkpoint: Checkpoint) -> Result<()> {
        self.proceed[checkpoint.index()]
            .send(())
            .map_err(|_| anyhow!("tracker dropped before release of checkpoint {checkpoint}"))
    }

    /// Wait for `checkpoint`, then release it.
    ///
    /// # Errors
    ///
    /// See [`await_arrival`](Self::await_arrival) and [`release`](Self::release).
    pub fn pass(&self, checkpoint: Checkpoint) -> Result<()> {
        self.await_arrival(checkpoint)?;
        self.release(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restriction::OffsetRange;
    use crate::tracker::OffsetRangeTracker;
    use std::thread;

    fn pair(block: i64) -> (SignalingTracker<OffsetRangeTracker>, CheckpointControl) {
        let tracker = SharedTracker::new(OffsetRangeTracker::new(OffsetRange::new(0, 4)));
        signaling_pair(tracker, block, Duration::from_secs(5))
    }

    #[test]
    fn claims_off_the_block_position_do_not_pause() {
        let (probe, _control) = pair(3);
        assert!(probe.try_claim(0));
        assert!(probe.try_claim(1));
    }

    #[test]
    fn claim_pauses_at_every_checkpoint() {
        let (probe, control) = pair(0);
        thread::scope(|s| {
            let h = s.spawn(|| probe.try_claim(0));
            control.pass(Checkpoint::ClaimStarted).unwrap();
            control.await_arrival(Checkpoint::ClaimLocked).unwrap();
            // Held inside the lock.
            assert!(probe.tracker().is_locked());
            control.release(Checkpoint::ClaimLocked).unwrap();
            control.pass(Checkpoint::ClaimVisible).unwrap();
            assert!(h.join().unwrap());
        });
    }

    #[test]
    fn reads_go_to_the_wrapped_tracker_without_pausing() {
        let (probe, _control) = pair(0);
        assert!(!probe.is_done());
        assert_eq!(probe.progress(), Progress::new(0.0, 4.0));
        probe.tracker().fail(&anyhow!("bad input"));
        assert!(probe.is_done());
        assert!(probe.error().is_some_and(|e| e.is_processing()));
        assert_eq!(probe.current_restriction(), OffsetRange::new(0, 4));
    }

    #[test]
    fn dropped_control_releases_paused_threads() {
        let (probe, control) = pair(0);
        thread::scope(|s| {
            let h = s.spawn(|| probe.try_claim(0));
            control.await_arrival(Checkpoint::ClaimStarted).unwrap();
            drop(control);
            assert!(h.join().unwrap());
        });
    }
}
