//! Deterministic claim/split interleavings.
//!
//! A processing thread and a split-request thread only synchronize through the
//! tracker lock, so the order in which they acquire it is normally up to the
//! scheduler. This module wraps a tracker with checkpoints that pause each
//! thread at well-defined points, letting a coordinating thread construct each
//! legal interleaving on purpose:
//!
//! | Checkpoint                   | Where the thread pauses                     |
//! |------------------------------|---------------------------------------------|
//! | [`Checkpoint::ClaimStarted`] | before a claim tries to take the lock       |
//! | [`Checkpoint::ClaimLocked`]  | claim holds the lock, before it takes effect |
//! | [`Checkpoint::ClaimVisible`] | after the claim released the lock           |
//! | [`Checkpoint::SplitStarted`] | before a split tries to take the lock       |
//! | [`Checkpoint::SplitLocked`]  | split holds the lock, before it takes effect |
//!
//! [`SplitScenario`] drives the three interleavings of [`Interleaving`] over
//! an [`OffsetRange`](crate::OffsetRange) and reports what the processing
//! thread emitted, so the result can be checked against the split.
//!
//! ```
//! use dynsplit::coordination::{Interleaving, SplitScenario};
//! use dynsplit::OffsetRange;
//!
//! # fn main() -> anyhow::Result<()> {
//! let outcome = SplitScenario::new(OffsetRange::new(0, 20)).run(Interleaving::NonBlocking)?;
//! outcome.verify()?;
//! assert_eq!(outcome.emitted, (0..10).collect::<Vec<_>>());
//! assert_eq!(outcome.split.residual, OffsetRange::new(10, 20));
//! # Ok(())
//! # }
//! ```

mod drivers;
mod signals;

pub use drivers::{ScenarioOutcome, SplitScenario};
pub use signals::{signaling_pair, CheckpointControl, SignalingTracker};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point at which a signaling tracker pauses a thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    ClaimStarted,
    ClaimLocked,
    ClaimVisible,
    SplitStarted,
    SplitLocked,
}

impl Checkpoint {
    pub const ALL: [Self; 5] = [
        Self::ClaimStarted,
        Self::ClaimLocked,
        Self::ClaimVisible,
        Self::SplitStarted,
        Self::SplitLocked,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ClaimStarted => "claim-started",
            Self::ClaimLocked => "claim-locked",
            Self::ClaimVisible => "claim-visible",
            Self::SplitStarted => "split-started",
            Self::SplitLocked => "split-locked",
        };
        f.write_str(name)
    }
}

/// The orderings of one claim and one split that a scenario can force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interleaving {
    /// The split finishes before the processing thread claims anything.
    NonBlocking,
    /// The block-position claim holds the lock while the split waits for it.
    ClaimBlocksSplit,
    /// The split holds the lock while the block-position claim waits for it.
    SplitBlocksClaim,
}

impl Interleaving {
    pub const ALL: [Self; 3] = [Self::NonBlocking, Self::ClaimBlocksSplit, Self::SplitBlocksClaim];
}

impl fmt::Display for Interleaving {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NonBlocking => "non-blocking",
            Self::ClaimBlocksSplit => "claim-blocks-split",
            Self::SplitBlocksClaim => "split-blocks-claim",
        };
        f.write_str(name)
    }
}
