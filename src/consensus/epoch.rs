// Epoch - Deterministic block-count scheduling windows
use crate::types::{BlockNumber, EpochNumber};
use serde::{Deserialize, Serialize};

/// Epoch boundary math for a fixed blocks-per-epoch stride.
///
/// Periods are NOT derived from block numbers; they are time-bound and
/// tracked by the validator set manager. Epochs are pure arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSchedule {
    pub blocks_per_epoch: BlockNumber,
}

impl EpochSchedule {
    pub fn new(blocks_per_epoch: BlockNumber) -> Self {
        debug_assert!(blocks_per_epoch > 0);
        Self { blocks_per_epoch }
    }

    /// Epoch that the given block belongs to
    pub fn epoch_of(&self, block: BlockNumber) -> EpochNumber {
        block / self.blocks_per_epoch
    }

    /// Whether `block` is the last block of its epoch
    pub fn is_epoch_ending(&self, block: BlockNumber) -> bool {
        block % self.blocks_per_epoch == self.blocks_per_epoch - 1
    }

    /// Number of whole-or-partial epochs covering `blocks` blocks.
    /// Used for bail-out cost: a partially elapsed epoch still counts.
    pub fn epochs_covering(&self, blocks: BlockNumber) -> u64 {
        blocks.div_ceil(self.blocks_per_epoch)
    }
}
