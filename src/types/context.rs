// BlockContext - Explicit execution context for every state transition
use super::address::Address;
use super::primitives::{BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};

/// Immutable per-block execution context.
///
/// Every state-changing operation receives one of these instead of reading
/// ambient "current block / current producer" globals, so a transition is a
/// pure function of (state, context, arguments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Current block number
    pub number: BlockNumber,

    /// Current block timestamp (seconds)
    pub timestamp: Timestamp,

    /// Designated block producer for this block
    pub producer: Address,
}

impl BlockContext {
    pub fn new(number: BlockNumber, timestamp: Timestamp, producer: Address) -> Self {
        Self {
            number,
            timestamp,
            producer,
        }
    }
}
