// Proposals, ballots and vote tallying
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, ChainId, Nonce, Signature64};

/// A batch of calls to execute on the target chain once approved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub nonce: Nonce,
    /// Chain the calls execute on; proposals for a foreign chain are
    /// approved here and carried over by a relayer
    pub chain_id: ChainId,
    pub targets: Vec<Address>,
    pub values: Vec<Balance>,
    pub calldatas: Vec<Vec<u8>>,
    pub gas_amounts: Vec<u64>,
}

impl Proposal {
    /// A proposal is well-formed when its four lists are non-empty and of
    /// equal length (one value/calldata/gas per target)
    pub fn is_well_formed(&self) -> bool {
        let n = self.targets.len();
        n > 0 && self.values.len() == n && self.calldatas.len() == n && self.gas_amounts.len() == n
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoteSupport {
    Against = 0,
    For = 1,
}

/// One governor's signed ballot over a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedVote {
    pub governor: Address,
    pub support: VoteSupport,
    pub signature: Signature64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteStatus {
    Pending,
    Approved,
    Executed,
    Rejected,
}

/// Weighted tally over one proposal. Terminal states are sticky: once
/// approved or rejected, further ballots are refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteAggregator {
    pub for_weight: u64,
    pub against_weight: u64,
    pub voted: BTreeSet<Address>,
    pub status: VoteStatus,
}

impl VoteAggregator {
    pub fn new() -> Self {
        Self {
            for_weight: 0,
            against_weight: 0,
            voted: BTreeSet::new(),
            status: VoteStatus::Pending,
        }
    }

    pub fn has_voted(&self, governor: &Address) -> bool {
        self.voted.contains(governor)
    }

    /// Record one weighted ballot; returns false if the governor already
    /// voted on this proposal
    pub fn record(&mut self, governor: Address, weight: u64, support: VoteSupport) -> bool {
        if !self.voted.insert(governor) {
            return false;
        }
        match support {
            VoteSupport::For => self.for_weight += weight,
            VoteSupport::Against => self.against_weight += weight,
        }
        true
    }

    /// Settle the status against the quorum `numerator / denominator` of
    /// `total_weight`. Approval needs the for-weight to reach quorum; a
    /// proposal is rejected once the against-weight makes that impossible.
    pub fn settle(&mut self, total_weight: u64, numerator: u64, denominator: u64) -> VoteStatus {
        if self.status == VoteStatus::Pending {
            if self.for_weight as u128 * denominator as u128
                >= total_weight as u128 * numerator as u128
            {
                self.status = VoteStatus::Approved;
            } else if self.against_weight as u128 * denominator as u128
                > (total_weight as u128) * (denominator as u128 - numerator as u128)
            {
                self.status = VoteStatus::Rejected;
            }
        }
        self.status
    }
}

impl Default for VoteAggregator {
    fn default() -> Self {
        Self::new()
    }
}
