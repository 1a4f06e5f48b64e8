// Validator candidates and their lifecycle
use crate::types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

/// Lifecycle of a candidate pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStatus {
    /// Eligible for ranking into the validator set
    Active,
    /// Two-phase exit started; revoked at the first period boundary past
    /// the recorded deadline
    RenounceRequested { effective_at: Timestamp },
    /// Fully exited; self-stake refunded, pool kept only for undelegation
    Revoked,
}

/// Identity and terms of a validator candidate.
///
/// Balances live in the ledger's pool record; this struct carries only the
/// four identities plus the commission terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCandidate {
    /// Consensus identity (the address that produces blocks)
    pub consensus: Address,

    /// Pool admin: the only address allowed to stake/unstake/renounce
    pub admin: Address,

    /// Receives commission and bridge-operator rewards
    pub treasury: Address,

    /// Identity operating the cross-chain bridge on behalf of this pool
    pub bridge_operator: Address,

    /// Commission retained by the treasury, in basis points [0, 10_000]
    pub commission_bps: u32,

    pub status: CandidateStatus,
}

impl ValidatorCandidate {
    pub fn is_active(&self) -> bool {
        matches!(self.status, CandidateStatus::Active)
    }
}
