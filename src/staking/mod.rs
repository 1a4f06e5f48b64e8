// Staking - candidate registration, pools and delegations

pub mod candidate;
pub mod ledger;

pub use candidate::{CandidateStatus, ValidatorCandidate};
pub use ledger::{CandidatePool, DelegationRecord, StakingError, StakingLedger};
