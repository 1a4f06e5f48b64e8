// Governance - weighted multi-sig proposals and the cross-chain relay

pub mod admin;
pub mod digest;
pub mod proposal;
pub mod relay;

pub use admin::{GovernanceAdmin, TrustedOrganization};
pub use proposal::{Proposal, SignedVote, VoteAggregator, VoteStatus, VoteSupport};
pub use relay::MainchainGovernance;

use crate::error::ErrorKind;
use crate::types::{Address, ChainId, Nonce, PeriodNumber};

#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("{0} is not a governor")]
    UnknownGovernor(Address),

    #[error("{0} is not the relayer")]
    NotRelayer(Address),

    #[error("proposal lists are empty or of unequal length")]
    MalformedProposal,

    #[error("expected proposal nonce {expected}, got {got}")]
    InvalidNonce { expected: Nonce, got: Nonce },

    #[error("no proposal {nonce} for {chain}")]
    UnknownProposal { chain: ChainId, nonce: Nonce },

    #[error("proposal {nonce} for {chain} was already relayed")]
    AlreadyRelayed { chain: ChainId, nonce: Nonce },

    #[error("voting on proposal {nonce} for {chain} has ended")]
    VotingEnded { chain: ChainId, nonce: Nonce },

    #[error("governor {0} already voted")]
    AlreadyVoted(Address),

    #[error("signature from governor {0} does not verify")]
    InvalidSignature(Address),

    #[error("ballot period {got} precedes the last handled period {last}")]
    PeriodRegression { last: PeriodNumber, got: PeriodNumber },

    #[error("operator set for period {0} is already in force")]
    OperatorsUnchanged(PeriodNumber),

    #[error("operator list is empty or contains duplicates")]
    MalformedOperatorList,

    #[error("vote weight {got} does not reach the {required} quorum")]
    InsufficientVoteWeight { got: u64, required: u64 },
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownGovernor(_) | Self::NotRelayer(_) => ErrorKind::Authorization,
            Self::InvalidNonce { .. } | Self::PeriodRegression { .. } => ErrorKind::Ordering,
            Self::InsufficientVoteWeight { .. } => ErrorKind::InsufficientResource,
            _ => ErrorKind::State,
        }
    }
}
