// Weighted multi-sig governance on the origin chain
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::governance::digest::{ballot_digest, bridge_ballot_digest, proposal_hash};
use crate::governance::proposal::{Proposal, SignedVote, VoteAggregator, VoteStatus};
use crate::governance::GovernanceError;
use crate::types::{Address, ChainId, Hash, Nonce, PeriodNumber, Signature64};

/// Roster entry: one governor and its voting weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedOrganization {
    pub governor: Address,
    pub weight: u64,
}

#[derive(Debug)]
struct ProposalRecord {
    proposal: Proposal,
    hash: Hash,
    votes: VoteAggregator,
}

/// Proposal voting and bridge-operator synchronization.
///
/// Governors never transact here directly; they sign ballots off-chain and
/// anyone may submit the signature batch. Every ballot is verified against
/// the roster before any state changes (validate-then-commit).
#[derive(Debug)]
pub struct GovernanceAdmin {
    numerator: u64,
    denominator: u64,
    governors: BTreeMap<Address, u64>,

    /// Highest accepted proposal nonce per target chain; nonces are strictly
    /// sequential starting at 1
    last_nonce: HashMap<ChainId, Nonce>,
    proposals: HashMap<(ChainId, Nonce), ProposalRecord>,

    /// Open bridge-operator ballots, keyed by their digest
    bridge_ballots: HashMap<Hash, VoteAggregator>,
    bridge_ballot_periods: HashMap<Hash, PeriodNumber>,
    last_synced_period: Option<PeriodNumber>,
    synced_operators: Vec<Address>,
}

impl GovernanceAdmin {
    pub fn new(roster: Vec<TrustedOrganization>, numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
            governors: roster.into_iter().map(|o| (o.governor, o.weight)).collect(),
            last_nonce: HashMap::new(),
            proposals: HashMap::new(),
            bridge_ballots: HashMap::new(),
            bridge_ballot_periods: HashMap::new(),
            last_synced_period: None,
            synced_operators: Vec::new(),
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.governors.values().sum()
    }

    /// Register a proposal and tally its accompanying signed ballots in one
    /// step. An approved proposal is considered executed immediately.
    pub fn propose_and_cast_votes(
        &mut self,
        proposal: Proposal,
        votes: &[SignedVote],
    ) -> Result<VoteStatus, GovernanceError> {
        if !proposal.is_well_formed() {
            return Err(GovernanceError::MalformedProposal);
        }
        let expected = self.last_nonce.get(&proposal.chain_id).copied().unwrap_or(0) + 1;
        if proposal.nonce != expected {
            return Err(GovernanceError::InvalidNonce { expected, got: proposal.nonce });
        }

        let hash = proposal_hash(&proposal);
        self.verify_ballots(hash, votes, None)?;

        let chain = proposal.chain_id;
        let nonce = proposal.nonce;
        self.last_nonce.insert(chain, nonce);
        let mut record = ProposalRecord { proposal, hash, votes: VoteAggregator::new() };
        for vote in votes {
            record.votes.record(vote.governor, self.governors[&vote.governor], vote.support);
        }
        let status = self.settle_proposal(&mut record.votes);
        info!(%chain, nonce, %hash, ?status, "proposal created");
        self.proposals.insert((chain, nonce), record);
        Ok(status)
    }

    /// Tally additional ballots for a pending proposal
    pub fn cast_votes(
        &mut self,
        chain: ChainId,
        nonce: Nonce,
        votes: &[SignedVote],
    ) -> Result<VoteStatus, GovernanceError> {
        let hash = match self.proposals.get(&(chain, nonce)) {
            Some(record) => {
                if record.votes.status != VoteStatus::Pending {
                    return Err(GovernanceError::VotingEnded { chain, nonce });
                }
                record.hash
            }
            None => return Err(GovernanceError::UnknownProposal { chain, nonce }),
        };
        let already_voted = self.proposals[&(chain, nonce)].votes.voted.clone();
        self.verify_ballots(hash, votes, Some(&already_voted))?;

        let weights: Vec<u64> = votes.iter().map(|v| self.governors[&v.governor]).collect();
        let total = self.total_weight();
        let (numerator, denominator) = (self.numerator, self.denominator);
        let record = self
            .proposals
            .get_mut(&(chain, nonce))
            .ok_or(GovernanceError::UnknownProposal { chain, nonce })?;
        for (vote, weight) in votes.iter().zip(weights) {
            record.votes.record(vote.governor, weight, vote.support);
        }
        let status = record.votes.settle(total, numerator, denominator);
        let status = if status == VoteStatus::Approved {
            record.votes.status = VoteStatus::Executed;
            VoteStatus::Executed
        } else {
            status
        };
        debug!(%chain, nonce, ?status, "ballots tallied");
        Ok(status)
    }

    /// Approve a bridge-operator set for a period from a batch of governor
    /// signatures. The period may not regress, and re-approving the set
    /// already in force is refused.
    pub fn vote_bridge_operators_by_signatures(
        &mut self,
        period: PeriodNumber,
        operators: &[Address],
        signatures: &[(Address, Signature64)],
    ) -> Result<bool, GovernanceError> {
        check_operator_list(operators)?;
        if let Some(last) = self.last_synced_period {
            if period < last {
                return Err(GovernanceError::PeriodRegression { last, got: period });
            }
            if period == last && operators == self.synced_operators.as_slice() {
                return Err(GovernanceError::OperatorsUnchanged(period));
            }
        }

        let digest = bridge_ballot_digest(period, operators);
        let mut seen = BTreeSet::new();
        for (governor, signature) in signatures {
            if !self.governors.contains_key(governor) {
                return Err(GovernanceError::UnknownGovernor(*governor));
            }
            let repeat = !seen.insert(*governor)
                || self
                    .bridge_ballots
                    .get(&digest)
                    .map(|ballot| ballot.has_voted(governor))
                    .unwrap_or(false);
            if repeat {
                return Err(GovernanceError::AlreadyVoted(*governor));
            }
            if !governor.verify(digest.as_bytes(), signature.as_bytes()) {
                return Err(GovernanceError::InvalidSignature(*governor));
            }
        }

        let total = self.total_weight();
        let weights: Vec<u64> = signatures.iter().map(|(g, _)| self.governors[g]).collect();
        let ballot = self.bridge_ballots.entry(digest).or_default();
        for ((governor, _), weight) in signatures.iter().zip(weights) {
            ballot.record(*governor, weight, crate::governance::VoteSupport::For);
        }
        self.bridge_ballot_periods.insert(digest, period);
        let approved =
            ballot.settle(total, self.numerator, self.denominator) == VoteStatus::Approved;
        if approved {
            info!(period, operators = operators.len(), "bridge operator set synced");
            self.last_synced_period = Some(period);
            self.synced_operators = operators.to_vec();
        }
        Ok(approved)
    }

    // --- Queries ---

    pub fn proposal_status(&self, chain: ChainId, nonce: Nonce) -> Option<VoteStatus> {
        self.proposals.get(&(chain, nonce)).map(|r| r.votes.status)
    }

    pub fn proposal_voted(&self, chain: ChainId, nonce: Nonce, governor: &Address) -> bool {
        self.proposals
            .get(&(chain, nonce))
            .map(|r| r.votes.has_voted(governor))
            .unwrap_or(false)
    }

    pub fn proposal_content(&self, chain: ChainId, nonce: Nonce) -> Option<&Proposal> {
        self.proposals.get(&(chain, nonce)).map(|r| &r.proposal)
    }

    pub fn bridge_operators_voted(&self, period: PeriodNumber, governor: &Address) -> bool {
        self.bridge_ballots.iter().any(|(digest, ballot)| {
            self.bridge_ballot_periods.get(digest) == Some(&period) && ballot.has_voted(governor)
        })
    }

    pub fn last_synced_bridge_period(&self) -> Option<PeriodNumber> {
        self.last_synced_period
    }

    pub fn bridge_operators(&self) -> &[Address] {
        &self.synced_operators
    }

    // --- Internals ---

    fn verify_ballots(
        &self,
        hash: Hash,
        votes: &[SignedVote],
        already_voted: Option<&BTreeSet<Address>>,
    ) -> Result<(), GovernanceError> {
        let mut seen = BTreeSet::new();
        for vote in votes {
            if !self.governors.contains_key(&vote.governor) {
                return Err(GovernanceError::UnknownGovernor(vote.governor));
            }
            if !seen.insert(vote.governor)
                || already_voted.map(|set| set.contains(&vote.governor)).unwrap_or(false)
            {
                return Err(GovernanceError::AlreadyVoted(vote.governor));
            }
            let digest = ballot_digest(&hash, vote.support);
            if !vote.governor.verify(digest.as_bytes(), vote.signature.as_bytes()) {
                return Err(GovernanceError::InvalidSignature(vote.governor));
            }
        }
        Ok(())
    }

    fn settle_proposal(&self, votes: &mut VoteAggregator) -> VoteStatus {
        let status = votes.settle(self.total_weight(), self.numerator, self.denominator);
        if status == VoteStatus::Approved {
            votes.status = VoteStatus::Executed;
            VoteStatus::Executed
        } else {
            status
        }
    }
}

/// Operator lists must be non-empty and strictly ascending (sorted, unique)
/// so equal sets always have equal digests
pub(crate) fn check_operator_list(operators: &[Address]) -> Result<(), GovernanceError> {
    if operators.is_empty() || operators.windows(2).any(|w| w[0] >= w[1]) {
        return Err(GovernanceError::MalformedOperatorList);
    }
    Ok(())
}
