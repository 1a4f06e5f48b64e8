// Mainchain mirror of governance decisions
//
// A relayer carries an approved proposal (or bridge-operator set) together
// with the governor signatures that approved it. This side re-verifies the
// whole signature batch against its own roster copy; it trusts the relayer
// for liveness only, never for content.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::info;

use crate::governance::admin::{check_operator_list, TrustedOrganization};
use crate::governance::digest::{ballot_digest, bridge_ballot_digest, proposal_hash};
use crate::governance::proposal::{Proposal, SignedVote, VoteStatus, VoteSupport};
use crate::governance::GovernanceError;
use crate::types::{Address, ChainId, Hash, Nonce, PeriodNumber, Signature64};

#[derive(Debug)]
pub struct MainchainGovernance {
    relayer: Address,
    numerator: u64,
    denominator: u64,
    governors: BTreeMap<Address, u64>,

    /// Proposals already carried over, by (origin chain, nonce)
    relayed_proposals: HashMap<(ChainId, Nonce), Hash>,
    last_relayed_period: Option<PeriodNumber>,
    bridge_operators: Vec<Address>,
}

impl MainchainGovernance {
    pub fn new(
        relayer: Address,
        roster: Vec<TrustedOrganization>,
        numerator: u64,
        denominator: u64,
    ) -> Self {
        Self {
            relayer,
            numerator,
            denominator,
            governors: roster.into_iter().map(|o| (o.governor, o.weight)).collect(),
            relayed_proposals: HashMap::new(),
            last_relayed_period: None,
            bridge_operators: Vec::new(),
        }
    }

    /// Accept an approved proposal from the origin chain. The attached
    /// ballots must reach quorum on their own; a (chain, nonce) pair can
    /// only ever be relayed once.
    pub fn relay_proposal(
        &mut self,
        caller: Address,
        proposal: Proposal,
        votes: &[SignedVote],
    ) -> Result<VoteStatus, GovernanceError> {
        if caller != self.relayer {
            return Err(GovernanceError::NotRelayer(caller));
        }
        if !proposal.is_well_formed() {
            return Err(GovernanceError::MalformedProposal);
        }
        let chain = proposal.chain_id;
        let nonce = proposal.nonce;
        if self.relayed_proposals.contains_key(&(chain, nonce)) {
            return Err(GovernanceError::AlreadyRelayed { chain, nonce });
        }

        let hash = proposal_hash(&proposal);
        let mut seen = BTreeSet::new();
        let mut for_weight: u64 = 0;
        for vote in votes {
            let Some(weight) = self.governors.get(&vote.governor) else {
                return Err(GovernanceError::UnknownGovernor(vote.governor));
            };
            if !seen.insert(vote.governor) {
                return Err(GovernanceError::AlreadyVoted(vote.governor));
            }
            let digest = ballot_digest(&hash, vote.support);
            if !vote.governor.verify(digest.as_bytes(), vote.signature.as_bytes()) {
                return Err(GovernanceError::InvalidSignature(vote.governor));
            }
            if vote.support == VoteSupport::For {
                for_weight += weight;
            }
        }
        self.require_quorum(for_weight)?;

        self.relayed_proposals.insert((chain, nonce), hash);
        info!(%chain, nonce, %hash, "proposal relayed");
        Ok(VoteStatus::Executed)
    }

    /// Accept a bridge-operator set approved on the origin chain. Relayed
    /// periods are strictly increasing.
    pub fn relay_bridge_operators(
        &mut self,
        caller: Address,
        period: PeriodNumber,
        operators: &[Address],
        signatures: &[(Address, Signature64)],
    ) -> Result<(), GovernanceError> {
        if caller != self.relayer {
            return Err(GovernanceError::NotRelayer(caller));
        }
        check_operator_list(operators)?;
        if let Some(last) = self.last_relayed_period {
            if period <= last {
                return Err(GovernanceError::PeriodRegression { last, got: period });
            }
        }

        let digest = bridge_ballot_digest(period, operators);
        let mut seen = BTreeSet::new();
        let mut weight: u64 = 0;
        for (governor, signature) in signatures {
            let Some(w) = self.governors.get(governor) else {
                return Err(GovernanceError::UnknownGovernor(*governor));
            };
            if !seen.insert(*governor) {
                return Err(GovernanceError::AlreadyVoted(*governor));
            }
            if !governor.verify(digest.as_bytes(), signature.as_bytes()) {
                return Err(GovernanceError::InvalidSignature(*governor));
            }
            weight += w;
        }
        self.require_quorum(weight)?;

        self.last_relayed_period = Some(period);
        self.bridge_operators = operators.to_vec();
        info!(period, operators = operators.len(), "bridge operator set relayed");
        Ok(())
    }

    // --- Queries ---

    pub fn proposal_relayed(&self, chain: ChainId, nonce: Nonce) -> bool {
        self.relayed_proposals.contains_key(&(chain, nonce))
    }

    pub fn bridge_operators_relayed(&self, period: PeriodNumber) -> bool {
        self.last_relayed_period >= Some(period)
    }

    pub fn last_relayed_period(&self) -> Option<PeriodNumber> {
        self.last_relayed_period
    }

    pub fn bridge_operators(&self) -> &[Address] {
        &self.bridge_operators
    }

    fn require_quorum(&self, weight: u64) -> Result<(), GovernanceError> {
        let total: u64 = self.governors.values().sum();
        // smallest weight satisfying weight/total >= numerator/denominator
        let required = (total as u128 * self.numerator as u128).div_ceil(self.denominator as u128);
        if (weight as u128) < required {
            return Err(GovernanceError::InsufficientVoteWeight {
                got: weight,
                required: required as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::test_keys;
    use ed25519_dalek::Signer;

    fn roster() -> Vec<TrustedOrganization> {
        vec![
            TrustedOrganization { governor: test_keys::address(1), weight: 100 },
            TrustedOrganization { governor: test_keys::address(2), weight: 49 },
            TrustedOrganization { governor: test_keys::address(3), weight: 51 },
        ]
    }

    fn relayer() -> Address {
        test_keys::address(50)
    }

    fn mainchain() -> MainchainGovernance {
        MainchainGovernance::new(relayer(), roster(), 1, 2)
    }

    fn proposal(nonce: Nonce) -> Proposal {
        Proposal {
            nonce,
            chain_id: ChainId(2),
            targets: vec![test_keys::address(9)],
            values: vec![0],
            calldatas: vec![vec![0x02]],
            gas_amounts: vec![50_000],
        }
    }

    fn signed_vote(seed: u8, p: &Proposal) -> SignedVote {
        let key = test_keys::signing_key(seed);
        let digest = ballot_digest(&proposal_hash(p), VoteSupport::For);
        SignedVote {
            governor: test_keys::address(seed),
            support: VoteSupport::For,
            signature: Signature64::from_bytes(key.sign(digest.as_bytes()).to_bytes()),
        }
    }

    fn bridge_sig(seed: u8, period: PeriodNumber, ops: &[Address]) -> (Address, Signature64) {
        let key = test_keys::signing_key(seed);
        let digest = bridge_ballot_digest(period, ops);
        (
            test_keys::address(seed),
            Signature64::from_bytes(key.sign(digest.as_bytes()).to_bytes()),
        )
    }

    #[test]
    fn test_relay_requires_the_relayer() {
        let mut chain = mainchain();
        let p = proposal(1);
        let vote = signed_vote(1, &p);
        let err = chain.relay_proposal(test_keys::address(1), p, &[vote]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_relay_verifies_quorum_itself() {
        let mut chain = mainchain();
        let p = proposal(1);
        let light = signed_vote(2, &p);
        let err = chain.relay_proposal(relayer(), p.clone(), &[light]).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::InsufficientVoteWeight { got: 49, required: 100 }
        ));

        let heavy = signed_vote(1, &p);
        let status = chain.relay_proposal(relayer(), p, &[heavy]).unwrap();
        assert_eq!(status, VoteStatus::Executed);
        assert!(chain.proposal_relayed(ChainId(2), 1));
    }

    #[test]
    fn test_same_proposal_cannot_be_relayed_twice() {
        let mut chain = mainchain();
        let p = proposal(1);
        let vote = signed_vote(1, &p);
        chain.relay_proposal(relayer(), p.clone(), &[vote]).unwrap();
        let err = chain.relay_proposal(relayer(), p, &[vote]).unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyRelayed { .. }));
    }

    #[test]
    fn test_bridge_relay_periods_strictly_increase() {
        let mut chain = mainchain();
        let mut ops: Vec<Address> = vec![test_keys::address(10), test_keys::address(11)];
        ops.sort();

        chain
            .relay_bridge_operators(relayer(), 4, &ops, &[bridge_sig(1, 4, &ops)])
            .unwrap();
        assert!(chain.bridge_operators_relayed(4));
        assert_eq!(chain.bridge_operators(), ops.as_slice());

        // equal period is refused on the relay side even with a new set
        let err = chain
            .relay_bridge_operators(relayer(), 4, &ops, &[bridge_sig(3, 4, &ops)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ordering);

        chain
            .relay_bridge_operators(relayer(), 5, &ops, &[bridge_sig(1, 5, &ops)])
            .unwrap();
        assert_eq!(chain.last_relayed_period(), Some(5));
    }
}
