// Structured digests for governance signatures
//
// Everything a governor signs is a Blake3 digest over a domain-prefixed,
// length-disciplined encoding: scalars little-endian, every variable-length
// list pre-hashed to a fixed 32 bytes. Two payloads that differ in any
// field, or that belong to different digest families, can never collide.
use crate::governance::proposal::{Proposal, VoteSupport};
use crate::types::{
    domain_separate, Address, Hash, PeriodNumber, DOMAIN_BALLOT, DOMAIN_BRIDGE_BALLOT,
    DOMAIN_PROPOSAL,
};

fn hash_address_list(addresses: &[Address]) -> Hash {
    let mut bytes = Vec::with_capacity(addresses.len() * 32);
    for addr in addresses {
        bytes.extend_from_slice(addr.as_bytes());
    }
    Hash::hash(&bytes)
}

fn hash_u128_list(values: &[u128]) -> Hash {
    let mut bytes = Vec::with_capacity(values.len() * 16);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Hash::hash(&bytes)
}

fn hash_u64_list(values: &[u64]) -> Hash {
    let mut bytes = Vec::with_capacity(values.len() * 8);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Hash::hash(&bytes)
}

fn hash_bytes_list(chunks: &[Vec<u8>]) -> Hash {
    let mut bytes = Vec::with_capacity(chunks.len() * 32);
    for chunk in chunks {
        bytes.extend_from_slice(Hash::hash(chunk).as_bytes());
    }
    Hash::hash(&bytes)
}

/// Content hash of a proposal; identifies it across chains and relays
pub fn proposal_hash(proposal: &Proposal) -> Hash {
    let mut payload = Vec::with_capacity(8 + 4 + 4 * 32);
    payload.extend_from_slice(&proposal.nonce.to_le_bytes());
    payload.extend_from_slice(&proposal.chain_id.0.to_le_bytes());
    payload.extend_from_slice(hash_address_list(&proposal.targets).as_bytes());
    payload.extend_from_slice(hash_u128_list(&proposal.values).as_bytes());
    payload.extend_from_slice(hash_bytes_list(&proposal.calldatas).as_bytes());
    payload.extend_from_slice(hash_u64_list(&proposal.gas_amounts).as_bytes());
    Hash::hash(&domain_separate(DOMAIN_PROPOSAL, &payload))
}

/// What a governor signs to vote on a proposal
pub fn ballot_digest(proposal_hash: &Hash, support: VoteSupport) -> Hash {
    let mut payload = Vec::with_capacity(33);
    payload.extend_from_slice(proposal_hash.as_bytes());
    payload.push(support as u8);
    Hash::hash(&domain_separate(DOMAIN_BALLOT, &payload))
}

/// What a governor signs to approve a bridge-operator set for a period
pub fn bridge_ballot_digest(period: PeriodNumber, operators: &[Address]) -> Hash {
    let mut payload = Vec::with_capacity(8 + 32);
    payload.extend_from_slice(&period.to_le_bytes());
    payload.extend_from_slice(hash_address_list(operators).as_bytes());
    Hash::hash(&domain_separate(DOMAIN_BRIDGE_BALLOT, &payload))
}
