// Primitives - Fundamental chain types
use serde::{Deserialize, Serialize};
use std::fmt;

/// Universal hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash data with Blake3
    pub fn hash(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }
}

/// Block number
pub type BlockNumber = u64;

/// Unix timestamp in seconds (the chain's block timestamp)
pub type Timestamp = u64;

/// Balance in base units (u128 = enough for centuries)
pub type Balance = u128;

/// Nonce for governance proposal ordering / replay protection
pub type Nonce = u64;

/// Epoch number: fixed-length block-count window, smallest scheduling unit
pub type EpochNumber = u64;

/// Period number: variable-length, timestamp-bound window spanning epochs;
/// unit of reward settlement and indicator reset
pub type PeriodNumber = u64;

/// Commission rates are expressed in basis points out of this denominator
pub const MAX_COMMISSION_BPS: u32 = 10_000;

/// ChainId distinguishing the origin chain from relayed chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u32);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "chain:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"dpos-core";
        let hash1 = Hash::hash(data);
        let hash2 = Hash::hash(data);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_display_is_short_hex() {
        let h = Hash::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", h), "abababababababab");
    }
}
