// Signature wrapper and domain separation for signed payloads
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// Domain separation prevents signature replay between contexts: a governor's
// ballot over a proposal must never verify as a ballot over a bridge-operator
// set, and nothing signed here may collide with another protocol's payloads.
// Each digest family prepends its own unique prefix.

/// Domain separator for proposal content hashes
pub const DOMAIN_PROPOSAL: &[u8] = b"DPOS_PROPOSAL_V1:";

/// Domain separator for a governor's vote ballot over a proposal
pub const DOMAIN_BALLOT: &[u8] = b"DPOS_BALLOT_V1:";

/// Domain separator for bridge-operator ballots
pub const DOMAIN_BRIDGE_BALLOT: &[u8] = b"DPOS_BRIDGE_BALLOT_V1:";

/// Create a domain-separated message for signing or hashing
#[inline]
pub fn domain_separate(domain: &[u8], message: &[u8]) -> Vec<u8> {
    let mut separated = Vec::with_capacity(domain.len() + message.len());
    separated.extend_from_slice(domain);
    separated.extend_from_slice(message);
    separated
}

/// Wrapper for Ed25519 signatures (64 bytes) with serde support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature64(pub [u8; 64]);

impl Signature64 {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn zero() -> Self {
        Self([0; 64])
    }
}

impl From<[u8; 64]> for Signature64 {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Signature64 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Signature64 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        if bytes.len() != 64 {
            return Err(serde::de::Error::custom("Signature must be 64 bytes"));
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Signature64(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_separate_prefixes() {
        let out = domain_separate(DOMAIN_BALLOT, b"payload");
        assert!(out.starts_with(DOMAIN_BALLOT));
        assert!(out.ends_with(b"payload"));
    }
}
