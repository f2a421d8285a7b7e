//! Keccak-256 node hashing.
//!
//! Leaves are hashed twice and internal nodes once, which keeps the two
//! domains apart: forging an internal node as a leaf would require a keccak
//! preimage of the 64-byte child concatenation.

use alloy_primitives::{keccak256, B256};

/// Hash an ABI-encoded leaf: `keccak256(keccak256(encoded))`.
pub fn hash_leaf(encoded: &[u8]) -> B256 {
    keccak256(keccak256(encoded))
}

/// Hash two sibling nodes as a sorted pair.
///
/// The smaller hash (big-endian byte order) always goes first, so a proof
/// does not need to carry left/right directions.
pub fn hash_pair(a: &B256, b: &B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

#[cfg(test)]
mod hash_tests {
    use super::*;

    #[test]
    fn test_pair_is_commutative() {
        let a = B256::repeat_byte(0x11);
        let b = B256::repeat_byte(0x22);

        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));
    }

    #[test]
    fn test_pair_matches_manual_concat() {
        let a = B256::repeat_byte(0x22);
        let b = B256::repeat_byte(0x11);

        let mut concat = Vec::with_capacity(64);
        concat.extend_from_slice(b.as_slice());
        concat.extend_from_slice(a.as_slice());

        assert_eq!(hash_pair(&a, &b), keccak256(&concat));
    }

    #[test]
    fn test_leaf_hash_differs_from_single_hash() {
        let encoded = [0u8; 32];
        assert_ne!(hash_leaf(&encoded), keccak256(encoded));
    }
}
