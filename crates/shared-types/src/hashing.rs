//! # Canonical Hashing
//!
//! Deterministic, unsalted hash helpers used for consensus-critical roots.
//!
//! - Plain content hashes are SHA-256 over concatenated UTF-8 strings.
//! - Relay-facing roots (instruction Merkle tree, block header) use Keccak-256.

use crate::entities::Hash;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// The all-zero hash, used for empty inputs and the genesis parent.
pub const ZERO_HASH: Hash = [0u8; 32];

/// SHA-256 of raw bytes.
pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Keccak-256 of raw bytes.
pub fn keccak256(bytes: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Hash of the ordered concatenation of `parts`.
///
/// An empty list yields [`ZERO_HASH`] rather than the hash of the empty
/// string, so "nothing" has a single canonical encoding.
pub fn hash_strings<S: AsRef<str>>(parts: &[S]) -> Hash {
    if parts.is_empty() {
        return ZERO_HASH;
    }
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
    }
    hasher.finalize().into()
}

/// Lowercase hex rendering of a hash.
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}
