//! Signature verifier for single-node devnets.

use crate::ports::SignatureVerifier;
use shared_types::{CommitteeKey, Hash};

/// Accepts every signature.
///
/// Only for devnets and tests where no committee actually signs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

impl SignatureVerifier for AcceptAllVerifier {
    fn verify_producer_signature(&self, _: &CommitteeKey, _: &Hash, _: &[u8]) -> bool {
        true
    }

    fn validate_agg_signature(
        &self,
        validators_idx: &[usize],
        committee: &[CommitteeKey],
        _agg_sig: &[u8],
        _r: &[u8],
        _message: &Hash,
    ) -> Result<(), String> {
        match validators_idx.iter().find(|idx| **idx >= committee.len()) {
            Some(idx) => Err(format!("validator index {idx} outside committee of {}", committee.len())),
            None => Ok(()),
        }
    }
}
