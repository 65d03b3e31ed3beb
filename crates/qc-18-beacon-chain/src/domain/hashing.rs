//! Hash-root utilities.
//!
//! Committee and pending roots hash keys in list order: position encodes
//! proposer rotation, so nothing here sorts a committee.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use shared_types::{hash_strings, CommitteeKey, Hash, ShardId, ShardStateRecord, ZERO_HASH};
use std::collections::BTreeMap;

/// Identifies one of the header's state roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    BeaconCommitteeAndValidator,
    BeaconCandidate,
    ShardCandidate,
    ShardCommitteeAndValidator,
    AutoStaking,
}

/// Roots derived from a best state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateRoots {
    pub beacon_committee_and_validator: Hash,
    pub beacon_candidate: Hash,
    pub shard_candidate: Hash,
    pub shard_committee_and_validator: Hash,
    pub auto_staking: Hash,
}

impl StateRoots {
    /// Pairs in a fixed order, for comparison loops.
    pub fn entries(&self) -> [(RootKind, Hash); 5] {
        [
            (
                RootKind::BeaconCommitteeAndValidator,
                self.beacon_committee_and_validator,
            ),
            (RootKind::BeaconCandidate, self.beacon_candidate),
            (RootKind::ShardCandidate, self.shard_candidate),
            (
                RootKind::ShardCommitteeAndValidator,
                self.shard_committee_and_validator,
            ),
            (RootKind::AutoStaking, self.auto_staking),
        ]
    }
}

/// Hash of an ordered key list.
pub fn committee_root(keys: &[CommitteeKey]) -> Hash {
    hash_strings(keys)
}

/// Hash of several key lists concatenated in the given order.
pub fn concat_root(lists: &[&[CommitteeKey]]) -> Hash {
    let joined: Vec<&CommitteeKey> = lists.iter().flat_map(|list| list.iter()).collect();
    let parts: Vec<&str> = joined.iter().map(|k| k.as_str()).collect();
    hash_strings(&parts)
}

/// Pending lists of every shard ascending, then committees of every shard
/// ascending.
pub fn shard_committee_root(
    pending: &BTreeMap<ShardId, Vec<CommitteeKey>>,
    committees: &BTreeMap<ShardId, Vec<CommitteeKey>>,
) -> Hash {
    let parts: Vec<&str> = pending
        .values()
        .chain(committees.values())
        .flat_map(|list| list.iter().map(CommitteeKey::as_str))
        .collect();
    hash_strings(&parts)
}

/// Keys ascending, each followed by its flag.
pub fn auto_staking_root(auto_staking: &BTreeMap<CommitteeKey, bool>) -> Hash {
    let parts: Vec<String> = auto_staking
        .iter()
        .map(|(key, flag)| format!("{key}{flag}"))
        .collect();
    hash_strings(&parts)
}

/// Shards ascending, records in order, each as `height ++ hex(hash) ++ hex(bitmap)`.
pub fn shard_state_hash(states: &BTreeMap<ShardId, Vec<ShardStateRecord>>) -> Hash {
    let parts: Vec<String> = states
        .values()
        .flatten()
        .map(|record| {
            format!(
                "{}{}{}",
                record.height,
                shared_types::to_hex(&record.hash),
                hex_bitmap(&record.cross_shard)
            )
        })
        .collect();
    hash_strings(&parts)
}

/// Plain hash over all instruction fields in order.
pub fn instruction_hash(instructions: &[Vec<String>]) -> Hash {
    let parts: Vec<&str> = instructions.iter().flatten().map(String::as_str).collect();
    hash_strings(&parts)
}

fn hex_bitmap(bitmap: &[u8]) -> String {
    bitmap.iter().map(|b| format!("{b:02x}")).collect()
}

fn keccak_concat(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn instruction_leaf(fields: &[String]) -> Hash {
    let mut hasher = Keccak256::new();
    for field in fields {
        hasher.update(field.as_bytes());
    }
    hasher.finalize().into()
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            keccak_concat(left, right)
        })
        .collect()
}

/// Binary Merkle root over individually hashed instructions.
///
/// An odd node is paired with itself. Empty input yields the zero root.
pub fn instruction_merkle_root(instructions: &[Vec<String>]) -> Hash {
    if instructions.is_empty() {
        return ZERO_HASH;
    }
    let mut level: Vec<Hash> = instructions.iter().map(|i| instruction_leaf(i)).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// One step of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleStep {
    pub sibling: Hash,
    /// Whether the sibling sits on the left.
    pub sibling_is_left: bool,
}

/// Inclusion proof for the instruction at `index`.
pub fn instruction_merkle_proof(instructions: &[Vec<String>], index: usize) -> Option<Vec<MerkleStep>> {
    if index >= instructions.len() {
        return None;
    }
    let mut level: Vec<Hash> = instructions.iter().map(|i| instruction_leaf(i)).collect();
    let mut position = index;
    let mut proof = Vec::new();
    while level.len() > 1 {
        let sibling_pos = position ^ 1;
        let sibling = level.get(sibling_pos).copied().unwrap_or(level[position]);
        proof.push(MerkleStep {
            sibling,
            sibling_is_left: sibling_pos < position,
        });
        level = next_level(&level);
        position /= 2;
    }
    Some(proof)
}

/// Check an inclusion proof produced by [`instruction_merkle_proof`].
pub fn verify_instruction_proof(instruction: &[String], proof: &[MerkleStep], root: &Hash) -> bool {
    let computed = proof.iter().fold(instruction_leaf(instruction), |acc, step| {
        if step.sibling_is_left {
            keccak_concat(&step.sibling, &acc)
        } else {
            keccak_concat(&acc, &step.sibling)
        }
    });
    &computed == root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<CommitteeKey> {
        names.iter().map(|n| CommitteeKey::from(*n)).collect()
    }

    fn inst(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_committee_root_is_order_sensitive() {
        assert_ne!(
            committee_root(&keys(&["a", "b"])),
            committee_root(&keys(&["b", "a"]))
        );
        assert_eq!(committee_root(&[]), ZERO_HASH);
    }

    #[test]
    fn test_single_byte_mutation_changes_root() {
        let original = keys(&["validator-1", "validator-2"]);
        let mutated = keys(&["validator-1", "validator-3"]);
        assert_ne!(committee_root(&original), committee_root(&mutated));
    }

    #[test]
    fn test_concat_root_matches_flat_list() {
        let committee = keys(&["a", "b"]);
        let pending = keys(&["c"]);
        assert_eq!(
            concat_root(&[committee.as_slice(), pending.as_slice()]),
            committee_root(&keys(&["a", "b", "c"]))
        );
    }

    #[test]
    fn test_shard_committee_root_puts_pending_first() {
        let pending = BTreeMap::from([(0, keys(&["p0"])), (1, keys(&["p1"]))]);
        let committees = BTreeMap::from([(0, keys(&["c0"])), (1, keys(&["c1"]))]);
        assert_eq!(
            shard_committee_root(&pending, &committees),
            committee_root(&keys(&["p0", "p1", "c0", "c1"]))
        );
    }

    #[test]
    fn test_shard_state_hash_covers_bitmap() {
        let record = |bitmap: Vec<u8>| ShardStateRecord {
            height: 7,
            hash: [1u8; 32],
            cross_shard: bitmap,
            propose_time: 0,
        };
        let a = BTreeMap::from([(0, vec![record(vec![1])])]);
        let b = BTreeMap::from([(0, vec![record(vec![2])])]);
        assert_ne!(shard_state_hash(&a), shard_state_hash(&b));
        assert_eq!(shard_state_hash(&BTreeMap::new()), ZERO_HASH);
    }

    #[test]
    fn test_instruction_hash_flattens_fields() {
        let split = vec![inst(&["ab", "c"])];
        let joined = vec![inst(&["abc"])];
        assert_eq!(instruction_hash(&split), instruction_hash(&joined));
        assert_ne!(instruction_merkle_root(&split), ZERO_HASH);
    }

    #[test]
    fn test_merkle_root_pads_odd_levels() {
        let insts = vec![inst(&["a"]), inst(&["b"]), inst(&["c"])];
        let la = instruction_leaf(&insts[0]);
        let lb = instruction_leaf(&insts[1]);
        let lc = instruction_leaf(&insts[2]);
        let expected = keccak_concat(&keccak_concat(&la, &lb), &keccak_concat(&lc, &lc));
        assert_eq!(instruction_merkle_root(&insts), expected);
    }

    #[test]
    fn test_merkle_empty_and_single() {
        assert_eq!(instruction_merkle_root(&[]), ZERO_HASH);
        let single = vec![inst(&["random", "1"])];
        assert_eq!(instruction_merkle_root(&single), instruction_leaf(&single[0]));
    }

    #[test]
    fn test_merkle_proof_verifies_every_leaf() {
        let insts: Vec<Vec<String>> = (0..5).map(|i| inst(&["set", &i.to_string(), "v"])).collect();
        let root = instruction_merkle_root(&insts);
        for (i, instruction) in insts.iter().enumerate() {
            let proof = instruction_merkle_proof(&insts, i).unwrap();
            assert!(verify_instruction_proof(instruction, &proof, &root));
        }
        let proof = instruction_merkle_proof(&insts, 0).unwrap();
        assert!(!verify_instruction_proof(&insts[1], &proof, &root));
        assert!(instruction_merkle_proof(&insts, 5).is_none());
    }

    #[test]
    fn test_auto_staking_root_depends_on_flags() {
        let on = BTreeMap::from([(CommitteeKey::from("a"), true)]);
        let off = BTreeMap::from([(CommitteeKey::from("a"), false)]);
        assert_ne!(auto_staking_root(&on), auto_staking_root(&off));
    }
}
