//! Shard-to-beacon summaries.

use serde::{Deserialize, Serialize};
use shared_types::{Hash, ShardId, ShardStateRecord};

/// Compact record of one shard block, as offered by the shard pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardToBeaconBlock {
    pub shard_id: ShardId,
    pub height: u64,
    /// Shard block hash; the message the shard committee signed.
    pub hash: Hash,
    pub cross_shard: Vec<u8>,
    pub propose_time: i64,
    /// Instructions the shard emitted for the beacon chain.
    pub instructions: Vec<Vec<String>>,
    /// Positions in the shard committee that signed.
    pub validators_idx: Vec<usize>,
    pub agg_sig: Vec<u8>,
    pub r: Vec<u8>,
}

impl ShardToBeaconBlock {
    pub fn state_record(&self) -> ShardStateRecord {
        ShardStateRecord {
            height: self.height,
            hash: self.hash,
            cross_shard: self.cross_shard.clone(),
            propose_time: self.propose_time,
        }
    }

    /// Same height, hash and bitmap as a declared record.
    pub fn matches_record(&self, record: &ShardStateRecord) -> bool {
        self.height == record.height
            && self.hash == record.hash
            && self.cross_shard == record.cross_shard
    }
}

/// First adjacent pair of heights that does not step by exactly one.
pub fn first_gap<'a>(heights: impl IntoIterator<Item = &'a u64>) -> Option<(u64, u64)> {
    let mut previous: Option<u64> = None;
    for &height in heights {
        if let Some(prev) = previous {
            if height != prev + 1 {
                return Some((prev, height));
            }
        }
        previous = Some(height);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(height: u64) -> ShardToBeaconBlock {
        ShardToBeaconBlock {
            shard_id: 0,
            height,
            hash: [height as u8; 32],
            cross_shard: vec![1],
            propose_time: 0,
            instructions: vec![],
            validators_idx: vec![],
            agg_sig: vec![],
            r: vec![],
        }
    }

    #[test]
    fn test_matches_own_record() {
        let block = summary(4);
        assert!(block.matches_record(&block.state_record()));
        let mut other = block.state_record();
        other.cross_shard = vec![2];
        assert!(!block.matches_record(&other));
    }

    #[test]
    fn test_contiguity_reports_first_gap() {
        assert_eq!(first_gap(&[3, 4, 5]), None);
        assert_eq!(first_gap(&[3, 5, 6]), Some((3, 5)));
        assert_eq!(first_gap(&[3, 3]), Some((3, 3)));
        assert_eq!(first_gap(&[]), None);
    }
}
