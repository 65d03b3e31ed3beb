//! Deterministic shuffle keyed by the epoch random number.

use sha2::{Digest, Sha256};
use shared_types::CommitteeKey;

const SEED_SIZE_BYTES: usize = 32;
const RAND_BYTES: usize = 4;
const RAND_RANGE: u64 = 1 << 32;

/// Hash-chain generator: the seed is re-hashed whenever its bytes run out.
pub struct ShuffleRng {
    seed: [u8; SEED_SIZE_BYTES],
    idx: usize,
}

impl ShuffleRng {
    pub fn new(initial_seed: &[u8]) -> Self {
        Self {
            seed: sha256(initial_seed),
            idx: 0,
        }
    }

    pub fn from_random_number(random: i64) -> Self {
        Self::new(&random.to_le_bytes())
    }

    fn rehash_seed(&mut self) {
        self.seed = sha256(&self.seed);
        self.idx = 0;
    }

    /// Next big-endian 32-bit word of the chain.
    fn rand(&mut self) -> u64 {
        if self.idx + RAND_BYTES > SEED_SIZE_BYTES {
            self.rehash_seed();
        }
        let bytes = &self.seed[self.idx..self.idx + RAND_BYTES];
        self.idx += RAND_BYTES;
        bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }

    /// Uniform value in `0..n`, rejecting draws that would bias the modulo.
    pub fn rand_range(&mut self, n: u32) -> u32 {
        let n = u64::from(n.max(1));
        let limit = RAND_RANGE - (RAND_RANGE % n);
        let mut x = self.rand();
        while x >= limit {
            x = self.rand();
        }
        (x % n) as u32
    }
}

fn sha256(bytes: &[u8]) -> [u8; SEED_SIZE_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Fisher-Yates over `keys`, driven by [`ShuffleRng`].
pub fn shuffle_keys(keys: &mut [CommitteeKey], random: i64) {
    let mut rng = ShuffleRng::from_random_number(random);
    for i in (1..keys.len()).rev() {
        let bound = u32::try_from(i + 1).unwrap_or(u32::MAX);
        let j = rng.rand_range(bound) as usize;
        keys.swap(i, j);
    }
}
