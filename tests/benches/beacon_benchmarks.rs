//! # Beacon Chain Benchmarks
//!
//! | Area | Operation | Scale |
//! |------|-----------|-------|
//! | Committee roots | `concat_root`, `auto_staking_root` | 16 to 1024 keys |
//! | Shard roots | `shard_committee_root` | 64 shards x 32 keys |
//! | Instructions | Merkle root, proof, verify | 8 to 4096 instructions |
//! | Best state | all five roots | 64 shards |

use criterion::{criterion_group, criterion_main, Criterion};
use qc_tests::benchmarks::hash_roots;

fn beacon_benchmarks(c: &mut Criterion) {
    hash_roots::register_benchmarks(c);
}

criterion_group!(benches, beacon_benchmarks);
criterion_main!(benches);
