//! # Hash Root Benchmarks
//!
//! - Committee roots over committees up to 1024 keys
//! - Instruction Merkle root and proof generation up to 4096 instructions
//! - Full `BeaconBestState::roots()` on a 64-shard state

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use qc_18_beacon_chain::domain::{
    auto_staking_root, concat_root, instruction_merkle_proof, instruction_merkle_root,
    shard_committee_root, verify_instruction_proof, BeaconBestState,
};
use qc_18_beacon_chain::BeaconParams;
use shared_types::{CommitteeKey, ShardId};
use std::collections::BTreeMap;
use std::time::Duration;

fn keys(prefix: &str, count: usize) -> Vec<CommitteeKey> {
    (0..count)
        .map(|i| CommitteeKey::new(format!("{prefix}-{i:06}")))
        .collect()
}

fn instructions(count: usize) -> Vec<Vec<String>> {
    (0..count)
        .map(|i| {
            vec![
                "stake".to_string(),
                format!("staker-{i}"),
                "shard".to_string(),
                format!("tx-{i}"),
                format!("receiver-{i}"),
                "true".to_string(),
            ]
        })
        .collect()
}

fn per_shard(prefix: &str, shards: u8, size: usize) -> BTreeMap<ShardId, Vec<CommitteeKey>> {
    (0..shards)
        .map(|id| (id, keys(&format!("{prefix}-{id}"), size)))
        .collect()
}

pub fn bench_committee_roots(c: &mut Criterion) {
    let mut group = c.benchmark_group("beacon-committee-roots");
    group.measurement_time(Duration::from_secs(5));

    for size in [16usize, 128, 1024] {
        let committee = keys("committee", size);
        let pending = keys("pending", size / 4);
        let auto_staking: BTreeMap<CommitteeKey, bool> = committee
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i % 3 != 0))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("concat_root", size), &size, |b, _| {
            b.iter(|| black_box(concat_root(&[committee.as_slice(), pending.as_slice()])))
        });
        group.bench_with_input(BenchmarkId::new("auto_staking_root", size), &size, |b, _| {
            b.iter(|| black_box(auto_staking_root(&auto_staking)))
        });
    }

    let pending = per_shard("pending", 64, 8);
    let committees = per_shard("committee", 64, 32);
    group.bench_function("shard_committee_root_64x32", |b| {
        b.iter(|| black_box(shard_committee_root(&pending, &committees)))
    });

    group.finish();
}

pub fn bench_instruction_merkle(c: &mut Criterion) {
    let mut group = c.benchmark_group("beacon-instruction-merkle");
    group.measurement_time(Duration::from_secs(5));

    for count in [8usize, 256, 4096] {
        let list = instructions(count);
        let root = instruction_merkle_root(&list);
        let proof = instruction_merkle_proof(&list, count / 2).unwrap_or_default();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("root", count), &count, |b, _| {
            b.iter(|| black_box(instruction_merkle_root(&list)))
        });
        group.bench_with_input(BenchmarkId::new("proof", count), &count, |b, _| {
            b.iter(|| black_box(instruction_merkle_proof(&list, count / 2)))
        });
        group.bench_with_input(BenchmarkId::new("verify", count), &count, |b, _| {
            b.iter(|| black_box(verify_instruction_proof(&list[count / 2], &proof, &root)))
        });
    }

    group.finish();
}

pub fn bench_state_roots(c: &mut Criterion) {
    let mut state = BeaconBestState::new(BeaconParams {
        active_shards: 64,
        ..BeaconParams::default()
    });
    state.beacon_committee = keys("beacon", 32);
    state.beacon_pending_validator = keys("beacon-pending", 8);
    state.shard_committee = per_shard("committee", 64, 32);
    state.shard_pending_validator = per_shard("pending", 64, 8);
    state.candidate_shard_waiting_for_next_random = keys("candidate", 256);
    state.auto_staking = state
        .beacon_committee
        .iter()
        .chain(state.shard_committee.values().flatten())
        .map(|k| (k.clone(), true))
        .collect();

    c.bench_function("beacon-best-state-roots", |b| b.iter(|| black_box(state.roots())));
}

/// Register all hash-root benchmarks
pub fn register_benchmarks(c: &mut Criterion) {
    bench_committee_roots(c);
    bench_instruction_merkle(c);
    bench_state_roots(c);
}
