//! # Beacon Benchmarks
//!
//! Hash roots are recomputed for every produced and every verified block,
//! so their cost bounds pipeline throughput.

pub mod hash_roots;
