//! # Quantum-Chain Beacon Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Criterion benchmarks of the hash roots
//! │   └── hash_roots.rs
//! │
//! └── integration/      # Beacon core wired to the shared bus
//!     ├── fixtures.rs
//!     ├── epoch_cycle.rs
//!     ├── pipeline.rs
//!     └── notifications.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # Integration only
//! cargo test -p qc-tests integration::
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

pub mod benchmarks;
pub mod integration;
