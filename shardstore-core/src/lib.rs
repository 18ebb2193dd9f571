//! ShardStore Core Library
//!
//! Core abstractions for the ShardStore erasure-coded object store.
//! This crate provides:
//! - GF(256) field arithmetic
//! - Vandermonde-based Reed-Solomon erasure coding (4 data + 2 parity shards by default)
//! - Common types and error handling

pub mod erasure;
pub mod error;
pub mod gf256;
pub mod matrix;

pub use erasure::{ErasureConfig, ErasureEncoder, FragmentSet, ShardData};
pub use error::{ErrorCategory, Result, ShardStoreError};

/// Default erasure coding configuration
/// - 4 data shards: minimum required to reconstruct
/// - 2 parity shards: can tolerate 2 target failures
/// - 6 total shards, one per target
pub const DATA_SHARDS: usize = 4;
pub const PARITY_SHARDS: usize = 2;
pub const TOTAL_SHARDS: usize = DATA_SHARDS + PARITY_SHARDS;

/// Upper bound on data + parity shards.
/// Vandermonde rows are evaluated at 1..=k+m, which must be distinct non-zero bytes.
pub const MAX_TOTAL_SHARDS: usize = 255;
