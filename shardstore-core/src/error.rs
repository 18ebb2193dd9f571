//! Error types for ShardStore
//!
//! Provides a unified error type for all ShardStore operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ShardStore operations
pub type Result<T> = std::result::Result<T, ShardStoreError>;

/// Coarse error classes used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid k/m, bad key, or not enough targets. Fatal at construction.
    Config,
    /// A target read or write failed
    Io,
    /// Too many fragments absent to rebuild the object
    Reconstruction,
    /// Internal invariant violation in the codec
    Encoding,
}

/// Unified error type for ShardStore
#[derive(Error, Debug)]
pub enum ShardStoreError {
    // ===== Field / Codec Errors =====
    #[error("Invalid erasure parameters: {0}")]
    InvalidParameters(String),

    #[error("Division by zero in GF(256)")]
    DivisionByZero,

    #[error("Insufficient fragments: have {available}, need {required}")]
    InsufficientFragments { available: usize, required: usize },

    #[error("Reconstruction matrix is singular")]
    SingularMatrix,

    #[error("Fragment size mismatch: expected {expected}, got {actual}")]
    FragmentSizeMismatch { expected: usize, actual: usize },

    #[error("Fragment count mismatch: expected {expected}, got {actual}")]
    FragmentCountMismatch { expected: usize, actual: usize },

    // ===== Target Errors =====
    #[error("Base directory not found: {}", .0.display())]
    BaseNotFound(PathBuf),

    #[error("No targets found under {}", .0.display())]
    NoTargetsFound(PathBuf),

    #[error("Insufficient targets: have {available}, need {required}")]
    InsufficientTargets { available: usize, required: usize },

    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),

    #[error("Target offline: {0}")]
    TargetOffline(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Write failed on {failed}/{total} targets: {}", format_target_errors(.errors))]
    WriteFailed {
        failed: usize,
        total: usize,
        /// (shard index, error) pairs in shard order
        errors: Vec<(usize, ShardStoreError)>,
    },

    // ===== Reconstruction Errors =====
    #[error("Failed to reconstruct data from targets ({unavailable}/{total} unavailable): {source}")]
    ReconstructionFailed {
        unavailable: usize,
        total: usize,
        #[source]
        source: Box<ShardStoreError>,
    },

    // ===== Generic Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShardStoreError {
    /// The error class this variant belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            ShardStoreError::InvalidParameters(_)
            | ShardStoreError::BaseNotFound(_)
            | ShardStoreError::NoTargetsFound(_)
            | ShardStoreError::InsufficientTargets { .. }
            | ShardStoreError::InvalidKey(_) => ErrorCategory::Config,

            ShardStoreError::Io(_)
            | ShardStoreError::TargetOffline(_)
            | ShardStoreError::Manifest(_)
            | ShardStoreError::WriteFailed { .. } => ErrorCategory::Io,

            ShardStoreError::InsufficientFragments { .. }
            | ShardStoreError::ReconstructionFailed { .. } => ErrorCategory::Reconstruction,

            ShardStoreError::DivisionByZero
            | ShardStoreError::SingularMatrix
            | ShardStoreError::FragmentSizeMismatch { .. }
            | ShardStoreError::FragmentCountMismatch { .. }
            | ShardStoreError::Internal(_) => ErrorCategory::Encoding,
        }
    }
}

fn format_target_errors(errors: &[(usize, ShardStoreError)]) -> String {
    errors
        .iter()
        .map(|(index, err)| format!("[shard {}] {}", index, err))
        .collect::<Vec<_>>()
        .join("; ")
}
