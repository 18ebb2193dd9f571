//! ShardStore Storage
//!
//! Provides the target abstraction and the Save/Load pipeline:
//! - `ShardTarget` trait for pluggable fragment locations
//! - `DirTarget` for directories on a local filesystem
//! - `MemoryTarget` for testing and failure injection
//! - `StoreEngine` to split, encode, distribute and rebuild objects

pub mod dir;
pub mod engine;
pub mod manifest;
pub mod memory;
pub mod parallel;
pub mod target;
pub mod targets;

pub use dir::DirTarget;
pub use engine::{SaveSummary, StoreEngine, VerifyReport};
pub use manifest::FragmentManifest;
pub use memory::MemoryTarget;
pub use target::{ShardTarget, StoredFragment};

use shardstore_core::error::Result;
use shardstore_core::ErasureConfig;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Store configuration
///
/// Fixed for the lifetime of a store: shard `i` always lives on
/// `targets[i]`. Targets past `k+m` are kept but never written.
#[derive(Clone)]
pub struct StoreConfig {
    erasure: ErasureConfig,
    targets: Vec<Arc<dyn ShardTarget>>,
}

impl StoreConfig {
    /// Validate the erasure parameters and the target count
    pub fn new(erasure: ErasureConfig, targets: Vec<Arc<dyn ShardTarget>>) -> Result<Self> {
        erasure.validate()?;
        targets::validate(&targets, &erasure)?;
        Ok(Self { erasure, targets })
    }

    /// Use the child directories of `base` as targets
    pub async fn discover(erasure: ErasureConfig, base: impl AsRef<Path>) -> Result<Self> {
        let targets = targets::discover(base)
            .await?
            .into_iter()
            .map(|t| Arc::new(t) as Arc<dyn ShardTarget>)
            .collect();
        Self::new(erasure, targets)
    }

    /// Erasure parameters
    pub fn erasure(&self) -> &ErasureConfig {
        &self.erasure
    }

    /// Every configured target, in shard order
    pub fn targets(&self) -> &[Arc<dyn ShardTarget>] {
        &self.targets
    }

    /// The `k+m` targets that receive shards
    pub fn shard_targets(&self) -> &[Arc<dyn ShardTarget>] {
        &self.targets[..self.erasure.total_shards()]
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("erasure", &self.erasure)
            .field(
                "targets",
                &self.targets.iter().map(|t| t.address()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
