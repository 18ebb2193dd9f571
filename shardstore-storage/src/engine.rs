//! Save / Load orchestration
//!
//! Save: buffer the whole input, encode, then write one fragment per target.
//! Load: read every target, drop fragments whose manifest does not fit,
//! rebuild missing data shards, then stream the object to the sink.
//!
//! Encoding completes before any write starts and all reads complete before
//! reconstruction starts. Inputs are held in memory in full.

use crate::manifest::{validate_key, FragmentManifest};
use crate::parallel::{read_all, write_all};
use crate::target::{ShardTarget, StoredFragment};
use crate::StoreConfig;
use shardstore_core::error::{ErrorCategory, Result, ShardStoreError};
use shardstore_core::{ErasureConfig, ErasureEncoder, FragmentSet, ShardData};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of a successful Save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSummary {
    pub key: String,
    /// Bytes read from the input
    pub original_len: usize,
    /// Length of every fragment written
    pub shard_len: usize,
    /// Number of targets written
    pub targets: usize,
}

/// Fragment availability and parity health of one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub key: String,
    pub total: usize,
    pub present: usize,
    /// Shard indices that could not be used, in order
    pub absent_indices: Vec<usize>,
    /// Object length agreed by the surviving manifests
    pub original_len: Option<u64>,
    /// Parity check result; only evaluated when every fragment is present
    pub parity_consistent: Option<bool>,
    /// At most `m` fragments absent
    pub recoverable: bool,
}

impl VerifyReport {
    /// Recoverable, and parity not known to be wrong
    pub fn is_healthy(&self) -> bool {
        self.recoverable && self.parity_consistent != Some(false)
    }
}

/// Fragments accepted for one object, plus the layout they agree on
struct Collected {
    fragments: FragmentSet,
    layout: Option<FragmentManifest>,
}

impl Collected {
    fn absent(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_none()).count()
    }
}

/// Erasure-coded object store over a fixed set of targets
pub struct StoreEngine {
    config: StoreConfig,
    encoder: ErasureEncoder,
}

impl StoreEngine {
    /// Create an engine for a validated configuration
    pub fn new(config: StoreConfig) -> Result<Self> {
        let encoder = ErasureEncoder::with_config(*config.erasure())?;
        Ok(Self { config, encoder })
    }

    /// Validate `targets` against `erasure` and build an engine over them
    pub fn with_targets(erasure: ErasureConfig, targets: Vec<Arc<dyn ShardTarget>>) -> Result<Self> {
        Self::new(StoreConfig::new(erasure, targets)?)
    }

    /// The configuration this engine was built with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Store everything `reader` yields under `key`
    ///
    /// Every target is attempted even when some fail; a failure leaves a
    /// partially written object behind and is reported as `WriteFailed`.
    pub async fn save<R>(&self, key: &str, mut reader: R) -> Result<SaveSummary>
    where
        R: AsyncRead + Unpin,
    {
        validate_key(key)?;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;

        let shards = self.encoder.encode(&buffer)?;
        let shard_len = shards.first().map(ShardData::size).unwrap_or(0);
        let manifest = FragmentManifest::new(key, self.config.erasure(), buffer.len());
        let targets = self.config.shard_targets();

        write_all(targets, key, shards.into_iter().map(Some).collect(), &manifest).await?;

        info!(key, size = buffer.len(), shard_len, targets = targets.len(), "saved object");
        Ok(SaveSummary {
            key: key.to_string(),
            original_len: buffer.len(),
            shard_len,
            targets: targets.len(),
        })
    }

    /// Rebuild the object stored under `key` and write it to `writer`
    ///
    /// Returns the number of bytes written. Fails with
    /// `ReconstructionFailed` when more than `m` fragments are unavailable.
    pub async fn load<W>(&self, key: &str, mut writer: W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        validate_key(key)?;

        let Collected {
            mut fragments,
            layout,
        } = self.collect(key).await;
        let total = fragments.len();
        let unavailable = fragments.iter().filter(|f| f.is_none()).count();

        let original_len = match &layout {
            Some(layout) => layout.original_len,
            None => {
                return Err(ShardStoreError::ReconstructionFailed {
                    unavailable,
                    total,
                    source: Box::new(ShardStoreError::InsufficientFragments {
                        available: 0,
                        required: self.config.erasure().data_shards,
                    }),
                })
            }
        };
        let original_len = usize::try_from(original_len)
            .map_err(|_| ShardStoreError::Manifest(format!("object length {} too large", original_len)))?;

        self.encoder
            .reconstruct_data(&mut fragments)
            .map_err(|err| match err.category() {
                ErrorCategory::Reconstruction => ShardStoreError::ReconstructionFailed {
                    unavailable,
                    total,
                    source: Box::new(err),
                },
                _ => err,
            })?;
        let data = self.encoder.join(&fragments, original_len)?;

        writer.write_all(&data).await?;
        writer.flush().await?;

        info!(key, size = data.len(), unavailable, total, "loaded object");
        Ok(data.len() as u64)
    }

    /// Report fragment availability and parity consistency for `key`
    pub async fn verify(&self, key: &str) -> Result<VerifyReport> {
        validate_key(key)?;

        let collected = self.collect(key).await;
        let total = collected.fragments.len();
        let absent = collected.absent();
        let absent_indices: Vec<usize> = collected
            .fragments
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.is_none().then_some(i))
            .collect();

        let parity_consistent = if absent == 0 {
            let shards: Vec<ShardData> = collected.fragments.into_iter().flatten().collect();
            Some(self.encoder.verify_shards(&shards)?)
        } else {
            None
        };

        Ok(VerifyReport {
            key: key.to_string(),
            total,
            present: total - absent,
            absent_indices,
            original_len: collected.layout.map(|l| l.original_len),
            parity_consistent,
            recoverable: absent <= self.config.erasure().max_failures(),
        })
    }

    /// Read every target and keep only fragments that agree on one layout
    async fn collect(&self, key: &str) -> Collected {
        let (stored, _) = read_all(self.config.shard_targets(), key).await;

        let candidates: Vec<Option<StoredFragment>> = stored
            .into_iter()
            .enumerate()
            .map(|(index, fragment)| fragment.filter(|f| self.fits_slot(key, index, f)))
            .collect();

        let layout = elect_layout(&candidates);

        let fragments = candidates
            .into_iter()
            .enumerate()
            .map(|(index, fragment)| {
                let fragment = fragment?;
                let layout = layout.as_ref()?;
                if !fragment.manifest.same_layout(layout) {
                    warn!(key, shard = index, "fragment belongs to a different write, ignoring");
                    return None;
                }
                let is_parity = index >= self.config.erasure().data_shards;
                Some(ShardData::new(index as u8, fragment.data, is_parity))
            })
            .collect();

        Collected { fragments, layout }
    }

    /// Whether a fragment read from slot `index` can be used at all
    fn fits_slot(&self, key: &str, index: usize, fragment: &StoredFragment) -> bool {
        let manifest = &fragment.manifest;
        let erasure = self.config.erasure();

        let reason = if manifest.key != key {
            Some("key mismatch")
        } else if manifest.index != index {
            Some("stored for a different shard index")
        } else if manifest.data_shards != erasure.data_shards
            || manifest.parity_shards != erasure.parity_shards
        {
            Some("written with a different k/m")
        } else if fragment.data.len() as u64 != manifest.shard_len {
            Some("fragment length does not match manifest")
        } else if usize::try_from(manifest.original_len)
            .map(|len| erasure.shard_size(len) as u64 != manifest.shard_len)
            .unwrap_or(true)
        {
            Some("object length does not match shard length")
        } else {
            None
        };

        match reason {
            Some(reason) => {
                warn!(key, shard = index, manifest_index = manifest.index, reason, "discarding fragment");
                false
            }
            None => true,
        }
    }
}

/// The write shared by the most fragments; ties go to the lowest index
fn elect_layout(candidates: &[Option<StoredFragment>]) -> Option<FragmentManifest> {
    let mut votes: HashMap<(Uuid, u64, u64), (usize, usize)> = HashMap::new();
    for (index, fragment) in candidates.iter().enumerate() {
        if let Some(fragment) = fragment {
            let m = &fragment.manifest;
            let entry = votes
                .entry((m.generation, m.original_len, m.shard_len))
                .or_insert((0, index));
            entry.0 += 1;
        }
    }

    let (_, first_index) = votes
        .values()
        .copied()
        .max_by(|(count_a, index_a), (count_b, index_b)| {
            count_a.cmp(count_b).then(index_b.cmp(index_a))
        })?;

    candidates[first_index].as_ref().map(|f| f.manifest.clone())
}
