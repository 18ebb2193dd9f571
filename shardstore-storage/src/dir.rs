//! Directory-backed shard target
//!
//! Each object occupies `{target_dir}/{key}/` holding two files:
//! - `shard`: the fragment bytes verbatim
//! - `manifest.json`: the [`FragmentManifest`] for that fragment
//!
//! Writes go to a temporary file first and are renamed into place, so a
//! crashed write never leaves a half-written fragment under the final name.

use crate::manifest::FragmentManifest;
use crate::target::{ShardTarget, StoredFragment};
use bytes::Bytes;
use shardstore_core::error::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::debug;

/// File holding the fragment bytes
pub const SHARD_FILE: &str = "shard";
/// File holding the fragment manifest
pub const MANIFEST_FILE: &str = "manifest.json";

/// A directory acting as one independent target
#[derive(Debug, Clone)]
pub struct DirTarget {
    path: PathBuf,
    address: String,
}

impl DirTarget {
    /// Target rooted at an existing or future directory
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let address = path.display().to_string();
        Self { path, address }
    }

    /// Root directory of this target
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the fragment for `key`
    pub fn object_dir(&self, key: &str) -> PathBuf {
        self.path.join(key)
    }

    async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

impl ShardTarget for DirTarget {
    fn address(&self) -> &str {
        &self.address
    }

    fn write_fragment<'a>(
        &'a self,
        key: &'a str,
        data: Bytes,
        manifest: &'a FragmentManifest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let dir = self.object_dir(key);
            tokio::fs::create_dir_all(&dir).await?;

            Self::write_atomic(&dir.join(SHARD_FILE), &data).await?;
            Self::write_atomic(&dir.join(MANIFEST_FILE), &manifest.to_json()?).await?;

            debug!(target_dir = %self.address, key, index = manifest.index, size = data.len(), "wrote fragment");
            Ok(())
        })
    }

    fn read_fragment<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<StoredFragment>> + Send + 'a>> {
        Box::pin(async move {
            let dir = self.object_dir(key);
            let data = tokio::fs::read(dir.join(SHARD_FILE)).await?;
            let manifest = FragmentManifest::from_json(&tokio::fs::read(dir.join(MANIFEST_FILE)).await?)?;

            debug!(target_dir = %self.address, key, index = manifest.index, size = data.len(), "read fragment");
            Ok(StoredFragment {
                data: Bytes::from(data),
                manifest,
            })
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::fs::remove_dir_all(self.object_dir(key)).await {
                Ok(()) => {
                    debug!(target_dir = %self.address, key, "removed fragment");
                    Ok(true)
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }
}
