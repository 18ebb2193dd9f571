//! Target discovery and validation
//!
//! Targets are the child directories of a base directory. Shard index `i`
//! goes to the `i`-th target in name order, so the same directory set gives
//! the same assignment on every Save and Load.

use crate::dir::DirTarget;
use shardstore_core::error::{Result, ShardStoreError};
use shardstore_core::ErasureConfig;
use std::path::Path;
use tracing::debug;

/// Enumerate the child directories of `base` as targets, sorted by name
///
/// Fails with `BaseNotFound` if `base` does not exist and with
/// `NoTargetsFound` if it has no child directories.
pub async fn discover(base: impl AsRef<Path>) -> Result<Vec<DirTarget>> {
    let base = base.as_ref();

    match tokio::fs::metadata(base).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(ShardStoreError::BaseNotFound(base.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ShardStoreError::BaseNotFound(base.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    }

    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(base).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }

    if dirs.is_empty() {
        return Err(ShardStoreError::NoTargetsFound(base.to_path_buf()));
    }

    // read_dir order is filesystem-dependent
    dirs.sort();

    debug!(base = %base.display(), count = dirs.len(), "discovered targets");
    Ok(dirs.into_iter().map(DirTarget::new).collect())
}

/// Ensure there is at least one target per shard
pub fn validate<T>(targets: &[T], config: &ErasureConfig) -> Result<()> {
    let required = config.total_shards();
    if targets.len() < required {
        return Err(ShardStoreError::InsufficientTargets {
            available: targets.len(),
            required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::ShardTarget;
    use shardstore_core::ErrorCategory;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_discover_sorted_dirs_only() {
        let base = TempDir::new().unwrap();
        for name in ["disk2", "disk0", "disk1"] {
            std::fs::create_dir(base.path().join(name)).unwrap();
        }
        std::fs::write(base.path().join("README"), b"not a target").unwrap();

        let targets = discover(base.path()).await.unwrap();
        let names: Vec<_> = targets
            .iter()
            .map(|t| t.path().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["disk0", "disk1", "disk2"]);
        assert!(targets[0].address().ends_with("disk0"));
    }

    #[tokio::test]
    async fn test_discover_missing_base() {
        let base = TempDir::new().unwrap();
        let err = discover(base.path().join("absent")).await.unwrap_err();
        assert!(matches!(err, ShardStoreError::BaseNotFound(_)));
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[tokio::test]
    async fn test_discover_base_is_file() {
        let base = TempDir::new().unwrap();
        let file = base.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            discover(&file).await,
            Err(ShardStoreError::BaseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_discover_empty_base() {
        let base = TempDir::new().unwrap();
        assert!(matches!(
            discover(base.path()).await,
            Err(ShardStoreError::NoTargetsFound(_))
        ));
    }

    #[test]
    fn test_validate() {
        let config = ErasureConfig::new(4, 2).unwrap();
        assert!(validate(&[(); 6], &config).is_ok());
        assert!(validate(&[(); 9], &config).is_ok());

        let err = validate(&[(); 5], &config).unwrap_err();
        assert!(matches!(
            err,
            ShardStoreError::InsufficientTargets {
                available: 5,
                required: 6
            }
        ));
        assert_eq!(err.category(), ErrorCategory::Config);
    }
}
