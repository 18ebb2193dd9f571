//! Parallel fragment I/O
//!
//! One task per target, all spawned before any is awaited, then joined at a
//! single barrier. Results come back in target order, so every aggregate is
//! indexed by shard index regardless of which task finished first.
//!
//! There is no timeout: a target whose I/O hangs stalls the whole batch.

use crate::manifest::FragmentManifest;
use crate::target::{ShardTarget, StoredFragment};
use futures::future::join_all;
use shardstore_core::error::{Result, ShardStoreError};
use shardstore_core::FragmentSet;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, warn};

fn task_failed(err: JoinError) -> ShardStoreError {
    ShardStoreError::Internal(format!("target task failed: {}", err))
}

/// Write `fragments[i]` to `targets[i]` for every present fragment
///
/// Absent fragments are skipped. Every write is attempted; the ones that
/// fail are returned together as `WriteFailed`. Successful writes are not
/// rolled back.
pub async fn write_all(
    targets: &[Arc<dyn ShardTarget>],
    key: &str,
    fragments: FragmentSet,
    manifest: &FragmentManifest,
) -> Result<()> {
    if fragments.len() != targets.len() {
        return Err(ShardStoreError::FragmentCountMismatch {
            expected: targets.len(),
            actual: fragments.len(),
        });
    }

    let handles: Vec<_> = targets
        .iter()
        .zip(fragments)
        .enumerate()
        .map(|(index, (target, fragment))| {
            let target = Arc::clone(target);
            let key = key.to_string();
            let manifest = manifest.for_index(index);
            tokio::spawn(async move {
                match fragment {
                    Some(shard) => target.write_fragment(&key, shard.data, &manifest).await,
                    None => Ok(()),
                }
            })
        })
        .collect();

    let errors: Vec<(usize, ShardStoreError)> = join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .filter_map(|(index, joined)| {
            joined
                .map_err(task_failed)
                .and_then(|written| written)
                .err()
                .map(|err| (index, err))
        })
        .collect();

    if errors.is_empty() {
        debug!(key, targets = targets.len(), "all fragments written");
        return Ok(());
    }

    for (index, err) in &errors {
        warn!(key, shard = index, target_addr = targets[*index].address(), error = %err, "fragment write failed");
    }
    Err(ShardStoreError::WriteFailed {
        failed: errors.len(),
        total: targets.len(),
        errors,
    })
}

/// Read the fragment for `key` from every target
///
/// A target that cannot be opened or read yields `None` at its index and a
/// warning; it never fails the call. Returns the fragments and the number
/// that were absent.
pub async fn read_all(
    targets: &[Arc<dyn ShardTarget>],
    key: &str,
) -> (Vec<Option<StoredFragment>>, usize) {
    let handles: Vec<_> = targets
        .iter()
        .map(|target| {
            let target = Arc::clone(target);
            let key = key.to_string();
            tokio::spawn(async move { target.read_fragment(&key).await })
        })
        .collect();

    let fragments: Vec<Option<StoredFragment>> = join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, joined)| match joined.map_err(task_failed).and_then(|read| read) {
            Ok(fragment) => Some(fragment),
            Err(err) => {
                warn!(key, shard = index, target_addr = targets[index].address(), error = %err, "fragment unavailable");
                None
            }
        })
        .collect();

    let absent = fragments.iter().filter(|f| f.is_none()).count();
    debug!(key, absent, total = targets.len(), "fragments collected");
    (fragments, absent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTarget;
    use bytes::Bytes;
    use shardstore_core::{ErasureConfig, ShardData};

    fn memory_targets(n: usize) -> (Vec<Arc<MemoryTarget>>, Vec<Arc<dyn ShardTarget>>) {
        let mems: Vec<Arc<MemoryTarget>> = (0..n)
            .map(|i| Arc::new(MemoryTarget::new(format!("mem-{}", i))))
            .collect();
        let dyns = mems
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn ShardTarget>)
            .collect();
        (mems, dyns)
    }

    fn fragments(n: usize) -> FragmentSet {
        (0..n)
            .map(|i| Some(ShardData::new(i as u8, Bytes::from(vec![i as u8; 3]), false)))
            .collect()
    }

    fn manifest() -> FragmentManifest {
        FragmentManifest::new("obj", &ErasureConfig::new(2, 1).unwrap(), 6)
    }

    #[tokio::test]
    async fn test_write_then_read_in_shard_order() {
        let (mems, targets) = memory_targets(3);
        write_all(&targets, "obj", fragments(3), &manifest()).await.unwrap();

        for (i, mem) in mems.iter().enumerate() {
            assert_eq!(mem.object_count(), 1);
            let stored = mem.read_fragment("obj").await.unwrap();
            assert_eq!(stored.manifest.index, i);
        }

        let (read, absent) = read_all(&targets, "obj").await;
        assert_eq!(absent, 0);
        for (i, fragment) in read.iter().enumerate() {
            assert_eq!(fragment.as_ref().unwrap().data.as_ref(), &[i as u8; 3]);
        }
    }

    #[tokio::test]
    async fn test_absent_fragment_is_noop() {
        let (mems, targets) = memory_targets(3);
        let mut set = fragments(3);
        set[1] = None;

        write_all(&targets, "obj", set, &manifest()).await.unwrap();
        assert_eq!(mems[1].writes(), 0);
        assert_eq!(mems[0].object_count(), 1);
        assert_eq!(mems[1].object_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failures_aggregated_without_aborting_siblings() {
        let (mems, targets) = memory_targets(3);
        mems[0].set_offline(true);
        mems[2].set_offline(true);

        let err = write_all(&targets, "obj", fragments(3), &manifest())
            .await
            .unwrap_err();
        match err {
            ShardStoreError::WriteFailed {
                failed,
                total,
                errors,
            } => {
                assert_eq!(failed, 2);
                assert_eq!(total, 3);
                let indices: Vec<usize> = errors.iter().map(|(i, _)| *i).collect();
                assert_eq!(indices, [0, 2]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The healthy target was still written
        assert_eq!(mems[1].object_count(), 1);
    }

    #[tokio::test]
    async fn test_write_count_mismatch() {
        let (_, targets) = memory_targets(3);
        let err = write_all(&targets, "obj", fragments(2), &manifest())
            .await
            .unwrap_err();
        assert!(matches!(err, ShardStoreError::FragmentCountMismatch { .. }));
    }

    #[tokio::test]
    async fn test_read_failures_become_absences() {
        let (mems, targets) = memory_targets(4);
        write_all(&targets, "obj", fragments(4), &manifest()).await.unwrap();

        mems[1].set_offline(true);
        mems[3].remove("obj").await.unwrap();

        let (read, absent) = read_all(&targets, "obj").await;
        assert_eq!(absent, 2);
        assert!(read[0].is_some());
        assert!(read[1].is_none());
        assert!(read[2].is_some());
        assert!(read[3].is_none());
    }
}
