//! In-memory shard target
//!
//! Used for testing and development. Not persistent. Can be switched
//! offline or have individual objects dropped to simulate failures.

use crate::manifest::FragmentManifest;
use crate::target::{ShardTarget, StoredFragment};
use bytes::Bytes;
use parking_lot::RwLock;
use shardstore_core::error::{Result, ShardStoreError};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// In-memory shard target
pub struct MemoryTarget {
    address: String,

    /// Fragment storage, keyed by object key
    objects: RwLock<HashMap<String, StoredFragment>>,

    /// When set, every read and write fails
    offline: AtomicBool,

    /// Operation counters
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryTarget {
    /// Create a new in-memory target
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            objects: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Take the target offline (or bring it back)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Replace the stored fragment bytes for `key`, keeping its manifest
    pub fn overwrite_data(&self, key: &str, data: Bytes) -> bool {
        match self.objects.write().get_mut(key) {
            Some(stored) => {
                stored.data = data;
                true
            }
            None => false,
        }
    }

    /// Number of objects held
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Completed read attempts (including failed ones)
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Completed write attempts (including failed ones)
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn check_online(&self) -> Result<()> {
        if self.is_offline() {
            return Err(ShardStoreError::TargetOffline(self.address.clone()));
        }
        Ok(())
    }
}

impl ShardTarget for MemoryTarget {
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
            self.writes.fetch_add(1, Ordering::Relaxed);
            self.check_online()?;
            self.objects.write().insert(
                key.to_string(),
                StoredFragment {
                    data,
                    manifest: manifest.clone(),
                },
            );
            Ok(())
        })
    }

    fn read_fragment<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<StoredFragment>> + Send + 'a>> {
        Box::pin(async move {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.check_online()?;
            self.objects.read().get(key).cloned().ok_or_else(|| {
                ShardStoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} has no fragment for {}", self.address, key),
                ))
            })
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.objects.write().remove(key).is_some())
        })
    }
}
