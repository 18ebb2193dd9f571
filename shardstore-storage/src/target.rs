//! Shard target trait
//!
//! Defines the interface every storage location must follow. A target holds
//! at most one fragment per object key, plus the manifest describing it.

use crate::manifest::FragmentManifest;
use bytes::Bytes;
use shardstore_core::error::Result;
use std::future::Future;
use std::pin::Pin;

/// A fragment as read back from a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFragment {
    /// Fragment bytes, verbatim
    pub data: Bytes,
    /// Manifest written alongside the fragment
    pub manifest: FragmentManifest,
}

/// Async shard target trait
///
/// All target implementations must be Send + Sync so one task per target
/// can run on the runtime concurrently.
pub trait ShardTarget: Send + Sync {
    /// Stable identity of this target (e.g. its directory path)
    fn address(&self) -> &str;

    /// Store the fragment for `key`, replacing any previous one
    fn write_fragment<'a>(
        &'a self,
        key: &'a str,
        data: Bytes,
        manifest: &'a FragmentManifest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Read the fragment for `key` in full
    fn read_fragment<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<StoredFragment>> + Send + 'a>>;

    /// Delete the fragment for `key` and its manifest.
    /// Returns whether anything was stored.
    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}
