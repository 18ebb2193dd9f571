//! Per-fragment manifest
//!
//! Fragments are stored verbatim, with no header. The manifest written next
//! to each one records what a reader needs to rebuild the object: the
//! original length, the shard length and the shard index the fragment was
//! written for. A fresh `generation` id per Save tells fragments of one write
//! apart from those of another, even when both have the same length.

use serde::{Deserialize, Serialize};
use shardstore_core::error::{Result, ShardStoreError};
use shardstore_core::ErasureConfig;
use uuid::Uuid;

/// Metadata stored beside every fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentManifest {
    /// Object key
    pub key: String,
    /// Shard index this fragment was written for
    pub index: usize,
    /// Data shard count (k) at write time
    pub data_shards: usize,
    /// Parity shard count (m) at write time
    pub parity_shards: usize,
    /// Length of the object before padding
    pub original_len: u64,
    /// Length of every fragment of the object
    pub shard_len: u64,
    /// Identifies the Save that wrote this fragment
    #[serde(default)]
    pub generation: Uuid,
}

impl FragmentManifest {
    /// Manifest for shard 0 of a new write; use [`Self::for_index`] for the rest
    pub fn new(key: &str, config: &ErasureConfig, original_len: usize) -> Self {
        Self {
            key: key.to_string(),
            index: 0,
            data_shards: config.data_shards,
            parity_shards: config.parity_shards,
            original_len: original_len as u64,
            shard_len: config.shard_size(original_len) as u64,
            generation: Uuid::new_v4(),
        }
    }

    /// Same object layout, different shard index
    pub fn for_index(&self, index: usize) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }

    /// True when both manifests describe the same object layout
    /// written by the same Save (everything except the shard index)
    pub fn same_layout(&self, other: &FragmentManifest) -> bool {
        self.generation == other.generation
            && self.key == other.key
            && self.data_shards == other.data_shards
            && self.parity_shards == other.parity_shards
            && self.original_len == other.original_len
            && self.shard_len == other.shard_len
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| ShardStoreError::Manifest(e.to_string()))
    }

    /// Deserialize from JSON
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| ShardStoreError::Manifest(e.to_string()))
    }
}

/// Object keys name a directory inside each target, so they must be a
/// single plain path component.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0');
    if invalid {
        return Err(ShardStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_layout() {
        let config = ErasureConfig::new(4, 2).unwrap();
        let manifest = FragmentManifest::new("hello.txt", &config, 10);
        assert_eq!(manifest.shard_len, 3);
        assert_eq!(manifest.index, 0);

        let other = manifest.for_index(5);
        assert_eq!(other.index, 5);
        assert!(manifest.same_layout(&other));

        let mut longer = other.clone();
        longer.original_len = 11;
        assert!(!manifest.same_layout(&longer));

        // Same length, different Save
        let rewrite = FragmentManifest::new("hello.txt", &config, 10);
        assert_ne!(rewrite.generation, manifest.generation);
        assert!(!manifest.same_layout(&rewrite));
    }

    #[test]
    fn test_manifest_json() {
        let config = ErasureConfig::default();
        let manifest = FragmentManifest::new("obj", &config, 0).for_index(3);
        let json = manifest.to_json().unwrap();
        assert_eq!(FragmentManifest::from_json(&json).unwrap(), manifest);

        let json = br#"{"key":"obj","index":1,"data_shards":4,"parity_shards":2,"original_len":8,"shard_len":2}"#;
        assert!(FragmentManifest::from_json(json).unwrap().generation.is_nil());

        let err = FragmentManifest::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, ShardStoreError::Manifest(_)));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("report.pdf").is_ok());
        assert!(validate_key(".hidden").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b", "../etc"] {
            assert!(
                matches!(validate_key(bad), Err(ShardStoreError::InvalidKey(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
