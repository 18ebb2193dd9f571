//! Reed-Solomon Erasure Coding
//!
//! Implements (k, m) erasure coding over GF(256) where:
//! - k data shards are direct slices of the zero-padded input
//! - m parity shards are linear combinations of the data shards
//! - Any k of the k+m shards are enough to rebuild the input
//!
//! The generator matrix is the `(k+m) x k` Vandermonde matrix
//! `V[i][j] = (i+1)^j` multiplied by the inverse of its top `k x k` block.
//! The product has the identity as its top block (data shards pass through)
//! and keeps the property that any k rows are linearly independent.

use crate::error::{Result, ShardStoreError};
use crate::gf256;
use crate::matrix::Matrix;
use crate::{DATA_SHARDS, MAX_TOTAL_SHARDS, PARITY_SHARDS};
use bytes::Bytes;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Shards at least this large compute parity rows in parallel
const PARALLEL_THRESHOLD: usize = 64 * 1024;

/// Erasure coding configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureConfig {
    /// Number of data shards (k)
    pub data_shards: usize,
    /// Number of parity shards (m)
    pub parity_shards: usize,
}

impl Default for ErasureConfig {
    fn default() -> Self {
        Self {
            data_shards: DATA_SHARDS,
            parity_shards: PARITY_SHARDS,
        }
    }
}

impl ErasureConfig {
    /// Create a new erasure config
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self> {
        let config = Self {
            data_shards,
            parity_shards,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check k >= 1, m >= 1 and k + m <= 255
    pub fn validate(&self) -> Result<()> {
        if self.data_shards == 0 {
            return Err(ShardStoreError::InvalidParameters(
                "data_shards must be > 0".to_string(),
            ));
        }
        if self.parity_shards == 0 {
            return Err(ShardStoreError::InvalidParameters(
                "parity_shards must be > 0".to_string(),
            ));
        }
        if self.total_shards() > MAX_TOTAL_SHARDS {
            return Err(ShardStoreError::InvalidParameters(format!(
                "data_shards + parity_shards must be <= {}, got {}",
                MAX_TOTAL_SHARDS,
                self.total_shards()
            )));
        }
        Ok(())
    }

    /// Total number of shards
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Storage overhead ratio (parity/data)
    pub fn overhead_ratio(&self) -> f64 {
        self.parity_shards as f64 / self.data_shards as f64
    }

    /// Maximum number of failures that can be tolerated
    pub fn max_failures(&self) -> usize {
        self.parity_shards
    }

    /// Length of every shard for an input of `data_size` bytes
    pub fn shard_size(&self, data_size: usize) -> usize {
        data_size.div_ceil(self.data_shards)
    }
}

/// A single shard of erasure-coded data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardData {
    /// Shard index (0 to total_shards-1)
    pub index: u8,
    /// Shard data
    pub data: Bytes,
    /// Whether this is a parity shard
    pub is_parity: bool,
}

impl ShardData {
    /// Create a new shard
    pub fn new(index: u8, data: Bytes, is_parity: bool) -> Self {
        Self {
            index,
            data,
            is_parity,
        }
    }

    /// Get shard size
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Exactly `k+m` slots; `None` marks an absent fragment
pub type FragmentSet = Vec<Option<ShardData>>;

/// Reed-Solomon encoder/decoder
#[derive(Debug, Clone)]
pub struct ErasureEncoder {
    config: ErasureConfig,
    generator: Matrix,
}

impl ErasureEncoder {
    /// Create a new encoder with default configuration (4, 2)
    pub fn new() -> Result<Self> {
        Self::with_config(ErasureConfig::default())
    }

    /// Create a new encoder with custom configuration
    pub fn with_config(config: ErasureConfig) -> Result<Self> {
        config.validate()?;
        let k = config.data_shards;
        let vandermonde = Matrix::vandermonde(config.total_shards(), k);
        let top = vandermonde.select_rows(&(0..k).collect::<Vec<_>>());
        let generator = vandermonde.multiply(&top.invert()?)?;
        Ok(Self { config, generator })
    }

    /// Get the erasure configuration
    pub fn config(&self) -> &ErasureConfig {
        &self.config
    }

    /// Encode data into shards
    ///
    /// Returns a vector of shards (data + parity). Empty input yields
    /// `k+m` empty shards.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<ShardData>> {
        let k = self.config.data_shards;
        let shard_size = self.config.shard_size(data.len());

        // Pad data to be evenly divisible by data_shards
        let mut padded_data = data.to_vec();
        padded_data.resize(shard_size * k, 0);

        let data_shards: Vec<Bytes> = if shard_size == 0 {
            vec![Bytes::new(); k]
        } else {
            let padded = Bytes::from(padded_data);
            (0..k)
                .map(|i| padded.slice(i * shard_size..(i + 1) * shard_size))
                .collect()
        };

        let parity_shards = self.compute_parity(&data_shards, shard_size);

        let result = data_shards
            .into_iter()
            .chain(parity_shards.into_iter().map(Bytes::from))
            .enumerate()
            .map(|(i, shard)| ShardData::new(i as u8, shard, i >= k))
            .collect();

        Ok(result)
    }

    /// Parity rows `k..k+m` of the generator applied to the data shards
    fn compute_parity(&self, data_shards: &[Bytes], shard_size: usize) -> Vec<Vec<u8>> {
        let k = self.config.data_shards;
        let parity_row = |row: usize| {
            let mut out = vec![0u8; shard_size];
            for (j, shard) in data_shards.iter().enumerate() {
                gf256::mul_slice_xor(self.generator.get(row, j), shard, &mut out);
            }
            out
        };

        let rows = k..self.config.total_shards();
        if shard_size >= PARALLEL_THRESHOLD {
            rows.into_par_iter().map(parity_row).collect()
        } else {
            rows.map(parity_row).collect()
        }
    }

    /// Decode shards back into original data
    ///
    /// Requires at least `data_shards` number of shards.
    /// Missing shards should be represented as `None`.
    pub fn decode(&self, shards: &[Option<ShardData>], original_size: usize) -> Result<Bytes> {
        let mut working = shards.to_vec();
        self.reconstruct_data(&mut working)?;
        self.join(&working, original_size)
    }

    /// Rebuild every absent data shard in place
    ///
    /// Absent parity shards are left as `None`.
    pub fn reconstruct_data(&self, shards: &mut [Option<ShardData>]) -> Result<()> {
        let k = self.config.data_shards;
        let total_shards = self.config.total_shards();

        if shards.len() != total_shards {
            return Err(ShardStoreError::FragmentCountMismatch {
                expected: total_shards,
                actual: shards.len(),
            });
        }

        let present: Vec<usize> = (0..total_shards).filter(|&i| shards[i].is_some()).collect();
        if present.len() < k {
            return Err(ShardStoreError::InsufficientFragments {
                available: present.len(),
                required: k,
            });
        }

        let shard_size = self.check_sizes(shards)?;

        let missing_data: Vec<usize> = (0..k).filter(|&i| shards[i].is_none()).collect();
        if missing_data.is_empty() {
            return Ok(());
        }

        // Any k present rows of the generator form an invertible matrix
        let rows = &present[..k];
        let decode_matrix = self.generator.select_rows(rows).invert()?;

        let mut rebuilt = Vec::with_capacity(missing_data.len());
        for &target in &missing_data {
            let mut out = vec![0u8; shard_size];
            for (col, &source) in rows.iter().enumerate() {
                if let Some(shard) = &shards[source] {
                    gf256::mul_slice_xor(decode_matrix.get(target, col), &shard.data, &mut out);
                }
            }
            rebuilt.push((target, out));
        }

        for (target, out) in rebuilt {
            shards[target] = Some(ShardData::new(target as u8, Bytes::from(out), false));
        }
        Ok(())
    }

    /// Concatenate the data shards and truncate to `original_size`
    pub fn join(&self, shards: &[Option<ShardData>], original_size: usize) -> Result<Bytes> {
        let k = self.config.data_shards;
        let available: usize = shards
            .iter()
            .take(k)
            .map(|s| s.as_ref().map_or(0, ShardData::size))
            .sum();
        let mut result = Vec::with_capacity(original_size.min(available));
        for (i, shard_opt) in shards.iter().take(k).enumerate() {
            match shard_opt {
                Some(shard) => result.extend_from_slice(&shard.data),
                None => {
                    return Err(ShardStoreError::Internal(format!(
                        "data shard {} missing at join",
                        i
                    )))
                }
            }
        }

        if result.len() < original_size {
            return Err(ShardStoreError::FragmentSizeMismatch {
                expected: original_size,
                actual: result.len(),
            });
        }

        // Trim padding
        result.truncate(original_size);
        Ok(Bytes::from(result))
    }

    /// All present shards must share one length; returns it
    fn check_sizes(&self, shards: &[Option<ShardData>]) -> Result<usize> {
        let mut sizes = shards.iter().flatten().map(ShardData::size);
        let expected = sizes.next().unwrap_or(0);
        match sizes.find(|&s| s != expected) {
            Some(actual) => Err(ShardStoreError::FragmentSizeMismatch { expected, actual }),
            None => Ok(expected),
        }
    }

    /// Verify that shards are consistent (for health checking)
    pub fn verify_shards(&self, shards: &[ShardData]) -> Result<bool> {
        if shards.len() != self.config.total_shards() {
            return Ok(false);
        }

        // Check all shards have same size
        let expected_size = shards.first().map(|s| s.size()).unwrap_or(0);
        if !shards.iter().all(|s| s.size() == expected_size) {
            return Ok(false);
        }

        let k = self.config.data_shards;
        let data: Vec<Bytes> = shards[..k].iter().map(|s| s.data.clone()).collect();
        let parity = self.compute_parity(&data, expected_size);

        Ok(parity
            .iter()
            .zip(&shards[k..])
            .all(|(computed, stored)| computed.as_slice() == stored.data.as_ref()))
    }
}

/// Convenience function to encode data with default configuration
pub fn encode(data: &[u8]) -> Result<Vec<ShardData>> {
    ErasureEncoder::new()?.encode(data)
}

/// Convenience function to decode shards with default configuration
pub fn decode(shards: &[Option<ShardData>], original_size: usize) -> Result<Bytes> {
    ErasureEncoder::new()?.decode(shards, original_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use proptest::prelude::*;

    fn present(shards: Vec<ShardData>) -> FragmentSet {
        shards.into_iter().map(Some).collect()
    }

    /// Every subset of `0..n` with at most `max` members
    fn subsets(n: usize, max: usize) -> Vec<Vec<usize>> {
        (0u32..(1 << n))
            .filter(|mask| mask.count_ones() as usize <= max)
            .map(|mask| (0..n).filter(|i| mask & (1 << i) != 0).collect())
            .collect()
    }

    #[test]
    fn test_erasure_config() {
        let config = ErasureConfig::default();
        assert_eq!(config.data_shards, 4);
        assert_eq!(config.parity_shards, 2);
        assert_eq!(config.total_shards(), 6);
        assert_eq!(config.max_failures(), 2);
        assert!((config.overhead_ratio() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_invalid_config() {
        for (k, m) in [(0, 2), (4, 0), (200, 56)] {
            let err = ErasureConfig::new(k, m).unwrap_err();
            assert!(matches!(err, ShardStoreError::InvalidParameters(_)));
            assert_eq!(err.category(), ErrorCategory::Config);
        }
        assert!(ErasureConfig::new(200, 55).is_ok());
    }

    #[test]
    fn test_with_config_revalidates() {
        let config = ErasureConfig {
            data_shards: 0,
            parity_shards: 1,
        };
        assert!(ErasureEncoder::with_config(config).is_err());
    }

    #[test]
    fn test_generator_top_is_identity() {
        let encoder = ErasureEncoder::new().unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(encoder.generator.get(i, j), u8::from(i == j));
            }
        }
    }

    #[test]
    fn test_encode_decode_simple() {
        let encoder = ErasureEncoder::new().unwrap();
        let original = b"Hello, ShardStore!";

        let shards = encoder.encode(original).unwrap();
        assert_eq!(shards.len(), 6);

        let decoded = encoder.decode(&present(shards), original.len()).unwrap();
        assert_eq!(decoded.as_ref(), original);
    }

    #[test]
    fn test_hello_world_layout() {
        let encoder = ErasureEncoder::new().unwrap();
        let shards = encoder.encode(b"HELLOWORLD").unwrap();

        assert_eq!(shards.len(), 6);
        assert!(shards.iter().all(|s| s.size() == 3));
        assert_eq!(shards[0].data.as_ref(), b"HEL");
        assert_eq!(shards[1].data.as_ref(), b"LOW");
        assert_eq!(shards[2].data.as_ref(), b"ORL");
        assert_eq!(shards[3].data.as_ref(), b"D\0\0");
    }

    #[test]
    fn test_hello_world_every_two_missing() {
        let encoder = ErasureEncoder::new().unwrap();
        let original = b"HELLOWORLD";
        let shards = encoder.encode(original).unwrap();

        for absent in subsets(6, 2) {
            let mut set = present(shards.clone());
            for &i in &absent {
                set[i] = None;
            }
            let decoded = encoder.decode(&set, original.len()).unwrap();
            assert_eq!(decoded.as_ref(), original, "absent {:?}", absent);
        }
    }

    #[test]
    fn test_too_many_missing_shards() {
        let encoder = ErasureEncoder::new().unwrap();
        let original = b"HELLOWORLD";
        let shards = encoder.encode(original).unwrap();

        for absent in subsets(6, 6).into_iter().filter(|a| a.len() >= 3) {
            let mut set = present(shards.clone());
            for &i in &absent {
                set[i] = None;
            }
            let err = encoder.decode(&set, original.len()).unwrap_err();
            assert!(matches!(err, ShardStoreError::InsufficientFragments { .. }));
            assert_eq!(err.category(), ErrorCategory::Reconstruction);
        }
    }

    #[test]
    fn test_empty_input() {
        let encoder = ErasureEncoder::new().unwrap();
        let shards = encoder.encode(b"").unwrap();
        assert_eq!(shards.len(), 6);
        assert!(shards.iter().all(|s| s.size() == 0));

        let mut set = present(shards);
        set[0] = None;
        set[5] = None;
        let decoded = encoder.decode(&set, 0).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_reconstruct_data_in_place() {
        let encoder = ErasureEncoder::with_config(ErasureConfig::new(3, 2).unwrap()).unwrap();
        let shards = encoder.encode(b"reconstruct me in place").unwrap();

        let mut set = present(shards.clone());
        set[1] = None;
        set[4] = None;
        encoder.reconstruct_data(&mut set).unwrap();

        assert_eq!(set[1].as_ref(), Some(&shards[1]));
        // Parity shards are not rebuilt
        assert!(set[4].is_none());
    }

    #[test]
    fn test_fragment_size_mismatch() {
        let encoder = ErasureEncoder::new().unwrap();
        let mut set = present(encoder.encode(b"HELLOWORLD").unwrap());
        set[2] = Some(ShardData::new(2, Bytes::from_static(b"XY"), false));

        let err = encoder.decode(&set, 10).unwrap_err();
        assert!(matches!(err, ShardStoreError::FragmentSizeMismatch { .. }));
        assert_eq!(err.category(), ErrorCategory::Encoding);
    }

    #[test]
    fn test_fragment_count_mismatch() {
        let encoder = ErasureEncoder::new().unwrap();
        let mut set = present(encoder.encode(b"HELLOWORLD").unwrap());
        set.pop();
        assert!(matches!(
            encoder.decode(&set, 10),
            Err(ShardStoreError::FragmentCountMismatch { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_encode_parallel_path_matches() {
        let encoder = ErasureEncoder::new().unwrap();
        let original: Vec<u8> = (0..4 * PARALLEL_THRESHOLD + 7).map(|i| (i % 251) as u8).collect();
        let shards = encoder.encode(&original).unwrap();

        // Same parity as the sequential path
        let data: Vec<Bytes> = shards[..4].iter().map(|s| s.data.clone()).collect();
        let sequential: Vec<Vec<u8>> = (4..6)
            .map(|row| {
                let mut out = vec![0u8; shards[0].size()];
                for (j, shard) in data.iter().enumerate() {
                    gf256::mul_slice_xor(encoder.generator.get(row, j), shard, &mut out);
                }
                out
            })
            .collect();
        assert_eq!(shards[4].data.as_ref(), sequential[0].as_slice());
        assert_eq!(shards[5].data.as_ref(), sequential[1].as_slice());

        let mut set = present(shards);
        set[0] = None;
        set[3] = None;
        assert_eq!(encoder.decode(&set, original.len()).unwrap().as_ref(), original.as_slice());
    }

    #[test]
    fn test_verify_shards() {
        let encoder = ErasureEncoder::new().unwrap();
        let original = b"verify test";

        let shards = encoder.encode(original).unwrap();
        assert!(encoder.verify_shards(&shards).unwrap());

        // Corrupt a shard
        let mut corrupted_shards = shards.clone();
        let mut data = corrupted_shards[0].data.to_vec();
        data[0] ^= 0xFF;
        corrupted_shards[0].data = Bytes::from(data);
        assert!(!encoder.verify_shards(&corrupted_shards).unwrap());
    }

    #[test]
    fn test_shard_indices() {
        let encoder = ErasureEncoder::new().unwrap();
        let shards = encoder.encode(b"index test").unwrap();

        for (i, shard) in shards.iter().enumerate() {
            assert_eq!(shard.index as usize, i);
            assert_eq!(shard.is_parity, i >= 4);
        }
    }

    #[test]
    fn test_join_rejects_oversized_length() {
        let encoder = ErasureEncoder::new().unwrap();
        let set = present(encoder.encode(b"HELLOWORLD").unwrap());

        // Capacity is bounded by the shard bytes, not the requested length
        let err = encoder.join(&set, usize::MAX / 2).unwrap_err();
        assert!(matches!(
            err,
            ShardStoreError::FragmentSizeMismatch { actual: 12, .. }
        ));
    }

    #[test]
    fn test_convenience_functions() {
        let shards = encode(b"defaults").unwrap();
        let set = present(shards);
        assert_eq!(decode(&set, 8).unwrap().as_ref(), b"defaults");
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            data in proptest::collection::vec(any::<u8>(), 0..512),
            k in 1usize..8,
            m in 1usize..5,
        ) {
            let encoder = ErasureEncoder::with_config(ErasureConfig::new(k, m).unwrap()).unwrap();
            let shards = encoder.encode(&data).unwrap();
            prop_assert_eq!(shards.len(), k + m);
            let decoded = encoder.decode(&present(shards), data.len()).unwrap();
            prop_assert_eq!(decoded.as_ref(), data.as_slice());
        }

        #[test]
        fn prop_any_m_absent_recovers(
            (data, k, m, absent) in (1usize..6, 1usize..4).prop_flat_map(|(k, m)| (
                proptest::collection::vec(any::<u8>(), 1..256),
                Just(k),
                Just(m),
                proptest::sample::subsequence((0..k + m).collect::<Vec<_>>(), 0..=m),
            )),
        ) {
            let encoder = ErasureEncoder::with_config(ErasureConfig::new(k, m).unwrap()).unwrap();
            let shards = encoder.encode(&data).unwrap();

            let mut set = present(shards);
            for &i in &absent {
                set[i] = None;
            }
            let decoded = encoder.decode(&set, data.len()).unwrap();
            prop_assert_eq!(decoded.as_ref(), data.as_slice());
        }
    }
}
