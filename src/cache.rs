//! Session-lifetime memoization keyed by explicit, hashable inputs
//!
//! Geometry never takes part in a key. Layers are identified by a
//! [`LayerFingerprint`] computed from their coordinates instead.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;
use xxhash_rust::xxh64::Xxh64;

use crate::geotag::GeoLayer;

/// Maps inputs to computed outputs for the life of the owning session.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    name: &'static str,
    entries: HashMap<K, Arc<V>>,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V> MemoCache<K, V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached value for `key`, computing it on a miss. Failed
    /// computations are not stored, so the next call retries.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.entries.get(&key) {
            self.hits += 1;
            debug!("{} cache hit for {:?}", self.name, key);
            return Ok(Arc::clone(value));
        }

        self.misses += 1;
        debug!("{} cache miss for {:?}", self.name, key);
        let value = Arc::new(compute()?);
        self.entries.insert(key, Arc::clone(&value));
        Ok(value)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stable surrogate identity of a point layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerFingerprint {
    pub municipality: String,
    pub rows: usize,
    /// xxHash64 over the coordinate bit patterns in record order.
    pub checksum: u64,
}

impl LayerFingerprint {
    #[must_use]
    pub fn of(layer: &GeoLayer) -> Self {
        let mut hasher = Xxh64::new(0);
        for (latitude, longitude) in layer.coordinates() {
            hasher.update(&latitude.to_bits().to_le_bytes());
            hasher.update(&longitude.to_bits().to_le_bytes());
        }
        Self {
            municipality: layer.municipality.clone(),
            rows: layer.len(),
            checksum: hasher.digest(),
        }
    }
}

/// Key for clustering results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterKey {
    pub layer: LayerFingerprint,
    pub n_clusters: usize,
}
