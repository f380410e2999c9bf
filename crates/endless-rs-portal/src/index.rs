//! Chunk-keyed in-memory index of portal keys.
//!
//! Ephemeral: rebuilt from the registry at startup and mirrored on every
//! registry mutation.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use endless_rs_engine::BlockPos;

use crate::key::PortalKey;

/// Packed chunk key: x in the high word, z in the low word.
pub fn pack_chunk_key(cx: i32, cz: i32) -> u64 {
    ((cx as u32 as u64) << 32) | (cz as u32 as u64)
}

/// `dimension → packed chunk → portal keys`, safe for concurrent use.
#[derive(Default)]
pub struct PortalIndex {
    inner: RwLock<HashMap<String, HashMap<u64, HashSet<PortalKey>>>>,
}

impl PortalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a portal under every chunk it intersects.
    pub fn insert(&self, key: &PortalKey) {
        let mut inner = self.inner.write().unwrap();
        let dim = inner.entry(key.dimension.clone()).or_default();
        for (cx, cz) in key.chunks() {
            dim.entry(pack_chunk_key(cx, cz))
                .or_default()
                .insert(key.clone());
        }
    }

    /// Remove a portal from every chunk it intersects, collapsing empty
    /// dimension maps.
    pub fn remove(&self, key: &PortalKey) {
        let mut inner = self.inner.write().unwrap();
        if let Some(dim) = inner.get_mut(&key.dimension) {
            for (cx, cz) in key.chunks() {
                let packed = pack_chunk_key(cx, cz);
                if let Some(set) = dim.get_mut(&packed) {
                    set.remove(key);
                    if set.is_empty() {
                        dim.remove(&packed);
                    }
                }
            }
            if dim.is_empty() {
                inner.remove(&key.dimension);
            }
        }
    }

    /// Portals indexed in one chunk.
    pub fn in_chunk(&self, dimension: &str, cx: i32, cz: i32) -> Vec<PortalKey> {
        let inner = self.inner.read().unwrap();
        inner
            .get(dimension)
            .and_then(|dim| dim.get(&pack_chunk_key(cx, cz)))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The indexed portal containing `pos`, if any.
    pub fn find_containing(&self, dimension: &str, pos: BlockPos) -> Option<PortalKey> {
        let (cx, cz) = pos.chunk();
        self.in_chunk(dimension, cx, cz)
            .into_iter()
            .find(|key| key.contains(pos))
    }

    /// Drop everything and re-index from `keys`.
    pub fn rebuild<I: IntoIterator<Item = PortalKey>>(&self, keys: I) {
        self.inner.write().unwrap().clear();
        for key in keys {
            self.insert(&key);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}
