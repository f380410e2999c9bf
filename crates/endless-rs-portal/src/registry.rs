//! In-memory portal registry over the binding store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::warn;

use crate::key::PortalKey;
use crate::store::{LegacyKey, LegacyLink, PortalLink, PortalRegistryStore};

/// Link and legacy maps with a dirty flag. Mutations mark the registry
/// dirty; callers persist at the end of the mutating tick.
pub struct PortalRegistry {
    store: PortalRegistryStore,
    links: Mutex<HashMap<PortalKey, PortalLink>>,
    legacy: Mutex<HashMap<LegacyKey, LegacyLink>>,
    dirty: AtomicBool,
}

impl PortalRegistry {
    /// Load the registry from `<data>/portal-bindings.json`.
    pub fn load(data_dir: &Path) -> Self {
        let store = PortalRegistryStore::new(data_dir);
        let loaded = store.load();
        Self {
            store,
            links: Mutex::new(loaded.links),
            legacy: Mutex::new(loaded.legacy),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn link(&self, key: &PortalKey) -> Option<PortalLink> {
        self.links.lock().unwrap().get(key).cloned()
    }

    pub fn set_link(&self, key: PortalKey, link: PortalLink) {
        self.links.lock().unwrap().insert(key, link);
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn remove_link(&self, key: &PortalKey) -> Option<PortalLink> {
        let removed = self.links.lock().unwrap().remove(key);
        if removed.is_some() {
            self.dirty.store(true, Ordering::SeqCst);
        }
        removed
    }

    /// Take the legacy record for a portal column, removing it.
    pub fn take_legacy(&self, dimension: &str, x: i32, z: i32) -> Option<LegacyLink> {
        let key = LegacyKey {
            dimension: dimension.to_string(),
            x,
            z,
        };
        let removed = self.legacy.lock().unwrap().remove(&key);
        if removed.is_some() {
            self.dirty.store(true, Ordering::SeqCst);
        }
        removed
    }

    pub fn legacy_len(&self) -> usize {
        self.legacy.lock().unwrap().len()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    /// All portal keys, for index rebuilds.
    pub fn keys(&self) -> Vec<PortalKey> {
        self.links.lock().unwrap().keys().cloned().collect()
    }

    /// Snapshot of every binding.
    pub fn links_snapshot(&self) -> Vec<(PortalKey, PortalLink)> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Write the registry out when dirty. A failed write keeps the dirty
    /// flag so the next mutation retries; in-memory state is never rolled
    /// back.
    pub fn persist_if_dirty(&self) {
        if !self.is_dirty() {
            return;
        }
        let links = self.links.lock().unwrap().clone();
        let legacy = self.legacy.lock().unwrap().clone();
        match self.store.save(&links, &legacy) {
            Ok(()) => self.dirty.store(false, Ordering::SeqCst),
            Err(e) => warn!("Failed to persist portal bindings: {e}"),
        }
    }
}
