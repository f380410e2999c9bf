//! Persistent registry of user-minted custom keys.
//!
//! Maps a normalized key (the text written in the book) to the dimension id
//! it was minted for. Stored as `<data>/custom-dimensions.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::hash::{normalize, sanitize};

/// Id prefix for custom dimensions.
pub const CUSTOM_PREFIX: &str = "endlessdimensions:custom_";

/// Minted keys look like `ED-XXXXXX`; the alphabet skips the confusable
/// `I`, `O`, `0` and `1`.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const KEY_LENGTH: usize = 6;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    entries: HashMap<String, String>,
}

/// Custom key → dimension id map, persisted on every registration.
pub struct CustomKeyRegistry {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl CustomKeyRegistry {
    /// Open the registry backed by `<data>/custom-dimensions.json`. A missing
    /// or malformed file starts empty (malformed files are logged).
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("custom-dimensions.json");
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<StoreFile>(&content) {
                Ok(file) => {
                    info!(
                        "Loaded {} custom dimension key(s) from {}",
                        file.entries.len(),
                        path.display()
                    );
                    file.entries
                }
                Err(e) => {
                    warn!("Malformed {}: {e}; starting empty", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, entries }
    }

    /// Register `key` → `dimension_id` and persist. The in-memory entry is
    /// kept even if the save fails; the next registration retries the write.
    pub fn register(&mut self, key: &str, dimension_id: &str) -> Result<(), KeyStoreError> {
        self.entries
            .insert(normalize(key), dimension_id.to_string());
        self.save()
    }

    /// Dimension id registered for `key`, if any.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize(key)).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mint a fresh `ED-XXXXXX` key not present in the registry.
    pub fn generate_key(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let suffix: String = (0..KEY_LENGTH)
                .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
                .collect();
            let key = format!("ED-{suffix}");
            if !self.contains(&key) {
                return key;
            }
        }
    }

    /// Dimension id a custom key maps to.
    pub fn dimension_id_for(key: &str) -> String {
        format!("{CUSTOM_PREFIX}{}", sanitize(&normalize(key), "custom"))
    }

    /// Write the store via a sibling `.tmp` file and atomic rename. Where the
    /// filesystem refuses the rename, fall back to a plain replace.
    pub fn save(&self) -> Result<(), KeyStoreError> {
        let file = StoreFile {
            version: STORE_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(
                "Atomic rename to {} failed ({e}); replacing in place",
                self.path.display()
            );
            std::fs::write(&self.path, &json)?;
            std::fs::remove_file(&tmp).ok();
        }
        Ok(())
    }
}
