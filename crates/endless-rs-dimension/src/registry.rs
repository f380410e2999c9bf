//! Persistent catalog of dimension definitions.
//!
//! One JSON file per definition under `<data>/dimensions/`, file name derived
//! from the dimension id with `:` replaced by `_`. Definitions are written
//! once; re-registering an existing id returns the stored record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DefinitionError;
use crate::model::DimensionDefinition;

/// Version stamped into every definition file. Files claiming a newer
/// version fail to load (that file only).
pub const CURRENT_VERSION: u32 = 2;

#[derive(Serialize, Deserialize)]
struct DefinitionFile {
    version: u32,
    #[serde(flatten)]
    definition: DimensionDefinition,
    /// Top-level fields this build does not know about; preserved verbatim.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

struct Stored {
    definition: Arc<DimensionDefinition>,
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    defs: HashMap<String, Stored>,
}

/// In-memory view of the on-disk definition catalog.
pub struct DimensionDefinitionRegistry {
    dir: PathBuf,
    inner: Mutex<Inner>,
}

impl DimensionDefinitionRegistry {
    /// Load every definition under `<data>/dimensions/`. Files that fail to
    /// parse, validate, or migrate are skipped with a warning; the rest load.
    pub fn load(data_dir: &Path) -> Self {
        let dir = data_dir.join("dimensions");
        let registry = Self {
            dir,
            inner: Mutex::new(Inner::default()),
        };

        let entries = match std::fs::read_dir(&registry.dir) {
            Ok(entries) => entries,
            Err(_) => return registry,
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();

        let mut loaded = 0usize;
        for path in paths {
            match read_definition_file(&path) {
                Ok(file) => {
                    let mut inner = registry.inner.lock().unwrap();
                    let id = file.definition.dimension_id.clone();
                    inner.order.push(id.clone());
                    inner.defs.insert(
                        id,
                        Stored {
                            definition: Arc::new(file.definition),
                            extra: file.extra,
                        },
                    );
                    loaded += 1;
                }
                Err(e) => warn!("Skipping definition {}: {e}", path.display()),
            }
        }
        if loaded > 0 {
            info!("Loaded {loaded} dimension definition(s) from {}", registry.dir.display());
        }
        registry
    }

    /// Stored definition for `dimension_id`, if registered.
    pub fn get(&self, dimension_id: &str) -> Option<Arc<DimensionDefinition>> {
        self.inner
            .lock()
            .unwrap()
            .defs
            .get(dimension_id)
            .map(|s| s.definition.clone())
    }

    pub fn contains(&self, dimension_id: &str) -> bool {
        self.inner.lock().unwrap().defs.contains_key(dimension_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All definitions in registration order.
    pub fn all(&self) -> Vec<Arc<DimensionDefinition>> {
        let inner = self.inner.lock().unwrap();
        inner
            .order
            .iter()
            .filter_map(|id| inner.defs.get(id).map(|s| s.definition.clone()))
            .collect()
    }

    /// Register a definition. If the id already exists the stored record is
    /// returned and the argument is dropped; definitions never mutate.
    pub fn register(
        &self,
        definition: DimensionDefinition,
    ) -> Result<Arc<DimensionDefinition>, DefinitionError> {
        definition.validate()?;

        if let Some(existing) = self.get(&definition.dimension_id) {
            return Ok(existing);
        }

        let file = DefinitionFile {
            version: CURRENT_VERSION,
            definition,
            extra: serde_json::Map::new(),
        };
        let path = self.dir.join(file_name(&file.definition.dimension_id));
        write_atomic(&path, &serde_json::to_string_pretty(&file)?)?;

        let stored = Arc::new(file.definition);
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(stored.dimension_id.clone());
        inner.defs.insert(
            stored.dimension_id.clone(),
            Stored {
                definition: stored.clone(),
                extra: file.extra,
            },
        );
        Ok(stored)
    }
}

/// File name for a dimension id: colons are not portable in paths.
fn file_name(dimension_id: &str) -> String {
    format!("{}.json", dimension_id.replace(':', "_"))
}

fn read_definition_file(path: &Path) -> Result<DefinitionFile, DefinitionError> {
    let content = std::fs::read_to_string(path)?;
    let mut value: serde_json::Value = serde_json::from_str(&content)?;
    migrate(&mut value)?;
    let file: DefinitionFile = serde_json::from_value(value)?;
    file.definition.validate()?;
    Ok(file)
}

/// Stamp the current version onto an older file; reject files from the
/// future.
fn migrate(value: &mut serde_json::Value) -> Result<(), DefinitionError> {
    let found = value
        .get("version")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as u32;
    if found > CURRENT_VERSION {
        return Err(DefinitionError::UnsupportedVersion {
            found,
            current: CURRENT_VERSION,
        });
    }
    value["version"] = serde_json::Value::from(CURRENT_VERSION);
    Ok(())
}

fn write_atomic(path: &Path, content: &str) -> Result<(), DefinitionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        warn!("Atomic rename to {} failed ({e}); replacing in place", path.display());
        std::fs::write(path, content)?;
        std::fs::remove_file(&tmp).ok();
    }
    Ok(())
}
