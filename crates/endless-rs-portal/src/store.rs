//! Versioned, atomic JSON persistence of portal bindings.
//!
//! Schema version 2 stores full portal keys and links. Files written by the
//! original single-column layout (version 1, or a `legacy:` array) are read
//! into the legacy map and upgraded by the router on first traversal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::key::PortalKey;

pub const STORE_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum PortalStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ─── Link model ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    Default,
    BookLinked,
}

/// Where a portal leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationRef {
    pub dimension: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    /// Destination portal, once known. Always in `dimension`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal: Option<PortalKey>,
}

/// A binding from one portal to a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalLink {
    #[serde(rename = "type")]
    pub kind: LinkType,
    #[serde(rename = "linkId")]
    pub link_id: Uuid,
    #[serde(rename = "to")]
    pub destination: DestinationRef,
}

/// Pre-versioning portal identity: one block column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegacyKey {
    pub dimension: String,
    pub x: i32,
    pub z: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyLink {
    pub to_dimension: String,
}

// ─── Wire shapes ─────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct BindingRecord {
    from: PortalKey,
    #[serde(flatten)]
    link: PortalLink,
}

#[derive(Serialize, Deserialize)]
struct LegacyFrom {
    dimension: String,
    x: i32,
    z: i32,
}

#[derive(Serialize, Deserialize)]
struct LegacyRecord {
    from: LegacyFrom,
    #[serde(rename = "toDimension")]
    to_dimension: String,
}

#[derive(Deserialize)]
struct FlatLegacyRecord {
    #[serde(rename = "dimensionKey")]
    dimension_key: String,
    #[serde(rename = "blockX")]
    block_x: i32,
    #[serde(rename = "blockZ")]
    block_z: i32,
    #[serde(rename = "dimensionId")]
    dimension_id: String,
}

#[derive(Serialize)]
struct FileOut<'a> {
    version: u32,
    bindings: Vec<&'a BindingRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    legacy: Vec<&'a LegacyRecord>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Everything a load produced.
#[derive(Debug, Default)]
pub struct LoadedBindings {
    pub links: HashMap<PortalKey, PortalLink>,
    pub legacy: HashMap<LegacyKey, LegacyLink>,
}

/// File-backed binding store.
pub struct PortalRegistryStore {
    path: PathBuf,
    fallback_path: PathBuf,
}

impl PortalRegistryStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("portal-bindings.json"),
            fallback_path: data_dir.join("plugin-data/portal-bindings.json"),
        }
    }

    /// Read bindings, falling back to the legacy location when the primary
    /// file is absent. Malformed entries are skipped with a warning.
    pub fn load(&self) -> LoadedBindings {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => match std::fs::read_to_string(&self.fallback_path) {
                Ok(raw) => {
                    info!(
                        "Reading portal bindings from legacy location {}",
                        self.fallback_path.display()
                    );
                    raw
                }
                Err(_) => return LoadedBindings::default(),
            },
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Malformed {}: {e}; starting empty", self.path.display());
                return LoadedBindings::default();
            }
        };

        let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(1) as u32;
        let mut loaded = LoadedBindings::default();

        let entries = value
            .get("bindings")
            .or_else(|| value.get("entries"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for entry in &entries {
            if version >= STORE_VERSION {
                if let Some((key, link)) = parse_binding(entry) {
                    loaded.links.insert(key, link);
                    continue;
                }
            }
            match parse_legacy(entry) {
                Some((key, link)) => {
                    loaded.legacy.insert(key, link);
                }
                None => warn!("Skipping unreadable portal binding: {entry}"),
            }
        }

        if let Some(entries) = value.get("legacy").and_then(|v| v.as_array()) {
            for entry in entries {
                match parse_legacy(entry) {
                    Some((key, link)) => {
                        loaded.legacy.insert(key, link);
                    }
                    None => warn!("Skipping unreadable legacy portal binding: {entry}"),
                }
            }
        }

        info!(
            "Loaded {} portal binding(s), {} legacy record(s)",
            loaded.links.len(),
            loaded.legacy.len()
        );
        loaded
    }

    /// Persist via temp file + atomic rename, with a plain replace fallback.
    pub fn save(
        &self,
        links: &HashMap<PortalKey, PortalLink>,
        legacy: &HashMap<LegacyKey, LegacyLink>,
    ) -> Result<(), PortalStoreError> {
        let mut bindings: Vec<BindingRecord> = links
            .iter()
            .map(|(key, link)| BindingRecord {
                from: key.clone(),
                link: link.clone(),
            })
            .collect();
        bindings.sort_by(|a, b| {
            (&a.from.dimension, a.from.min.x, a.from.min.y, a.from.min.z).cmp(&(
                &b.from.dimension,
                b.from.min.x,
                b.from.min.y,
                b.from.min.z,
            ))
        });

        let mut legacy_records: Vec<LegacyRecord> = legacy
            .iter()
            .map(|(key, link)| LegacyRecord {
                from: LegacyFrom {
                    dimension: key.dimension.clone(),
                    x: key.x,
                    z: key.z,
                },
                to_dimension: link.to_dimension.clone(),
            })
            .collect();
        legacy_records.sort_by(|a, b| {
            (&a.from.dimension, a.from.x, a.from.z).cmp(&(&b.from.dimension, b.from.x, b.from.z))
        });

        let file = FileOut {
            version: STORE_VERSION,
            bindings: bindings.iter().collect(),
            legacy: legacy_records.iter().collect(),
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

fn parse_binding(value: &serde_json::Value) -> Option<(PortalKey, PortalLink)> {
    let record: BindingRecord = serde_json::from_value(value.clone()).ok()?;
    let mut link = record.link;
    if let Some(portal) = &link.destination.portal {
        if portal.dimension != link.destination.dimension {
            warn!(
                "Dropping destination portal in {} that names {}",
                link.destination.dimension, portal.dimension
            );
            link.destination.portal = None;
        }
    }
    Some((record.from, link))
}

fn parse_legacy(value: &serde_json::Value) -> Option<(LegacyKey, LegacyLink)> {
    if let Ok(record) = serde_json::from_value::<LegacyRecord>(value.clone()) {
        return Some((
            LegacyKey {
                dimension: record.from.dimension,
                x: record.from.x,
                z: record.from.z,
            },
            LegacyLink {
                to_dimension: record.to_dimension,
            },
        ));
    }
    let record: FlatLegacyRecord = serde_json::from_value(value.clone()).ok()?;
    Some((
        LegacyKey {
            dimension: record.dimension_key,
            x: record.block_x,
            z: record.block_z,
        },
        LegacyLink {
            to_dimension: record.dimension_id,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::PortalAxis;
    use endless_rs_engine::BlockPos;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("endless_pstore_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn portal_key(dimension: &str) -> PortalKey {
        PortalKey::normalized(
            dimension,
            PortalAxis::Z,
            BlockPos::new(10, 64, 5),
            BlockPos::new(11, 66, 5),
        )
    }

    fn link(to: &str) -> PortalLink {
        PortalLink {
            kind: LinkType::BookLinked,
            link_id: Uuid::new_v4(),
            destination: DestinationRef {
                dimension: to.to_string(),
                x: 0.5,
                y: 64.0,
                z: 0.5,
                yaw: 90.0,
                pitch: 0.0,
                portal: Some(portal_key(to)),
            },
        }
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = temp_dir();
        let store = PortalRegistryStore::new(&dir);

        let mut links = HashMap::new();
        links.insert(
            portal_key("minecraft:overworld"),
            link("endlessdimensions:easter_library"),
        );
        let mut legacy = HashMap::new();
        legacy.insert(
            LegacyKey {
                dimension: "minecraft:overworld".into(),
                x: 10,
                z: 20,
            },
            LegacyLink {
                to_dimension: "endlessdimensions:easter_zoo".into(),
            },
        );

        store.save(&links, &legacy).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.links, links);
        assert_eq!(loaded.legacy, legacy);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn file_schema_is_version_two() {
        let dir = temp_dir();
        let store = PortalRegistryStore::new(&dir);
        let mut links = HashMap::new();
        links.insert(
            portal_key("minecraft:overworld"),
            link("endlessdimensions:easter_library"),
        );
        store.save(&links, &HashMap::new()).unwrap();

        let raw = std::fs::read_to_string(dir.join("portal-bindings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 2);
        let binding = &value["bindings"][0];
        assert_eq!(binding["from"]["dimension"], "minecraft:overworld");
        assert_eq!(binding["from"]["axis"], "Z");
        assert_eq!(binding["type"], "BOOK_LINKED");
        assert!(binding["linkId"].is_string());
        assert_eq!(binding["to"]["dimension"], "endlessdimensions:easter_library");
        // No legacy array when empty.
        assert!(value.get("legacy").is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reads_v1_flat_entries_as_legacy() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("portal-bindings.json"),
            r#"{
                "version": 1,
                "bindings": [
                    { "dimensionKey": "minecraft:overworld", "blockX": 10, "blockZ": 20,
                      "dimensionId": "endlessdimensions:easter_library" }
                ]
            }"#,
        )
        .unwrap();

        let loaded = PortalRegistryStore::new(&dir).load();
        assert!(loaded.links.is_empty());
        let key = LegacyKey {
            dimension: "minecraft:overworld".into(),
            x: 10,
            z: 20,
        };
        assert_eq!(
            loaded.legacy.get(&key).unwrap().to_dimension,
            "endlessdimensions:easter_library"
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reads_legacy_array_alongside_v2_bindings() {
        let dir = temp_dir();
        let store = PortalRegistryStore::new(&dir);
        let mut links = HashMap::new();
        links.insert(
            portal_key("minecraft:overworld"),
            link("endlessdimensions:easter_library"),
        );
        let mut legacy = HashMap::new();
        legacy.insert(
            LegacyKey {
                dimension: "minecraft:the_nether".into(),
                x: -3,
                z: 7,
            },
            LegacyLink {
                to_dimension: "endlessdimensions:easter_red".into(),
            },
        );
        store.save(&links, &legacy).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.links.len(), 1);
        assert_eq!(loaded.legacy.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn falls_back_to_plugin_data_location() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("plugin-data")).unwrap();
        std::fs::write(
            dir.join("plugin-data/portal-bindings.json"),
            r#"{ "version": 1, "entries": [
                { "from": { "dimension": "minecraft:overworld", "x": 1, "z": 2 },
                  "toDimension": "endlessdimensions:easter_sky" }
            ] }"#,
        )
        .unwrap();

        let loaded = PortalRegistryStore::new(&dir).load();
        assert_eq!(loaded.legacy.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn bad_entries_are_skipped_not_fatal() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("portal-bindings.json"),
            r#"{
                "version": 2,
                "bindings": [
                    { "from": { "dimension": "minecraft:overworld", "axis": "Q",
                                "min": {"x":0,"y":0,"z":0}, "max": {"x":0,"y":0,"z":0} },
                      "type": "DEFAULT", "linkId": "00000000-0000-0000-0000-000000000001",
                      "to": { "dimension": "minecraft:the_nether", "x":0,"y":0,"z":0,
                              "yaw":0,"pitch":0 } },
                    { "from": { "dimension": "minecraft:overworld", "axis": "Z",
                                "min": {"x":0,"y":60,"z":0}, "max": {"x":1,"y":62,"z":0} },
                      "type": "DEFAULT", "linkId": "00000000-0000-0000-0000-000000000002",
                      "to": { "dimension": "minecraft:the_nether", "x":0,"y":60,"z":0,
                              "yaw":0,"pitch":0 } }
                ]
            }"#,
        )
        .unwrap();

        let loaded = PortalRegistryStore::new(&dir).load();
        assert_eq!(loaded.links.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn mismatched_destination_portal_is_dropped() {
        let dir = temp_dir();
        let mut bad = link("endlessdimensions:easter_library");
        bad.destination.portal = Some(portal_key("minecraft:the_nether"));
        let record = BindingRecord {
            from: portal_key("minecraft:overworld"),
            link: bad,
        };
        let value = serde_json::to_value(&record).unwrap();
        let (_, parsed) = parse_binding(&value).unwrap();
        assert!(parsed.destination.portal.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("portal-bindings.json"),
            r#"{
                "version": 2,
                "futureTopLevel": true,
                "bindings": [
                    { "from": { "dimension": "minecraft:overworld", "axis": "Z",
                                "min": {"x":0,"y":60,"z":0}, "max": {"x":1,"y":62,"z":0} },
                      "type": "DEFAULT", "linkId": "00000000-0000-0000-0000-000000000002",
                      "to": { "dimension": "minecraft:the_nether", "x":0,"y":60,"z":0,
                              "yaw":0,"pitch":0, "futureField": 7 } }
                ]
            }"#,
        )
        .unwrap();

        let loaded = PortalRegistryStore::new(&dir).load();
        assert_eq!(loaded.links.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
