//! Handoff of a materialized pack to the terrain generator.

use std::path::{Path, PathBuf};

use crate::error::PackError;
use crate::text::Document;

/// A validated pack directory, ready for the generator library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPack {
    pub id: String,
    pub root: PathBuf,
}

/// Validate a pack directory and read its id from `pack.yml`.
pub fn load_pack(dir: &Path) -> Result<ConfigPack, PackError> {
    let pack_yml = dir.join("pack.yml");
    if !pack_yml.is_file() {
        return Err(PackError::MissingPackYml(dir.to_path_buf()));
    }
    let doc = Document::read(&pack_yml)?;
    let id = doc
        .lines
        .iter()
        .find_map(|l| l.strip_prefix("id:"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PackError::MissingPackId(dir.to_path_buf()))?;
    Ok(ConfigPack {
        id,
        root: dir.to_path_buf(),
    })
}
