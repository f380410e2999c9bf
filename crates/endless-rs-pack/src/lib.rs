//! Pack materialization: turns the template tree into a self-contained,
//! per-dimension generator pack.
//!
//! Packs are content-addressed by dimension id. Materialization into an
//! existing directory is a no-op, so a pack is only ever written once and
//! re-requests observe the finished tree.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use endless_rs_dimension::DimensionDefinition;

pub mod biomes;
mod blocks;
pub mod copy;
pub mod error;
pub mod features;
pub mod loader;
pub mod pack_yml;
pub mod palettes;
pub mod surface;
pub mod text;
pub mod trees;

pub use error::PackError;
pub use loader::{load_pack, ConfigPack};

/// Builds generator packs from a read-only template tree.
pub struct PackMaterializer {
    templates_root: PathBuf,
    packs_root: PathBuf,
}

impl PackMaterializer {
    pub fn new(templates_root: impl Into<PathBuf>, packs_root: impl Into<PathBuf>) -> Self {
        Self {
            templates_root: templates_root.into(),
            packs_root: packs_root.into(),
        }
    }

    /// Directory a definition's pack lives in.
    pub fn pack_dir(&self, dimension_id: &str) -> PathBuf {
        self.packs_root.join(pack_yml::safe_pack_id(dimension_id))
    }

    /// Materialize the pack for `definition`, returning its directory. An
    /// already-existing pack directory is returned untouched.
    pub fn create_pack(&self, definition: &DimensionDefinition) -> Result<PathBuf, PackError> {
        let dir = self.pack_dir(&definition.dimension_id);
        if dir.is_dir() {
            debug!(
                "Pack for {} already materialized at {}",
                definition.dimension_id,
                dir.display()
            );
            return Ok(dir);
        }

        let copied = copy::copy_tree(&self.templates_root, &dir)?;
        pack_yml::patch(&dir, definition)?;
        apply_shell_overrides(&dir, definition)?;
        palettes::write(&dir, definition)?;
        biomes::apply(&dir, definition)?;
        features::apply(&dir)?;
        trees::apply(&dir, definition)?;
        surface::apply(&dir, definition)?;

        info!(
            "Materialized pack for {} ({copied} template file(s)) at {}",
            definition.dimension_id,
            dir.display()
        );
        Ok(dir)
    }
}

/// Copy the shell's `meta.yml` and `options.yml` over the pack root, when the
/// shell provides them.
fn apply_shell_overrides(
    pack_dir: &Path,
    definition: &DimensionDefinition,
) -> Result<(), PackError> {
    let shell_root = pack_dir.join(definition.shell_type.template_root());
    for name in ["meta.yml", "options.yml"] {
        let src = shell_root.join(name);
        if src.is_file() {
            let dst = pack_dir.join(name);
            std::fs::copy(&src, &dst).map_err(|e| PackError::io(&src, e))?;
        }
    }
    Ok(())
}
