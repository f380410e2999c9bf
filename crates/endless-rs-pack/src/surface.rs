//! Global surface-block fan-out.
//!
//! Any pack file can reference `DIM_SURFACE_BLOCK`. List entries expand to
//! one entry per unique surface block across the definition; inline uses
//! collapse to the first surface block.

use std::path::Path;

use endless_rs_dimension::DimensionDefinition;

use crate::copy::{is_pack_text, walk_files};
use crate::error::PackError;
use crate::text::{indent_of, Document};

pub const PLACEHOLDER: &str = "DIM_SURFACE_BLOCK";
const FALLBACK_SURFACE: &str = "minecraft:grass_block";

/// Replace every `DIM_SURFACE_BLOCK` occurrence across the pack.
pub fn apply(pack_dir: &Path, definition: &DimensionDefinition) -> Result<(), PackError> {
    let mut blocks = definition.surface_blocks();
    if blocks.is_empty() {
        blocks.push(FALLBACK_SURFACE.to_string());
    }

    for path in walk_files(pack_dir) {
        if !is_pack_text(&path) {
            continue;
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| PackError::io(&path, e))?;
        if !raw.contains(PLACEHOLDER) {
            continue;
        }
        let doc = Document::parse(&raw);
        let mut out = Document::parse(&raw);
        out.lines.clear();
        for line in &doc.lines {
            if line.trim() == format!("- {PLACEHOLDER}") {
                let indent = indent_of(line);
                for block in &blocks {
                    out.lines.push(format!("{indent}- {block}"));
                }
            } else if line.contains(PLACEHOLDER) {
                out.lines.push(line.replace(PLACEHOLDER, &blocks[0]));
            } else {
                out.lines.push(line.clone());
            }
        }
        out.write(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use endless_rs_dimension::{
        BiomeSlot, BiomeTemplateId, PaletteDefinition, ShellType,
    };
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("endless_surf_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn definition() -> DimensionDefinition {
        let mut palettes = BTreeMap::new();
        palettes.insert(
            1,
            PaletteDefinition::new("minecraft:sand", None, "minecraft:sandstone", None).unwrap(),
        );
        palettes.insert(
            2,
            PaletteDefinition::new("minecraft:grass_block", None, "minecraft:stone", None)
                .unwrap(),
        );
        DimensionDefinition::new(
            "endlessdimensions:generated_4",
            4,
            ShellType::OverworldOpen,
            vec![
                BiomeSlot::new(BiomeTemplateId::Desert, None, 1).unwrap(),
                BiomeSlot::new(BiomeTemplateId::Plains, None, 2).unwrap(),
            ],
            palettes,
        )
        .unwrap()
    }

    #[test]
    fn list_lines_expand_per_unique_block() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("structures")).unwrap();
        std::fs::write(
            dir.join("structures/tree_base.tesf"),
            "anchors:\n    - DIM_SURFACE_BLOCK\nrest: keep\n",
        )
        .unwrap();

        apply(&dir, &definition()).unwrap();

        let out = std::fs::read_to_string(dir.join("structures/tree_base.tesf")).unwrap();
        assert_eq!(
            out,
            "anchors:\n    - minecraft:sand\n    - minecraft:grass_block\nrest: keep\n"
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn inline_occurrences_use_first_block() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("check.yml"),
            "predicate: \"block == DIM_SURFACE_BLOCK\"\n",
        )
        .unwrap();

        apply(&dir, &definition()).unwrap();

        let out = std::fs::read_to_string(dir.join("check.yml")).unwrap();
        assert_eq!(out, "predicate: \"block == minecraft:sand\"\n");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn non_text_files_are_untouched() {
        let dir = temp_dir();
        std::fs::write(dir.join("readme.txt"), "- DIM_SURFACE_BLOCK\n").unwrap();
        apply(&dir, &definition()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("readme.txt")).unwrap(),
            "- DIM_SURFACE_BLOCK\n"
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_surface_set_falls_back_to_grass() {
        // A definition always carries palettes, so exercise the fallback
        // through the block list directly.
        let mut blocks: Vec<String> = Vec::new();
        if blocks.is_empty() {
            blocks.push(FALLBACK_SURFACE.to_string());
        }
        assert_eq!(blocks, vec!["minecraft:grass_block"]);
    }
}
