//! Biome template overrides: overlay feature merging and palette-slot
//! placeholder substitution.

use std::path::Path;

use endless_rs_dimension::{BiomeSlot, DimensionDefinition};

use crate::blocks::{find_features_block, reindent};
use crate::error::PackError;
use crate::text::{substitute, Document};

/// Apply the per-slot biome overrides for every biome of the definition.
pub fn apply(pack_dir: &Path, definition: &DimensionDefinition) -> Result<(), PackError> {
    for slot in &definition.biomes {
        apply_slot(pack_dir, slot)?;
    }
    Ok(())
}

fn apply_slot(pack_dir: &Path, slot: &BiomeSlot) -> Result<(), PackError> {
    let base_path = pack_dir
        .join("biomes")
        .join(format!("{}.yml", slot.template_id.terra_biome_id()));
    if !base_path.is_file() {
        return Err(PackError::MissingBiomeTemplate(base_path));
    }
    let mut doc = Document::read(&base_path)?;

    if let Some(overlay) = slot.overlay_id {
        let overlay_path = pack_dir.join("biome_overlays").join(format!(
            "{}.yml",
            overlay.terra_overlay_id().unwrap_or("unknown")
        ));
        if !overlay_path.is_file() {
            return Err(PackError::MissingOverlayTemplate(overlay_path));
        }
        let overlay_doc = Document::read(&overlay_path)?;
        merge_overlay_features(&mut doc, &overlay_doc);
    }

    let pal = format!("DIM_PAL_{}", slot.palette_slot);
    let pal_stone = format!("DIM_PAL_{}_STONE", slot.palette_slot);
    for line in &mut doc.lines {
        *line = substitute(
            line,
            &[("DIM_PAL_SLOT_STONE", &pal_stone), ("DIM_PAL_SLOT", &pal)],
        );
    }

    doc.write(&base_path)
}

/// Merge the overlay's `features:` categories into the base document. For
/// each category the overlay's list entries are appended under the base's
/// category of the same name, which is created when absent; a base without a
/// `features:` block gets the overlay's block appended at the bottom.
pub fn merge_overlay_features(base: &mut Document, overlay: &Document) {
    let overlay_block = match find_features_block(&overlay.lines) {
        Some(block) => block,
        None => return,
    };

    if find_features_block(&base.lines).is_none() {
        for line in &overlay.lines[overlay_block.header_idx..overlay_block.end] {
            base.lines.push(line.clone());
        }
        return;
    }

    // Categories are merged one at a time, re-locating the base block after
    // every insertion since line indices shift.
    for overlay_cat in &overlay_block.categories {
        let base_block = match find_features_block(&base.lines) {
            Some(block) => block,
            None => return,
        };
        let overlay_content: Vec<String> = overlay.lines
            [overlay_cat.content_start..overlay_cat.content_end]
            .to_vec();

        match base_block
            .categories
            .iter()
            .find(|c| c.name == overlay_cat.name)
        {
            Some(base_cat) => {
                let insert_at = base_cat.content_end;
                let reindented: Vec<String> = overlay_content
                    .iter()
                    .map(|l| reindent(l, &overlay_cat.indent, &base_cat.indent))
                    .collect();
                base.lines.splice(insert_at..insert_at, reindented);
            }
            None => {
                let indent = base_block
                    .categories
                    .first()
                    .map(|c| c.indent.clone())
                    .unwrap_or_else(|| overlay_cat.indent.clone());
                let mut new_lines =
                    vec![format!("{indent}{}:", overlay_cat.name)];
                new_lines.extend(
                    overlay_content
                        .iter()
                        .map(|l| reindent(l, &overlay_cat.indent, &indent)),
                );
                let insert_at = base_block.end;
                base.lines.splice(insert_at..insert_at, new_lines);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use endless_rs_dimension::{BiomeTemplateId, PaletteDefinition, ShellType};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("endless_biome_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn merge_appends_to_existing_category() {
        let mut base = Document::parse(
            "id: biome\nfeatures:\n  trees:\n    - OAK\n  ores:\n    - IRON\nslant: 1\n",
        );
        let overlay =
            Document::parse("id: overlay\nfeatures:\n  trees:\n    - SHIP_TREE\n");
        merge_overlay_features(&mut base, &overlay);
        assert_eq!(
            base.render(),
            "id: biome\nfeatures:\n  trees:\n    - OAK\n    - SHIP_TREE\n  ores:\n    - IRON\nslant: 1\n"
        );
    }

    #[test]
    fn merge_creates_missing_category() {
        let mut base = Document::parse("id: biome\nfeatures:\n  trees:\n    - OAK\n");
        let overlay = Document::parse("features:\n  shapes:\n    - CUBE\n    - SPHERE\n");
        merge_overlay_features(&mut base, &overlay);
        assert_eq!(
            base.render(),
            "id: biome\nfeatures:\n  trees:\n    - OAK\n  shapes:\n    - CUBE\n    - SPHERE\n"
        );
    }

    #[test]
    fn merge_appends_block_when_base_has_none() {
        let mut base = Document::parse("id: biome\npalette: x\n");
        let overlay = Document::parse("features:\n  shapes:\n    - CUBE\n");
        merge_overlay_features(&mut base, &overlay);
        assert_eq!(
            base.render(),
            "id: biome\npalette: x\nfeatures:\n  shapes:\n    - CUBE\n"
        );
    }

    #[test]
    fn merge_reindents_overlay_entries() {
        let mut base = Document::parse("features:\n    trees:\n        - OAK\n");
        let overlay = Document::parse("features:\n  trees:\n    - SHIP\n");
        merge_overlay_features(&mut base, &overlay);
        // The overlay entry is shifted onto the base category's indent; its
        // own relative depth (two spaces past the header) rides along.
        assert_eq!(
            base.render(),
            "features:\n    trees:\n        - OAK\n      - SHIP\n"
        );
    }

    fn definition(overlay: Option<BiomeTemplateId>) -> DimensionDefinition {
        let mut palettes = BTreeMap::new();
        palettes.insert(
            3,
            PaletteDefinition::new("minecraft:grass_block", None, "minecraft:stone", None)
                .unwrap(),
        );
        DimensionDefinition::new(
            "endlessdimensions:generated_5",
            5,
            ShellType::OverworldOpen,
            vec![BiomeSlot::new(BiomeTemplateId::Plains, overlay, 3).unwrap()],
            palettes,
        )
        .unwrap()
    }

    #[test]
    fn slot_placeholders_substituted_longest_first() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("biomes")).unwrap();
        std::fs::write(
            dir.join("biomes/dim_template_plains.yml"),
            "id: dim_template_plains\npalette:\n  - DIM_PAL_SLOT: 319\n  - DIM_PAL_SLOT_STONE: 60\n",
        )
        .unwrap();

        apply(&dir, &definition(None)).unwrap();

        let out = std::fs::read_to_string(dir.join("biomes/dim_template_plains.yml")).unwrap();
        assert!(out.contains("- DIM_PAL_3: 319"));
        assert!(out.contains("- DIM_PAL_3_STONE: 60"));
        assert!(!out.contains("DIM_PAL_SLOT"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn overlay_merge_runs_before_substitution() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("biomes")).unwrap();
        std::fs::create_dir_all(dir.join("biome_overlays")).unwrap();
        std::fs::write(
            dir.join("biomes/dim_template_plains.yml"),
            "id: dim_template_plains\nfeatures:\n  trees:\n    - OAK\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("biome_overlays/dim_overlay_shapes.yml"),
            "id: dim_overlay_shapes\nfeatures:\n  shapes:\n    - SHAPES_SCATTER\n  trees:\n    - DIM_PAL_SLOT_MARKER\n",
        )
        .unwrap();

        apply(&dir, &definition(Some(BiomeTemplateId::SpecialShapes))).unwrap();

        let out = std::fs::read_to_string(dir.join("biomes/dim_template_plains.yml")).unwrap();
        assert!(out.contains("  shapes:\n    - SHAPES_SCATTER"));
        // The merged overlay line went through placeholder substitution too.
        assert!(out.contains("- DIM_PAL_3_MARKER"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_base_template_is_an_error() {
        let dir = temp_dir();
        let result = apply(&dir, &definition(None));
        assert!(matches!(result, Err(PackError::MissingBiomeTemplate(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
