//! Tree palette application.
//!
//! Biomes with a disabled tree palette lose their tree features. Enabled
//! biomes get per-slot copies of every referenced tree feature, with the
//! feature's structure graph duplicated wherever a structure still carries a
//! tree or surface placeholder.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::warn;

use endless_rs_dimension::{BiomeSlot, DimensionDefinition, TreePaletteProfile};

use crate::blocks::find_features_block;
use crate::copy::walk_files;
use crate::error::PackError;
use crate::text::{indent_of, substitute, Document};

const TREE_PLACEHOLDER_PREFIX: &str = "DIM_TREE_";
const SURFACE_PLACEHOLDER: &str = "DIM_SURFACE_BLOCK";

/// Rewrite tree features for every biome of the definition.
pub fn apply(pack_dir: &Path, definition: &DimensionDefinition) -> Result<(), PackError> {
    let profiles = collect_profiles(&definition.biomes)?;
    let structures = structure_index(pack_dir);

    for slot in &definition.biomes {
        let profile = &profiles[&slot.palette_slot];
        apply_slot(pack_dir, definition, slot, profile, &structures)?;
    }
    Ok(())
}

/// Tree profile per palette slot. Two enabled profiles assigned to the same
/// slot must be identical.
fn collect_profiles(
    biomes: &[BiomeSlot],
) -> Result<BTreeMap<u32, TreePaletteProfile>, PackError> {
    let mut profiles: BTreeMap<u32, TreePaletteProfile> = BTreeMap::new();
    for slot in biomes {
        let profile = TreePaletteProfile::for_biome(slot.template_id);
        match profiles.get(&slot.palette_slot) {
            Some(existing) if existing.enabled && profile.enabled && *existing != profile => {
                return Err(PackError::TreePaletteConflict {
                    slot: slot.palette_slot,
                    first: existing.kind.to_string(),
                    second: profile.kind.to_string(),
                });
            }
            Some(existing) if existing.enabled => {}
            _ => {
                profiles.insert(slot.palette_slot, profile);
            }
        }
    }
    Ok(profiles)
}

fn apply_slot(
    pack_dir: &Path,
    definition: &DimensionDefinition,
    slot: &BiomeSlot,
    profile: &TreePaletteProfile,
    structures: &HashMap<String, PathBuf>,
) -> Result<(), PackError> {
    let biome_path = pack_dir
        .join("biomes")
        .join(format!("{}.yml", slot.template_id.terra_biome_id()));
    if !biome_path.is_file() {
        return Err(PackError::MissingBiomeTemplate(biome_path));
    }
    let mut doc = Document::read(&biome_path)?;

    let Some(block) = find_features_block(&doc.lines) else {
        return Ok(());
    };
    let Some(trees) = block.categories.iter().find(|c| c.name == "trees").cloned() else {
        return Ok(());
    };

    if !profile.enabled {
        let indent = trees.indent.clone();
        doc.lines.splice(
            trees.header_idx..trees.content_end,
            vec![format!("{indent}trees: []")],
        );
        return doc.write(&biome_path);
    }

    let surface = definition
        .palettes
        .get(&slot.palette_slot)
        .map(|p| p.surface_block.clone())
        .unwrap_or_default();

    let entries: Vec<(usize, String)> = (trees.content_start..trees.content_end)
        .filter_map(|i| parse_list_entry(&doc.lines[i]).map(|id| (i, id)))
        .collect();

    for (idx, feature_id) in entries {
        match duplicate_feature(
            pack_dir,
            &feature_id,
            slot.palette_slot,
            profile,
            &surface,
            structures,
        )? {
            Some(new_id) => {
                let line = &doc.lines[idx];
                let indent = indent_of(line).to_string();
                doc.lines[idx] = if line.contains('"') {
                    format!("{indent}- \"{new_id}\"")
                } else {
                    format!("{indent}- {new_id}")
                };
            }
            None => warn!(
                "Tree feature {feature_id} has no template under {}",
                pack_dir.join("features").display()
            ),
        }
    }

    doc.write(&biome_path)
}

/// Copy one tree feature for a palette slot. Returns the new feature id, or
/// `None` when no template file exists for it.
fn duplicate_feature(
    pack_dir: &Path,
    feature_id: &str,
    slot: u32,
    profile: &TreePaletteProfile,
    surface: &str,
    structures: &HashMap<String, PathBuf>,
) -> Result<Option<String>, PackError> {
    let Some(path) = find_feature_file(pack_dir, feature_id) else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(&path).map_err(|e| PackError::io(&path, e))?;

    let renamed = duplicate_structures(&raw, slot, profile, surface, structures)?;

    let new_id = format!("{feature_id}_SLOT{slot}");
    let mut content = raw;
    for (orig, new_name) in &renamed {
        content = rewrite_quoted(&content, orig, new_name);
    }
    content = substitute_with_surface(&content, profile, surface);
    content = rewrite_id_line(&content, feature_id, &new_id);

    let new_path = sibling(&path, &new_id);
    std::fs::write(&new_path, content).map_err(|e| PackError::io(&new_path, e))?;
    Ok(Some(new_id))
}

/// Walk the structure references of a feature transitively; every visited
/// structure that still carries a tree or surface placeholder gets a
/// `_slot<n>` copy with its own references rewritten. Returns the rename map.
fn duplicate_structures(
    feature_content: &str,
    slot: u32,
    profile: &TreePaletteProfile,
    surface: &str,
    structures: &HashMap<String, PathBuf>,
) -> Result<HashMap<String, String>, PackError> {
    let mut queue: VecDeque<String> = quoted_refs(feature_content, structures).into();
    let mut visited = HashSet::new();
    let mut contents: HashMap<String, String> = HashMap::new();
    let mut renamed: HashMap<String, String> = HashMap::new();

    while let Some(name) = queue.pop_front() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let path = &structures[&name];
        let content = std::fs::read_to_string(path).map_err(|e| PackError::io(path, e))?;
        for reference in quoted_refs(&content, structures) {
            queue.push_back(reference);
        }
        if content.contains(TREE_PLACEHOLDER_PREFIX) || content.contains(SURFACE_PLACEHOLDER) {
            renamed.insert(name.clone(), format!("{name}_slot{slot}"));
        }
        contents.insert(name, content);
    }

    for (orig, new_name) in &renamed {
        let path = &structures[orig];
        let mut content = contents[orig].clone();
        for (o, n) in &renamed {
            content = rewrite_quoted(&content, o, n);
        }
        content = substitute_with_surface(&content, profile, surface);
        content = rewrite_id_line(&content, orig, new_name);
        let new_path = sibling(path, new_name);
        std::fs::write(&new_path, content).map_err(|e| PackError::io(&new_path, e))?;
    }

    Ok(renamed)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Map of known structure ids (file stems under `structures/`) to files.
fn structure_index(pack_dir: &Path) -> HashMap<String, PathBuf> {
    let mut map = HashMap::new();
    for path in walk_files(&pack_dir.join("structures")) {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            map.insert(stem.to_string(), path.clone());
        }
    }
    map
}

/// Find the file for a feature id anywhere under `features/`.
fn find_feature_file(pack_dir: &Path, feature_id: &str) -> Option<PathBuf> {
    walk_files(&pack_dir.join("features"))
        .into_iter()
        .find(|p| p.file_stem().and_then(|s| s.to_str()) == Some(feature_id))
}

/// Sibling path with a new stem and the source's extension.
fn sibling(path: &Path, new_stem: &str) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => path.with_file_name(format!("{new_stem}.{ext}")),
        None => path.with_file_name(new_stem.to_string()),
    }
}

/// `- FEATURE_ID` or `- "FEATURE_ID"` → `FEATURE_ID`.
fn parse_list_entry(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("- ")?;
    let token = rest.trim().trim_matches('"').trim_matches('\'');
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Quoted tokens in `content` that name known structures, in first-seen
/// order.
fn quoted_refs(content: &str, structures: &HashMap<String, PathBuf>) -> Vec<String> {
    let mut out = Vec::new();
    for quote in ['"', '\''] {
        let mut rest = content;
        while let Some(start) = rest.find(quote) {
            let after = &rest[start + 1..];
            match after.find(quote) {
                Some(end) => {
                    let token = &after[..end];
                    if structures.contains_key(token) && !out.iter().any(|t| t == token) {
                        out.push(token.to_string());
                    }
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
    }
    out
}

fn rewrite_quoted(content: &str, orig: &str, new_name: &str) -> String {
    content
        .replace(&format!("\"{orig}\""), &format!("\"{new_name}\""))
        .replace(&format!("'{orig}'"), &format!("'{new_name}'"))
}

fn substitute_with_surface(content: &str, profile: &TreePaletteProfile, surface: &str) -> String {
    let mut pairs = profile.placeholder_map();
    pairs.push((SURFACE_PLACEHOLDER, surface));
    substitute(content, &pairs)
}

/// Rewrite a top-level `id:` line whose value is `orig`.
fn rewrite_id_line(content: &str, orig: &str, new_name: &str) -> String {
    let mut doc = Document::parse(content);
    for line in &mut doc.lines {
        if line.starts_with("id:") {
            let value = line["id:".len()..].trim().trim_matches('"');
            if value == orig {
                *line = format!("id: {new_name}");
            }
            break;
        }
    }
    doc.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use endless_rs_dimension::{BiomeTemplateId, PaletteDefinition, ShellType};
    use std::collections::BTreeMap;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("endless_trees_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn definition(template: BiomeTemplateId, slot: u32) -> DimensionDefinition {
        let mut palettes = BTreeMap::new();
        palettes.insert(
            slot,
            PaletteDefinition::new("minecraft:podzol", None, "minecraft:stone", None).unwrap(),
        );
        DimensionDefinition::new(
            "endlessdimensions:generated_11",
            11,
            ShellType::OverworldOpen,
            vec![BiomeSlot::new(template, None, slot).unwrap()],
            palettes,
        )
        .unwrap()
    }

    fn write_fixture(dir: &Path) {
        std::fs::create_dir_all(dir.join("biomes")).unwrap();
        std::fs::create_dir_all(dir.join("features/trees")).unwrap();
        std::fs::create_dir_all(dir.join("structures/trees")).unwrap();

        std::fs::write(
            dir.join("biomes/dim_template_forest.yml"),
            "id: dim_template_forest\nfeatures:\n  trees:\n    - OAK_TREE\n  ores:\n    - IRON\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("features/trees/OAK_TREE.yml"),
            "id: OAK_TREE\ntype: FEATURE\nmaterial: DIM_TREE_LOG\nstructures:\n  - \"oak_canopy\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("structures/trees/oak_canopy.tesf"),
            "leaves = DIM_TREE_LEAVES;\nchild(\"oak_root\");\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("structures/trees/oak_root.tesf"),
            "anchor = \"minecraft:dirt\";\n",
        )
        .unwrap();
    }

    #[test]
    fn enabled_profile_duplicates_features_and_structures() {
        let dir = temp_dir();
        write_fixture(&dir);

        apply(&dir, &definition(BiomeTemplateId::Forest, 2)).unwrap();

        // Biome list now references the slot copy.
        let biome =
            std::fs::read_to_string(dir.join("biomes/dim_template_forest.yml")).unwrap();
        assert!(biome.contains("    - OAK_TREE_SLOT2"));
        assert!(!biome.contains("    - OAK_TREE\n"));
        assert!(biome.contains("  ores:\n    - IRON"));

        // Feature copy: id rewritten, log substituted, canopy ref renamed.
        let feature =
            std::fs::read_to_string(dir.join("features/trees/OAK_TREE_SLOT2.yml")).unwrap();
        assert!(feature.starts_with("id: OAK_TREE_SLOT2\n"));
        assert!(feature.contains("material: minecraft:oak_log"));
        assert!(feature.contains("- \"oak_canopy_slot2\""));

        // Structure copy: placeholder substituted; the placeholder-free
        // oak_root is shared, not copied.
        let canopy =
            std::fs::read_to_string(dir.join("structures/trees/oak_canopy_slot2.tesf")).unwrap();
        assert!(canopy.contains("leaves = minecraft:oak_leaves;"));
        assert!(canopy.contains("child(\"oak_root\");"));
        assert!(!dir.join("structures/trees/oak_root_slot2.tesf").exists());

        // Originals stay in place for other slots to copy from.
        assert!(dir.join("features/trees/OAK_TREE.yml").exists());
        assert!(dir.join("structures/trees/oak_canopy.tesf").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn disabled_profile_empties_tree_list() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("biomes")).unwrap();
        std::fs::write(
            dir.join("biomes/dim_template_desert.yml"),
            "id: dim_template_desert\nfeatures:\n  trees:\n    - CACTUS_FAKE_TREE\n  ores:\n    - GOLD\n",
        )
        .unwrap();

        apply(&dir, &definition(BiomeTemplateId::Desert, 1)).unwrap();

        let biome =
            std::fs::read_to_string(dir.join("biomes/dim_template_desert.yml")).unwrap();
        assert!(biome.contains("  trees: []\n"));
        assert!(!biome.contains("CACTUS_FAKE_TREE"));
        assert!(biome.contains("  ores:\n    - GOLD"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn surface_placeholder_substituted_in_copies() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("biomes")).unwrap();
        std::fs::create_dir_all(dir.join("features/trees")).unwrap();
        std::fs::write(
            dir.join("biomes/dim_template_forest.yml"),
            "id: dim_template_forest\nfeatures:\n  trees:\n    - ROOTED_TREE\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("features/trees/ROOTED_TREE.yml"),
            "id: ROOTED_TREE\nbase: DIM_SURFACE_BLOCK\n",
        )
        .unwrap();

        apply(&dir, &definition(BiomeTemplateId::Forest, 4)).unwrap();

        let feature =
            std::fs::read_to_string(dir.join("features/trees/ROOTED_TREE_SLOT4.yml")).unwrap();
        assert!(feature.contains("base: minecraft:podzol"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn conflicting_profiles_for_a_slot_are_rejected() {
        let slots = vec![
            BiomeSlot::new(BiomeTemplateId::Forest, None, 1).unwrap(),
            BiomeSlot::new(BiomeTemplateId::Jungle, None, 1).unwrap(),
        ];
        let result = collect_profiles(&slots);
        assert!(matches!(
            result,
            Err(PackError::TreePaletteConflict { slot: 1, .. })
        ));
    }

    #[test]
    fn disabled_and_enabled_profiles_can_share_a_slot() {
        // A treeless biome does not constrain the slot's tree palette.
        let slots = vec![
            BiomeSlot::new(BiomeTemplateId::Desert, None, 1).unwrap(),
            BiomeSlot::new(BiomeTemplateId::Forest, None, 1).unwrap(),
        ];
        let profiles = collect_profiles(&slots).unwrap();
        assert!(profiles[&1].enabled);
        assert_eq!(profiles[&1].kind, "oak");
    }

    #[test]
    fn missing_feature_template_keeps_original_entry() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("biomes")).unwrap();
        std::fs::write(
            dir.join("biomes/dim_template_forest.yml"),
            "id: dim_template_forest\nfeatures:\n  trees:\n    - GHOST_TREE\n",
        )
        .unwrap();

        apply(&dir, &definition(BiomeTemplateId::Forest, 1)).unwrap();

        let biome =
            std::fs::read_to_string(dir.join("biomes/dim_template_forest.yml")).unwrap();
        assert!(biome.contains("    - GHOST_TREE"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn list_entry_parsing() {
        assert_eq!(parse_list_entry("    - OAK_TREE"), Some("OAK_TREE".into()));
        assert_eq!(
            parse_list_entry("  - \"BIG_TREE\""),
            Some("BIG_TREE".into())
        );
        assert_eq!(parse_list_entry("  ores:"), None);
        assert_eq!(parse_list_entry(""), None);
    }
}
