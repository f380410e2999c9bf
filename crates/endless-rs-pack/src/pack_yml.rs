//! `pack.yml` patching.

use std::path::Path;

use endless_rs_dimension::DimensionDefinition;

use crate::error::PackError;
use crate::text::Document;

/// Pack id: the dimension id with `:` replaced, since the generator treats
/// pack ids as path components.
pub fn safe_pack_id(dimension_id: &str) -> String {
    dimension_id.replace(':', "_")
}

/// Rewrite the four generator keys in the top-level `pack.yml`. The first
/// top-level occurrence of each key is replaced; absent keys are appended.
pub fn patch(pack_dir: &Path, definition: &DimensionDefinition) -> Result<(), PackError> {
    let path = pack_dir.join("pack.yml");
    if !path.is_file() {
        return Err(PackError::MissingPackYml(pack_dir.to_path_buf()));
    }
    let mut doc = Document::read(&path)?;

    let shell = definition.shell_type;
    let entries = [
        (
            "id:",
            format!("id: {}", safe_pack_id(&definition.dimension_id)),
        ),
        (
            "biomes:",
            format!("biomes: ${}/biomes.yml:biomes", shell.template_root()),
        ),
        ("vanilla:", format!("vanilla: {}", shell.vanilla_dimension())),
        (
            "vanilla-generation:",
            format!("vanilla-generation: {}", shell.vanilla_generation()),
        ),
    ];

    for (prefix, replacement) in entries {
        match doc.lines.iter().position(|l| l.starts_with(prefix)) {
            Some(idx) => doc.lines[idx] = replacement,
            None => doc.lines.push(replacement),
        }
    }

    doc.write(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use endless_rs_dimension::{BiomeSlot, BiomeTemplateId, PaletteDefinition, ShellType};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("endless_packyml_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn definition(shell: ShellType) -> DimensionDefinition {
        let mut palettes = BTreeMap::new();
        palettes.insert(
            1,
            PaletteDefinition::new("minecraft:grass_block", None, "minecraft:stone", None)
                .unwrap(),
        );
        let template = match shell {
            ShellType::NetherCavern => BiomeTemplateId::NetherWastes,
            ShellType::EndIslands => BiomeTemplateId::EndHighlands,
            _ => BiomeTemplateId::Plains,
        };
        DimensionDefinition::new(
            "endlessdimensions:generated_42",
            42,
            shell,
            vec![BiomeSlot::new(template, None, 1).unwrap()],
            palettes,
        )
        .unwrap()
    }

    #[test]
    fn replaces_first_occurrence_of_each_key() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("pack.yml"),
            "id: template\nversion: 1\nbiomes: $old/biomes.yml:biomes\nvanilla: minecraft:overworld\nvanilla-generation: minecraft:overworld\n",
        )
        .unwrap();

        patch(&dir, &definition(ShellType::NetherCavern)).unwrap();

        let out = std::fs::read_to_string(dir.join("pack.yml")).unwrap();
        assert_eq!(
            out,
            "id: endlessdimensions_generated_42\nversion: 1\nbiomes: $shells/nether_cavern/biomes.yml:biomes\nvanilla: minecraft:the_nether\nvanilla-generation: minecraft:the_nether\n"
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn appends_missing_keys() {
        let dir = temp_dir();
        std::fs::write(dir.join("pack.yml"), "id: template\n").unwrap();

        patch(&dir, &definition(ShellType::Superflat)).unwrap();

        let out = std::fs::read_to_string(dir.join("pack.yml")).unwrap();
        assert!(out.starts_with("id: endlessdimensions_generated_42\n"));
        assert!(out.contains("biomes: $shells/superflat/biomes.yml:biomes"));
        assert!(out.contains("vanilla: minecraft:overworld"));
        assert!(out.contains("vanilla-generation: minecraft:flat"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn preserves_crlf() {
        let dir = temp_dir();
        std::fs::write(dir.join("pack.yml"), "id: template\r\nauthor: x\r\n").unwrap();

        patch(&dir, &definition(ShellType::OverworldOpen)).unwrap();

        let out = std::fs::read_to_string(dir.join("pack.yml")).unwrap();
        assert!(out.contains("id: endlessdimensions_generated_42\r\n"));
        assert!(out.contains("author: x\r\n"));
        assert!(!out.replace("\r\n", "").contains('\r'));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn indented_keys_are_not_treated_as_top_level() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("pack.yml"),
            "meta:\n  id: nested\nid: template\n",
        )
        .unwrap();

        patch(&dir, &definition(ShellType::OverworldOpen)).unwrap();

        let out = std::fs::read_to_string(dir.join("pack.yml")).unwrap();
        assert!(out.contains("  id: nested\n"));
        assert!(out.contains("\nid: endlessdimensions_generated_42\n"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_pack_yml_is_an_error() {
        let dir = temp_dir();
        let result = patch(&dir, &definition(ShellType::OverworldOpen));
        assert!(matches!(result, Err(PackError::MissingPackYml(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
