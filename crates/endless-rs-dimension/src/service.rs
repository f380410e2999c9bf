//! Composes the definition registry with key resolution.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use endless_rs_keys::hash::seed64;
use endless_rs_keys::{resolve, CustomKeyRegistry, ResolvedKey};

use crate::error::DefinitionError;
use crate::model::{BiomeSlot, DimensionDefinition, PaletteDefinition, ShellType};
use crate::registry::DimensionDefinitionRegistry;

/// Resolves texts to definitions, creating and persisting them on first use.
pub struct DimensionDefinitionService {
    registry: Arc<DimensionDefinitionRegistry>,
    customs: Arc<Mutex<CustomKeyRegistry>>,
}

impl DimensionDefinitionService {
    pub fn new(
        registry: Arc<DimensionDefinitionRegistry>,
        customs: Arc<Mutex<CustomKeyRegistry>>,
    ) -> Self {
        Self { registry, customs }
    }

    pub fn registry(&self) -> &Arc<DimensionDefinitionRegistry> {
        &self.registry
    }

    /// Classify a text without creating anything.
    pub fn resolve(&self, text: &str) -> ResolvedKey {
        resolve(text, &self.customs.lock().unwrap())
    }

    /// Stored definition for an id, if registered.
    pub fn get(&self, dimension_id: &str) -> Option<Arc<DimensionDefinition>> {
        self.registry.get(dimension_id)
    }

    /// Resolve `text`; return the stored definition if its id exists,
    /// otherwise register a new one from the given inputs.
    ///
    /// When the id exists the inputs are ignored: the first registration is
    /// authoritative, which keeps a dimension stable no matter what later
    /// callers pass.
    pub fn resolve_or_create(
        &self,
        text: &str,
        shell: ShellType,
        biomes: Vec<BiomeSlot>,
        palettes: BTreeMap<u32, PaletteDefinition>,
    ) -> Result<Arc<DimensionDefinition>, DefinitionError> {
        let resolved = self.resolve(text);
        if let Some(existing) = self.registry.get(&resolved.dimension_id) {
            return Ok(existing);
        }
        let definition = DimensionDefinition::new(
            &resolved.dimension_id,
            resolved.seed,
            shell,
            biomes,
            palettes,
        )?;
        info!(
            "Registering new {:?} dimension {}",
            resolved.kind, resolved.dimension_id
        );
        self.registry.register(definition)
    }

    /// Mint a fresh custom key, register its mapping and definition, and
    /// return the key for the caller to hand to the player.
    pub fn register_custom_definition(
        &self,
        shell: ShellType,
        biomes: Vec<BiomeSlot>,
        palettes: BTreeMap<u32, PaletteDefinition>,
    ) -> Result<(String, Arc<DimensionDefinition>), DefinitionError> {
        let mut customs = self.customs.lock().unwrap();
        let key = customs.generate_key();
        let dimension_id = CustomKeyRegistry::dimension_id_for(&key);
        let seed = seed64(&endless_rs_keys::hash::normalize(&key));

        let definition = DimensionDefinition::new(&dimension_id, seed, shell, biomes, palettes)?;
        customs.register(&key, &dimension_id)?;
        let stored = self.registry.register(definition)?;
        info!("Minted custom dimension {dimension_id} for key {key}");
        Ok((key, stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BiomeTemplateId;
    use endless_rs_keys::KeyKind;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("endless_defsvc_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn service(dir: &PathBuf) -> DimensionDefinitionService {
        DimensionDefinitionService::new(
            Arc::new(DimensionDefinitionRegistry::load(dir)),
            Arc::new(Mutex::new(CustomKeyRegistry::load(dir))),
        )
    }

    fn inputs() -> (Vec<BiomeSlot>, BTreeMap<u32, PaletteDefinition>) {
        let mut palettes = BTreeMap::new();
        palettes.insert(
            1,
            PaletteDefinition::new("minecraft:grass_block", None, "minecraft:stone", None)
                .unwrap(),
        );
        (
            vec![BiomeSlot::new(BiomeTemplateId::Plains, None, 1).unwrap()],
            palettes,
        )
    }

    fn sand_inputs() -> (Vec<BiomeSlot>, BTreeMap<u32, PaletteDefinition>) {
        let mut palettes = BTreeMap::new();
        palettes.insert(
            1,
            PaletteDefinition::new("minecraft:sand", None, "minecraft:sandstone", None).unwrap(),
        );
        (
            vec![BiomeSlot::new(BiomeTemplateId::Desert, None, 1).unwrap()],
            palettes,
        )
    }

    #[test]
    fn resolve_or_create_registers_once() {
        let dir = temp_dir();
        let svc = service(&dir);
        let (biomes, palettes) = inputs();
        let def = svc
            .resolve_or_create("island", ShellType::OverworldOpen, biomes, palettes)
            .unwrap();
        assert_eq!(def.dimension_id, "endlessdimensions:easter_island");

        // Existing id wins; a different palette for the same text is ignored.
        let (biomes, palettes) = sand_inputs();
        let again = svc
            .resolve_or_create("Island", ShellType::Superflat, biomes, palettes)
            .unwrap();
        assert!(Arc::ptr_eq(&def, &again));
        assert_eq!(again.shell_type, ShellType::OverworldOpen);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn custom_mint_registers_mapping_and_definition() {
        let dir = temp_dir();
        let svc = service(&dir);
        let (biomes, palettes) = inputs();
        let (key, def) = svc
            .register_custom_definition(ShellType::OverworldOpen, biomes, palettes)
            .unwrap();

        assert!(key.starts_with("ED-"));
        assert!(def.dimension_id.starts_with("endlessdimensions:custom_"));

        let resolved = svc.resolve(&key);
        assert_eq!(resolved.kind, KeyKind::Custom);
        assert_eq!(resolved.dimension_id, def.dimension_id);
        assert_eq!(resolved.seed, def.seed);

        // Both stores survive a restart.
        let reloaded = service(&dir);
        let resolved = reloaded.resolve(&key);
        assert_eq!(resolved.kind, KeyKind::Custom);
        assert!(reloaded.get(&def.dimension_id).is_some());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_text_resolves_generated() {
        let dir = temp_dir();
        let svc = service(&dir);
        let resolved = svc.resolve("a brand new world");
        assert_eq!(resolved.kind, KeyKind::Generated);
        assert!(svc.get(&resolved.dimension_id).is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
