//! Shells, biome templates, palettes, and the dimension definition itself.
//!
//! Shells and biome templates are closed worlds: fixed enums with a small
//! method surface, never extended at runtime.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;

// ─── Shells ─────────────────────────────────────────────────────────────────

/// Coarse terrain archetype. Picks the template root, the vanilla dimension
/// mapping, and the biome pool a generated definition draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShellType {
    OverworldOpen,
    NetherCavern,
    EndIslands,
    Superflat,
}

impl ShellType {
    pub const ALL: [ShellType; 4] = [
        ShellType::OverworldOpen,
        ShellType::NetherCavern,
        ShellType::EndIslands,
        ShellType::Superflat,
    ];

    /// Stable lowercase id.
    pub fn id(self) -> &'static str {
        match self {
            ShellType::OverworldOpen => "overworld_open",
            ShellType::NetherCavern => "nether_cavern",
            ShellType::EndIslands => "end_islands",
            ShellType::Superflat => "superflat",
        }
    }

    /// Engine dimension-type identifier for instances of this shell.
    pub fn vanilla_dimension(self) -> &'static str {
        match self {
            ShellType::OverworldOpen | ShellType::Superflat => "minecraft:overworld",
            ShellType::NetherCavern => "minecraft:the_nether",
            ShellType::EndIslands => "minecraft:the_end",
        }
    }

    /// Vanilla generation profile written into `pack.yml`.
    pub fn vanilla_generation(self) -> &'static str {
        match self {
            ShellType::OverworldOpen => "minecraft:overworld",
            ShellType::NetherCavern => "minecraft:the_nether",
            ShellType::EndIslands => "minecraft:the_end",
            ShellType::Superflat => "minecraft:flat",
        }
    }

    /// Root of this shell's override files inside the template tree.
    pub fn template_root(self) -> &'static str {
        match self {
            ShellType::OverworldOpen => "shells/overworld_open",
            ShellType::NetherCavern => "shells/nether_cavern",
            ShellType::EndIslands => "shells/end_islands",
            ShellType::Superflat => "shells/superflat",
        }
    }

    /// Ordered pool of templates this shell draws from, overlays included.
    pub fn biome_pool(self) -> &'static [BiomeTemplateId] {
        use BiomeTemplateId::*;
        match self {
            ShellType::OverworldOpen => &[
                Plains, Forest, Jungle, Desert, Badlands, Ocean, IceSpikes, Mushroom,
                Featureless, SpecialBetween, SpecialShapes,
            ],
            ShellType::NetherCavern => &[
                NetherWastes, CrimsonForest, WarpedForest, BasaltDeltas, SpecialShapes,
            ],
            ShellType::EndIslands => &[EndHighlands, EndBarrens, SpecialBetween],
            ShellType::Superflat => &[Featureless, Plains, Mushroom, SpecialShapes],
        }
    }

    /// The pool restricted to base biomes.
    pub fn base_biome_pool(self) -> Vec<BiomeTemplateId> {
        self.biome_pool()
            .iter()
            .copied()
            .filter(|t| !t.is_overlay())
            .collect()
    }

    /// The pool restricted to overlays.
    pub fn overlay_pool(self) -> Vec<BiomeTemplateId> {
        self.biome_pool()
            .iter()
            .copied()
            .filter(|t| t.is_overlay())
            .collect()
    }
}

// ─── Biome templates ────────────────────────────────────────────────────────

/// A biome template document. Base templates are placed directly; overlays
/// augment a base biome with extra features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiomeTemplateId {
    Plains,
    Forest,
    Jungle,
    Desert,
    Badlands,
    Ocean,
    IceSpikes,
    Mushroom,
    Featureless,
    NetherWastes,
    CrimsonForest,
    WarpedForest,
    BasaltDeltas,
    EndHighlands,
    EndBarrens,
    SpecialBetween,
    SpecialShapes,
}

impl BiomeTemplateId {
    /// True exactly for the overlay variants.
    pub fn is_overlay(self) -> bool {
        matches!(
            self,
            BiomeTemplateId::SpecialBetween | BiomeTemplateId::SpecialShapes
        )
    }

    /// Stem of this template's document inside the pack (`biomes/` for bases,
    /// `biome_overlays/` for overlays).
    pub fn terra_biome_id(self) -> &'static str {
        match self {
            BiomeTemplateId::Plains => "dim_template_plains",
            BiomeTemplateId::Forest => "dim_template_forest",
            BiomeTemplateId::Jungle => "dim_template_jungle",
            BiomeTemplateId::Desert => "dim_template_desert",
            BiomeTemplateId::Badlands => "dim_template_badlands",
            BiomeTemplateId::Ocean => "dim_template_ocean",
            BiomeTemplateId::IceSpikes => "dim_template_ice_spikes",
            BiomeTemplateId::Mushroom => "dim_template_mushroom",
            BiomeTemplateId::Featureless => "dim_template_featureless",
            BiomeTemplateId::NetherWastes => "dim_template_nether_wastes",
            BiomeTemplateId::CrimsonForest => "dim_template_crimson_forest",
            BiomeTemplateId::WarpedForest => "dim_template_warped_forest",
            BiomeTemplateId::BasaltDeltas => "dim_template_basalt_deltas",
            BiomeTemplateId::EndHighlands => "dim_template_end_highlands",
            BiomeTemplateId::EndBarrens => "dim_template_end_barrens",
            BiomeTemplateId::SpecialBetween => "dim_overlay_between",
            BiomeTemplateId::SpecialShapes => "dim_overlay_shapes",
        }
    }

    /// Overlay document stem, for overlay variants only.
    pub fn terra_overlay_id(self) -> Option<&'static str> {
        match self {
            BiomeTemplateId::SpecialBetween => Some("dim_overlay_between"),
            BiomeTemplateId::SpecialShapes => Some("dim_overlay_shapes"),
            _ => None,
        }
    }
}

// ─── Palettes ───────────────────────────────────────────────────────────────

/// Blocks a palette slot resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteDefinition {
    pub surface_block: String,
    pub subsurface_block: String,
    pub stone_block: String,
    #[serde(default)]
    pub liquid_block: Option<String>,
}

impl PaletteDefinition {
    /// Build a palette. Subsurface defaults to the surface block; an empty
    /// liquid collapses to `None`.
    pub fn new(
        surface_block: &str,
        subsurface_block: Option<&str>,
        stone_block: &str,
        liquid_block: Option<&str>,
    ) -> Result<Self, DefinitionError> {
        if surface_block.is_empty() {
            return Err(DefinitionError::EmptySurfaceBlock);
        }
        if stone_block.is_empty() {
            return Err(DefinitionError::EmptyStoneBlock);
        }
        let subsurface = match subsurface_block {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => surface_block.to_string(),
        };
        let liquid = match liquid_block {
            Some(l) if !l.is_empty() => Some(l.to_string()),
            _ => None,
        };
        Ok(Self {
            surface_block: surface_block.to_string(),
            subsurface_block: subsurface,
            stone_block: stone_block.to_string(),
            liquid_block: liquid,
        })
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.surface_block.is_empty() {
            return Err(DefinitionError::EmptySurfaceBlock);
        }
        if self.stone_block.is_empty() {
            return Err(DefinitionError::EmptyStoneBlock);
        }
        Ok(())
    }
}

// ─── Biome slots ────────────────────────────────────────────────────────────

/// One biome of a definition: a base template, an optional overlay, and the
/// palette slot parameterizing its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiomeSlot {
    pub template_id: BiomeTemplateId,
    #[serde(default)]
    pub overlay_id: Option<BiomeTemplateId>,
    pub palette_slot: u32,
}

impl BiomeSlot {
    pub fn new(
        template_id: BiomeTemplateId,
        overlay_id: Option<BiomeTemplateId>,
        palette_slot: u32,
    ) -> Result<Self, DefinitionError> {
        let slot = Self {
            template_id,
            overlay_id,
            palette_slot,
        };
        slot.validate()?;
        Ok(slot)
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.template_id.is_overlay() {
            return Err(DefinitionError::NotABaseTemplate(self.template_id));
        }
        if let Some(overlay) = self.overlay_id {
            if !overlay.is_overlay() {
                return Err(DefinitionError::NotAnOverlay(overlay));
            }
        }
        if self.palette_slot == 0 {
            return Err(DefinitionError::InvalidPaletteSlot);
        }
        Ok(())
    }
}

// ─── Tree palettes ──────────────────────────────────────────────────────────

/// The material set a biome's tree features are rewritten with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePaletteProfile {
    pub kind: &'static str,
    pub enabled: bool,
    pub log: &'static str,
    pub log_x: &'static str,
    pub log_y: &'static str,
    pub log_z: &'static str,
    pub wood: &'static str,
    pub wood_x: &'static str,
    pub wood_z: &'static str,
    pub leaves: &'static str,
}

impl TreePaletteProfile {
    pub fn disabled() -> Self {
        Self {
            kind: "none",
            enabled: false,
            log: "",
            log_x: "",
            log_y: "",
            log_z: "",
            wood: "",
            wood_x: "",
            wood_z: "",
            leaves: "",
        }
    }

    /// Placeholder → material pairs, longest placeholder first so that
    /// `DIM_TREE_LOG_X` is never clipped by `DIM_TREE_LOG`. Empty when the
    /// profile is disabled: tree features are removed, not remapped.
    pub fn placeholder_map(&self) -> Vec<(&'static str, &'static str)> {
        if !self.enabled {
            return Vec::new();
        }
        vec![
            ("DIM_TREE_WOOD_X", self.wood_x),
            ("DIM_TREE_WOOD_Z", self.wood_z),
            ("DIM_TREE_LEAVES", self.leaves),
            ("DIM_TREE_LOG_X", self.log_x),
            ("DIM_TREE_LOG_Y", self.log_y),
            ("DIM_TREE_LOG_Z", self.log_z),
            ("DIM_TREE_WOOD", self.wood),
            ("DIM_TREE_LOG", self.log),
        ]
    }

    /// Default profile for a base biome template.
    pub fn for_biome(base: BiomeTemplateId) -> Self {
        match base {
            BiomeTemplateId::Plains | BiomeTemplateId::Forest => Self::wooden(
                "oak",
                "minecraft:oak_log",
                "minecraft:oak_wood",
                "minecraft:oak_leaves",
            ),
            BiomeTemplateId::Jungle => Self::wooden(
                "jungle",
                "minecraft:jungle_log",
                "minecraft:jungle_wood",
                "minecraft:jungle_leaves",
            ),
            BiomeTemplateId::IceSpikes => Self::wooden(
                "spruce",
                "minecraft:spruce_log",
                "minecraft:spruce_wood",
                "minecraft:spruce_leaves",
            ),
            BiomeTemplateId::Mushroom => Self::wooden(
                "mushroom",
                "minecraft:mushroom_stem",
                "minecraft:mushroom_stem",
                "minecraft:red_mushroom_block",
            ),
            BiomeTemplateId::CrimsonForest => Self::wooden(
                "crimson",
                "minecraft:crimson_stem",
                "minecraft:crimson_hyphae",
                "minecraft:nether_wart_block",
            ),
            BiomeTemplateId::WarpedForest => Self::wooden(
                "warped",
                "minecraft:warped_stem",
                "minecraft:warped_hyphae",
                "minecraft:warped_wart_block",
            ),
            _ => Self::disabled(),
        }
    }

    fn wooden(
        kind: &'static str,
        log: &'static str,
        wood: &'static str,
        leaves: &'static str,
    ) -> Self {
        // The axis variants reuse the base block; packs that need oriented
        // states encode them in the template via the _X/_Y/_Z placeholders.
        Self {
            kind,
            enabled: true,
            log,
            log_x: log,
            log_y: log,
            log_z: log,
            wood,
            wood_x: wood,
            wood_z: wood,
            leaves,
        }
    }
}

// ─── Dimension definition ───────────────────────────────────────────────────

/// A fully specified dimension. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionDefinition {
    pub dimension_id: String,
    pub seed: i64,
    pub shell_type: ShellType,
    pub biomes: Vec<BiomeSlot>,
    pub palettes: BTreeMap<u32, PaletteDefinition>,
}

impl DimensionDefinition {
    pub fn new(
        dimension_id: &str,
        seed: i64,
        shell_type: ShellType,
        biomes: Vec<BiomeSlot>,
        palettes: BTreeMap<u32, PaletteDefinition>,
    ) -> Result<Self, DefinitionError> {
        let def = Self {
            dimension_id: dimension_id.to_string(),
            seed,
            shell_type,
            biomes,
            palettes,
        };
        def.validate()?;
        Ok(def)
    }

    /// Check the definition invariants; also applied to parsed JSON.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.dimension_id.is_empty() || !self.dimension_id.contains(':') {
            return Err(DefinitionError::InvalidDimensionId(
                self.dimension_id.clone(),
            ));
        }
        if self.biomes.is_empty() {
            return Err(DefinitionError::EmptyBiomes);
        }
        let mut seen = std::collections::HashSet::new();
        for slot in &self.biomes {
            slot.validate()?;
            if !seen.insert(slot.palette_slot) {
                return Err(DefinitionError::DuplicatePaletteSlot(slot.palette_slot));
            }
            if !self.palettes.contains_key(&slot.palette_slot) {
                return Err(DefinitionError::MissingPalette(slot.palette_slot));
            }
        }
        for (slot, palette) in &self.palettes {
            if *slot == 0 {
                return Err(DefinitionError::InvalidPaletteSlot);
            }
            if !seen.contains(slot) {
                return Err(DefinitionError::UnusedPalette(*slot));
            }
            palette.validate()?;
        }
        Ok(())
    }

    /// Unique surface blocks across the definition, in biome order.
    pub fn surface_blocks(&self) -> Vec<String> {
        let mut out = Vec::new();
        for slot in &self.biomes {
            if let Some(palette) = self.palettes.get(&slot.palette_slot) {
                if !out.contains(&palette.surface_block) {
                    out.push(palette.surface_block.clone());
                }
            }
        }
        out
    }
}
