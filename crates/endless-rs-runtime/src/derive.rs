//! Deterministic derivation of a dimension's biomes and palettes from its
//! seed.
//!
//! Every pick below is part of the on-disk contract: a book thrown twice
//! must configure the same dimension, so nothing here consults ambient
//! randomness.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use endless_rs_dimension::{
    BiomeSlot, BiomeTemplateId, DefinitionError, PaletteDefinition, ShellType,
};

const SHUFFLE_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

const SURFACE_SALT: i32 = 11;
const STONE_SALT: i32 = 23;
const LIQUID_SALT: i32 = 37;

pub const MIN_BIOMES: usize = 1;
pub const MAX_BIOMES: usize = 4;

/// Shell for a seed. Books pick their archetype from the seed itself.
pub fn shell_for_seed(seed: i64) -> ShellType {
    ShellType::ALL[(seed as u64 % ShellType::ALL.len() as u64) as usize]
}

/// Draw a deterministic subset of the shell's biome pool: the count comes
/// from an RNG seeded with the seed, the order from a shuffle seeded with a
/// salted seed.
pub fn biome_subset(
    shell: ShellType,
    seed: i64,
    min_biomes: usize,
    max_biomes: usize,
) -> Vec<BiomeTemplateId> {
    let mut rng = StdRng::seed_from_u64(seed as u64);
    let span = max_biomes.saturating_sub(min_biomes) + 1;
    let count = min_biomes + rng.gen_range(0..span);

    let mut pool: Vec<BiomeTemplateId> = shell.biome_pool().to_vec();
    let mut shuffle_rng = StdRng::seed_from_u64((seed as u64) ^ SHUFFLE_SALT);
    pool.shuffle(&mut shuffle_rng);
    pool.truncate(count.min(pool.len()));
    pool
}

/// Turn one drawn template into a biome slot. Overlays re-draw a base biome
/// uniformly and ride on top of it.
pub fn resolve_selection(
    shell: ShellType,
    template: BiomeTemplateId,
    rng: &mut StdRng,
    slot: u32,
) -> Result<BiomeSlot, DefinitionError> {
    if template.is_overlay() {
        let bases = shell.base_biome_pool();
        let base = bases[rng.gen_range(0..bases.len())];
        BiomeSlot::new(base, Some(template), slot)
    } else {
        BiomeSlot::new(template, None, slot)
    }
}

/// Deterministic palette for a slot, mixed from the seed, the slot, and a
/// per-material salt.
pub fn build_palette_for_slot(
    shell: ShellType,
    seed: i64,
    slot: u32,
) -> Result<PaletteDefinition, DefinitionError> {
    let surface = pick(surface_options(shell), seed, slot, SURFACE_SALT);
    let stone = pick(stone_options(shell), seed, slot, STONE_SALT);
    let liquid = pick(liquid_options(shell), seed, slot, LIQUID_SALT);
    PaletteDefinition::new(surface, None, stone, Some(liquid))
}

/// Biomes and palettes for a whole definition.
pub fn derive_definition_inputs(
    shell: ShellType,
    seed: i64,
) -> Result<(Vec<BiomeSlot>, BTreeMap<u32, PaletteDefinition>), DefinitionError> {
    let templates = biome_subset(shell, seed, MIN_BIOMES, MAX_BIOMES);
    let mut rng = StdRng::seed_from_u64(seed as u64);

    let mut biomes = Vec::with_capacity(templates.len());
    let mut palettes = BTreeMap::new();
    for (i, template) in templates.into_iter().enumerate() {
        let slot = (i + 1) as u32;
        biomes.push(resolve_selection(shell, template, &mut rng, slot)?);
        palettes.insert(slot, build_palette_for_slot(shell, seed, slot)?);
    }
    Ok((biomes, palettes))
}

/// The LCG mix of the palette contract. `floor_mod` semantics keep the index
/// non-negative.
fn pick(options: &'static [&'static str], seed: i64, slot: u32, salt: i32) -> &'static str {
    let x = (seed as i32)
        ^ (slot as i32).wrapping_mul(0x9E37_79B9_u32 as i32)
        ^ salt.wrapping_mul(0x85EB_CA6B_u32 as i32);
    let mixed = x.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    options[mixed.rem_euclid(options.len() as i32) as usize]
}

fn surface_options(shell: ShellType) -> &'static [&'static str] {
    match shell {
        ShellType::OverworldOpen => &[
            "minecraft:grass_block",
            "minecraft:sand",
            "minecraft:podzol",
            "minecraft:mycelium",
            "minecraft:snow_block",
            "minecraft:red_sand",
            "minecraft:moss_block",
            "minecraft:coarse_dirt",
        ],
        ShellType::NetherCavern => &[
            "minecraft:netherrack",
            "minecraft:crimson_nylium",
            "minecraft:warped_nylium",
            "minecraft:soul_soil",
            "minecraft:basalt",
        ],
        ShellType::EndIslands => &[
            "minecraft:end_stone",
            "minecraft:purpur_block",
            "minecraft:obsidian",
        ],
        ShellType::Superflat => &[
            "minecraft:grass_block",
            "minecraft:sand",
            "minecraft:mycelium",
            "minecraft:snow_block",
        ],
    }
}

fn stone_options(shell: ShellType) -> &'static [&'static str] {
    match shell {
        ShellType::OverworldOpen => &[
            "minecraft:stone",
            "minecraft:deepslate",
            "minecraft:andesite",
            "minecraft:diorite",
            "minecraft:granite",
            "minecraft:tuff",
            "minecraft:calcite",
        ],
        ShellType::NetherCavern => &[
            "minecraft:netherrack",
            "minecraft:blackstone",
            "minecraft:basalt",
        ],
        ShellType::EndIslands => &["minecraft:end_stone", "minecraft:obsidian"],
        ShellType::Superflat => &["minecraft:stone", "minecraft:deepslate"],
    }
}

/// Empty entries mean the slot has no liquid.
fn liquid_options(shell: ShellType) -> &'static [&'static str] {
    match shell {
        ShellType::OverworldOpen => &["minecraft:water", "", "minecraft:water", "minecraft:lava", ""],
        ShellType::NetherCavern => &["minecraft:lava", "", "minecraft:lava"],
        ShellType::EndIslands => &["", "", "minecraft:water"],
        ShellType::Superflat => &["", "minecraft:water"],
    }
}
