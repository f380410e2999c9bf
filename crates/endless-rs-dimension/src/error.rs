use thiserror::Error;

use crate::model::BiomeTemplateId;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("dimension id must be non-empty and namespace-qualified, got {0:?}")]
    InvalidDimensionId(String),

    #[error("definition has no biomes")]
    EmptyBiomes,

    #[error("palette slot {0} is used by more than one biome")]
    DuplicatePaletteSlot(u32),

    #[error("no palette defined for slot {0}")]
    MissingPalette(u32),

    #[error("palette for slot {0} is not referenced by any biome")]
    UnusedPalette(u32),

    #[error("palette slot must be >= 1")]
    InvalidPaletteSlot,

    #[error("{0:?} is not a base biome template")]
    NotABaseTemplate(BiomeTemplateId),

    #[error("{0:?} is not an overlay template")]
    NotAnOverlay(BiomeTemplateId),

    #[error("surface block must not be empty")]
    EmptySurfaceBlock,

    #[error("stone block must not be empty")]
    EmptyStoneBlock,

    #[error("definition version {found} is newer than supported version {current}")]
    UnsupportedVersion { found: u32, current: u32 },

    #[error("key store: {0}")]
    KeyStore(#[from] endless_rs_keys::KeyStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
