//! Dimension data model and the persistent definition catalog.

pub mod error;
pub mod model;
pub mod registry;
pub mod service;

pub use error::DefinitionError;
pub use model::{
    BiomeSlot, DimensionDefinition, PaletteDefinition, ShellType, BiomeTemplateId,
    TreePaletteProfile,
};
pub use registry::{DimensionDefinitionRegistry, CURRENT_VERSION};
pub use service::DimensionDefinitionService;
