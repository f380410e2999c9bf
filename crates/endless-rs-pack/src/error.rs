use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template tree missing at {0}")]
    MissingTemplates(PathBuf),

    #[error("pack.yml missing in {0}")]
    MissingPackYml(PathBuf),

    #[error("pack.yml in {0} has no id line")]
    MissingPackId(PathBuf),

    #[error("biome template missing: {0}")]
    MissingBiomeTemplate(PathBuf),

    #[error("overlay template missing: {0}")]
    MissingOverlayTemplate(PathBuf),

    #[error("tree palette mismatch for palette slot {slot}: {first} vs {second}")]
    TreePaletteConflict {
        slot: u32,
        first: String,
        second: String,
    },
}

impl PackError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
