//! Fixed parameter substitution for the special overlay features.

use std::path::Path;

use tracing::warn;

use crate::error::PackError;
use crate::text::{substitute, Document};

/// Placeholder values baked into the special feature templates.
const PARAMS: &[(&str, &str)] = &[
    ("DIM_BETWEEN_GRID_WIDTH", "32"),
    ("DIM_BETWEEN_GRID_PADDING", "12"),
    ("DIM_BETWEEN_SHIP_STRUCTURE", "end_ship"),
    ("DIM_BETWEEN_AMOUNT", "1"),
    ("DIM_SHAPES_GRID_WIDTH", "20"),
    ("DIM_SHAPES_GRID_PADDING", "8"),
    ("DIM_SHAPES_WEIGHT_CUBE", "3"),
    ("DIM_SHAPES_WEIGHT_SPHERE", "2"),
    ("DIM_SHAPES_WEIGHT_DIAMOND", "2"),
    ("DIM_SHAPES_AMOUNT", "1"),
];

const FILES: &[&str] = &[
    "features/special/between_end_ships.yml",
    "features/special/shapes_scatter.yml",
];

/// Substitute the fixed placeholder set in the two special feature files.
/// A template tree without them is logged and left alone.
pub fn apply(pack_dir: &Path) -> Result<(), PackError> {
    for rel in FILES {
        let path = pack_dir.join(rel);
        if !path.is_file() {
            warn!("Special feature template missing: {}", path.display());
            continue;
        }
        let mut doc = Document::read(&path)?;
        for line in &mut doc.lines {
            *line = substitute(line, PARAMS);
        }
        doc.write(&path)?;
    }
    Ok(())
}
