//! Per-slot palette file emission.

use std::path::Path;

use endless_rs_dimension::DimensionDefinition;

use crate::error::PackError;

/// Write the palette documents for every slot of the definition into
/// `<pack>/palettes/`. The ocean file is only emitted when the slot has a
/// liquid block.
pub fn write(pack_dir: &Path, definition: &DimensionDefinition) -> Result<(), PackError> {
    let dir = pack_dir.join("palettes");
    std::fs::create_dir_all(&dir).map_err(|e| PackError::io(&dir, e))?;

    for (slot, palette) in &definition.palettes {
        let files = [
            (format!("DIM_PAL_{slot}"), palette.surface_block.as_str()),
            (
                format!("DIM_PAL_{slot}_SUBSURFACE"),
                palette.subsurface_block.as_str(),
            ),
            (format!("DIM_PAL_{slot}_STONE"), palette.stone_block.as_str()),
        ];
        for (id, block) in files {
            let path = dir.join(format!("{id}.yml"));
            std::fs::write(&path, palette_yaml(&id, block)).map_err(|e| PackError::io(&path, e))?;
        }
        if let Some(liquid) = &palette.liquid_block {
            let id = format!("DIM_OCEAN_{slot}");
            let path = dir.join(format!("{id}.yml"));
            std::fs::write(&path, palette_yaml(&id, liquid))
                .map_err(|e| PackError::io(&path, e))?;
        }
    }
    Ok(())
}

/// One-layer palette skeleton the generator expects.
fn palette_yaml(id: &str, block: &str) -> String {
    format!(
        "id: {id}\n\
         type: PALETTE\n\
         layers:\n\
         \x20 - materials:\n\
         \x20     - \"{block}\": 1\n\
         \x20   layers: 1\n"
    )
}
