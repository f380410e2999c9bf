//! The curated easter-egg key set.
//!
//! A closed list of lowercase English words that route to hand-tuned
//! dimensions instead of procedurally generated ones.

use crate::hash::sanitize;

/// Id prefix for easter-egg dimensions.
pub const EASTER_PREFIX: &str = "endlessdimensions:easter_";

/// All curated keys, already normalized. The set is closed; new members are a
/// content change, not a runtime one.
pub const EASTER_KEYS: &[&str] = &[
    "ant", "library", "credits", "cherry", "bones", "busy", "colors",
    "custom", "darkness", "decay", "desert", "end", "fleet", "garden",
    "hole", "island", "liquids", "lucky", "map", "message", "missing",
    "mushroom", "ocean", "origin", "pattern", "perfect", "pillar", "pizza",
    "prison", "quarry", "red", "rooms", "shapes", "sky", "slime", "snow",
    "source", "spiral", "sports", "stone", "suite", "temples", "tunnels",
    "wall", "water", "wind", "zoo",
];

/// Whether `normalized` is a curated key. Callers normalize first.
pub fn is_easter_egg(normalized: &str) -> bool {
    EASTER_KEYS.contains(&normalized)
}

/// Stable dimension id for a curated key.
pub fn dimension_id_for(normalized: &str) -> String {
    format!("{EASTER_PREFIX}{}", sanitize(normalized, "unknown"))
}
