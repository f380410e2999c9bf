//! Classifies a book text as a custom, easter-egg, or generated dimension.

use crate::custom::CustomKeyRegistry;
use crate::easter;
use crate::hash::{dimension_id_from_seed, normalize, seed64};

/// How a text resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Custom,
    EasterEgg,
    Generated,
}

/// The outcome of resolving a text key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub normalized_key: String,
    pub dimension_id: String,
    pub seed: i64,
    pub kind: KeyKind,
}

/// Resolve `text` against the custom registry, then the easter-egg catalog,
/// then fall through to a generated dimension.
///
/// Custom and easter-egg seeds hash the normalized key; the generated branch
/// hashes the raw text, so `"LightHouse"` and `"lighthouse"` land in
/// different generated dimensions but the same custom or curated one.
pub fn resolve(text: &str, customs: &CustomKeyRegistry) -> ResolvedKey {
    let normalized = normalize(text);

    if let Some(dimension_id) = customs.resolve(&normalized) {
        return ResolvedKey {
            seed: seed64(&normalized),
            dimension_id: dimension_id.to_string(),
            normalized_key: normalized,
            kind: KeyKind::Custom,
        };
    }

    if easter::is_easter_egg(&normalized) {
        return ResolvedKey {
            seed: seed64(&normalized),
            dimension_id: easter::dimension_id_for(&normalized),
            normalized_key: normalized,
            kind: KeyKind::EasterEgg,
        };
    }

    let seed = seed64(text);
    ResolvedKey {
        normalized_key: normalized,
        dimension_id: dimension_id_from_seed(seed),
        seed,
        kind: KeyKind::Generated,
    }
}
