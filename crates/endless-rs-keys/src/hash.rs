//! Deterministic text → seed mapping.
//!
//! The seeds derived here are part of the on-disk contract: generated
//! dimension ids embed the 64-bit seed, and already-materialized packs are
//! addressed by those ids. None of the constants below may change.

/// Appended to every hashed text before mixing.
pub const SALT: &str = " :why_so_salty#LazyCrypto ";

/// Id prefix for procedurally generated dimensions.
pub const GENERATED_PREFIX: &str = "endlessdimensions:generated_";

/// Trim and lowercase, locale-independent.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// 32-bit seed for `text`. Non-negative (the sign bit is masked).
pub fn seed32(text: &str) -> u32 {
    let buf = seed_buffer(mixed32(text));
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) & 0x7FFF_FFFF
}

/// 64-bit seed for `text`. Always in `[0, 2^63)`.
pub fn seed64(text: &str) -> i64 {
    let buf = seed_buffer(mixed32(text));
    let mut eight = [0u8; 8];
    eight.copy_from_slice(&buf[..8]);
    (u64::from_le_bytes(eight) & 0x7FFF_FFFF_FFFF_FFFF) as i64
}

/// Dimension id for a generated seed.
pub fn dimension_id_from_seed(seed: i64) -> String {
    format!("{GENERATED_PREFIX}{seed}")
}

/// Map every char outside `[a-z0-9_]` to `_`; an empty result becomes
/// `fallback`.
pub fn sanitize(text: &str, fallback: &str) -> String {
    let out: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        fallback.to_string()
    } else {
        out
    }
}

/// Run the two djb2-style mixers over the UTF-16 code units of `text + SALT`
/// and fold the pair into one 32-bit value.
fn mixed32(text: &str) -> u32 {
    let mut h1: u32 = 5381;
    let mut h2: u32 = 52711;
    let salted = format!("{text}{SALT}");
    for unit in salted.encode_utf16() {
        let ch = u32::from(unit);
        h1 = h1.wrapping_shl(5).wrapping_add(h1) ^ ch;
        h2 = h2.wrapping_shl(5).wrapping_add(h2) ^ ch;
    }
    let combined = (u64::from(h1) << 12).wrapping_add(u64::from(h2));
    combined as u32
}

/// Replicate `value` little-endian into a 32-byte buffer at offsets
/// `(i * 8) & 31`. Bytes 4..8 stay zero, so the 64-bit read is dominated by
/// the low word.
fn seed_buffer(value: u32) -> [u8; 32] {
    let mut buf = [0u8; 32];
    let bytes = value.to_le_bytes();
    for i in 0..4 {
        let off = (i * 8) & 31;
        buf[off..off + 4].copy_from_slice(&bytes);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize(" Hello "), "hello");
        assert_eq!(normalize("LIBRARY"), "library");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_idempotent() {
        for text in ["  MiXeD Case  ", "plain", " \t spaced \n "] {
            let once = normalize(text);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn seeds_are_deterministic() {
        assert_eq!(seed32("hello"), seed32("hello"));
        assert_eq!(seed64("hello"), seed64("hello"));
        assert_eq!(seed64("island"), seed64("island"));
    }

    #[test]
    fn seed64_non_negative() {
        for text in ["", "hello", "LightHouse", "1234", "ʒʒʒ unicode ʒʒʒ"] {
            assert!(seed64(text) >= 0, "seed64({text:?}) was negative");
        }
    }

    #[test]
    fn seed32_masks_sign_bit() {
        for text in ["", "a", "zoo", "some longer text with spaces"] {
            assert!(seed32(text) <= 0x7FFF_FFFF);
        }
    }

    #[test]
    fn case_changes_the_hash() {
        // Raw text is hashed for generated dimensions, so casing matters.
        assert_ne!(seed64("LightHouse"), seed64("lighthouse"));
    }

    #[test]
    fn generated_id_embeds_seed() {
        let seed = seed64("hello");
        assert_eq!(
            dimension_id_from_seed(seed),
            format!("endlessdimensions:generated_{seed}")
        );
    }

    #[test]
    fn sanitize_replaces_and_falls_back() {
        assert_eq!(sanitize("cherry", "unknown"), "cherry");
        assert_eq!(sanitize("ed-abc123", "custom"), "ed_abc123");
        assert_eq!(sanitize("a b:c", "unknown"), "a_b_c");
        assert_eq!(sanitize("", "unknown"), "unknown");
    }
}
