//! Identifier validation

use uuid::{Uuid, Variant};

/// Hyphenated UUID length (8-4-4-4-12)
const HYPHENATED_LEN: usize = 36;

/// True for a hyphenated RFC 4122 UUID of version 1 through 5
///
/// Empty strings, placeholders and other UUID encodings are rejected.
pub fn is_valid_uuid_v1_5(candidate: &str) -> bool {
    if candidate.len() != HYPHENATED_LEN {
        return false;
    }
    match Uuid::try_parse(candidate) {
        Ok(id) => {
            id.get_variant() == Variant::RFC4122 && (1..=5).contains(&id.get_version_num())
        }
        Err(_) => false,
    }
}

/// Trimmed candidate if it is a valid v1-5 UUID
pub fn valid_uuid(candidate: Option<&str>) -> Option<String> {
    candidate
        .map(str::trim)
        .filter(|c| is_valid_uuid_v1_5(c))
        .map(str::to_string)
}
