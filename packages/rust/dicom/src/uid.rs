//! Unique identifier generation and well-known UIDs.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

/// Key Object Selection Document Storage SOP Class.
pub const KEY_OBJECT_SELECTION_DOCUMENT_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.88.59";

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

/// Implementation Class UID written into the file meta information.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.308654113751278163220761649743455391";

/// Implementation Version Name written into the file meta information.
pub const IMPLEMENTATION_VERSION_NAME: &str = concat!("MKKOS_", env!("CARGO_PKG_VERSION"));

/// Longest UID allowed by the UI value representation.
const MAX_UID_LEN: usize = 64;

static UID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0|[1-9][0-9]*)(\.(0|[1-9][0-9]*))*$").expect("UID regex")
});

/// Generate a UID under the `2.25` root from a random UUID.
pub fn create_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

/// Whether `uid` follows the UID grammar: dot-separated numeric components
/// without leading zeros, at most 64 characters.
pub fn is_valid_uid(uid: &str) -> bool {
    uid.len() <= MAX_UID_LEN && UID_RE.is_match(uid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_uids_are_valid_and_distinct() {
        let a = create_uid();
        let b = create_uid();
        assert!(a.starts_with("2.25."));
        assert!(is_valid_uid(&a), "{a}");
        assert!(is_valid_uid(&b), "{b}");
        assert_ne!(a, b);
    }

    #[test]
    fn uid_grammar() {
        assert!(is_valid_uid(EXPLICIT_VR_LITTLE_ENDIAN));
        assert!(is_valid_uid(IMPLEMENTATION_CLASS_UID));
        assert!(is_valid_uid("1.2.0.3"));
        assert!(!is_valid_uid("1.2.03"));
        assert!(!is_valid_uid("1..2"));
        assert!(!is_valid_uid("1.2."));
        assert!(!is_valid_uid(""));
        assert!(!is_valid_uid("1.2.abc"));
        assert!(!is_valid_uid(&format!("1.{}", "2".repeat(64))));
    }

    #[test]
    fn implementation_version_name_fits_sh() {
        assert!(IMPLEMENTATION_VERSION_NAME.len() <= 16);
    }
}
