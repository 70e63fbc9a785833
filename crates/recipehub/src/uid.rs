//! Random identifiers for entities.
//!
//! Identifiers are cut from the hex form of a v4 UUID, so they are lowercase
//! alphanumeric and at most 32 characters long.

/// Length of project, data, recipe and job uids.
pub const ENTITY_UID_LEN: usize = 8;

/// Length of snippet and snippet type uids.
pub const SNIPPET_UID_LEN: usize = 6;

/// Length of the project share token.
pub const SHARE_TOKEN_LEN: usize = 30;

/// Returns a fresh random identifier of `len` characters (capped at 32).
pub fn generate(len: usize) -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(len.min(32));
    id
}

/// Keeps `current` when it holds a non-blank uid, otherwise generates one.
///
/// Uids are assigned once at creation and never rewritten afterwards.
pub fn assign_once(current: &mut String, len: usize) {
    if current.trim().is_empty() {
        *current = generate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length() {
        assert_eq!(generate(8).len(), 8);
        assert_eq!(generate(6).len(), 6);
        assert_eq!(generate(64).len(), 32);
    }

    #[test]
    fn test_generate_is_hex() {
        let id = generate(30);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_differs() {
        assert_ne!(generate(8), generate(8));
    }

    #[test]
    fn test_assign_once_keeps_existing() {
        let mut uid = "abc12345".to_string();
        assign_once(&mut uid, ENTITY_UID_LEN);
        assert_eq!(uid, "abc12345");
    }

    #[test]
    fn test_assign_once_fills_blank() {
        let mut uid = "  ".to_string();
        assign_once(&mut uid, ENTITY_UID_LEN);
        assert_eq!(uid.len(), ENTITY_UID_LEN);
    }
}
