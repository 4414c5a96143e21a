//! Shared key generation for storage backends.
//!
//! Key format: `media/{owner_id}/{32 hex chars}.{ext}`; the extension is kept
//! from the uploaded name when it is short and alphanumeric.

use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 10;
const MAX_ORIGINAL_NAME_LEN: usize = 255;

/// Generate a fresh storage key for a file uploaded by `owner_id`.
pub fn generate_storage_key(owner_id: Uuid, original_name: &str) -> String {
    let stem = Uuid::new_v4().simple().to_string();
    match extension_of(original_name) {
        Some(ext) => format!("media/{}/{}.{}", owner_id, stem, ext),
        None => format!("media/{}/{}", owner_id, stem),
    }
}

/// Lowercased extension of `name`, if it is usable in a key.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Strip any client-supplied directory part and control characters from an
/// uploaded file name.
pub fn sanitize_original_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_ORIGINAL_NAME_LEN)
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_owner_scoped_and_keeps_extension() {
        let owner = Uuid::new_v4();
        let key = generate_storage_key(owner, "Holiday.JPG");
        assert!(key.starts_with(&format!("media/{}/", owner)));
        assert!(key.ends_with(".jpg"));
        assert!(validate_key(&key));
    }

    #[test]
    fn keys_are_unique() {
        let owner = Uuid::new_v4();
        assert_ne!(
            generate_storage_key(owner, "a.png"),
            generate_storage_key(owner, "a.png")
        );
    }

    #[test]
    fn odd_extensions_are_dropped() {
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("weird.p$g"), None);
        assert_eq!(extension_of("trailing."), None);
        assert_eq!(extension_of("clip.mp4"), Some("mp4".to_string()));
    }

    #[test]
    fn sanitizes_client_paths() {
        assert_eq!(sanitize_original_name("C:\\Users\\me\\cat.png"), "cat.png");
        assert_eq!(sanitize_original_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_original_name(""), "file");
        assert_eq!(sanitize_original_name("a/.."), "file");
    }

    #[test]
    fn rejects_traversal_keys() {
        assert!(!validate_key("../etc/passwd"));
        assert!(!validate_key("/etc/passwd"));
        assert!(!validate_key("media//x"));
        assert!(!validate_key("media\\x"));
        assert!(validate_key("media/abc/def.png"));
    }
}
