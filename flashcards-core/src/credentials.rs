//! The OCR service key kept next to the cards.

use crate::kv::KeyValueStore;
use crate::CoreError;

pub const API_KEY_KEY: &str = "flashcards.api_key";

const GOOGLE_PREFIX: &str = "AIza";
const GOOGLE_KEY_LEN: usize = 39;

pub fn is_valid_api_key(key: &str) -> bool {
    let len = key.chars().count();
    if !(20..=100).contains(&len) {
        return false;
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return false;
    }
    !key.starts_with(GOOGLE_PREFIX) || len == GOOGLE_KEY_LEN
}

pub fn save_api_key(kv: &dyn KeyValueStore, key: &str) -> Result<(), CoreError> {
    let key = key.trim();
    if !is_valid_api_key(key) {
        return Err(CoreError::Invalid("api key format"));
    }
    kv.set(API_KEY_KEY, key)?;
    Ok(())
}

/// The stored key, if one is present and still well formed.
pub fn load_api_key(kv: &dyn KeyValueStore) -> Option<String> {
    kv.get(API_KEY_KEY)
        .ok()
        .flatten()
        .filter(|k| is_valid_api_key(k))
}

pub fn clear_api_key(kv: &dyn KeyValueStore) -> Result<(), CoreError> {
    kv.remove(API_KEY_KEY)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn google_key() -> String {
        format!("AIza{}", "x".repeat(35))
    }

    #[test]
    fn length_bounds() {
        assert!(!is_valid_api_key(""));
        assert!(!is_valid_api_key(&"a".repeat(19)));
        assert!(is_valid_api_key(&"a".repeat(20)));
        assert!(is_valid_api_key(&"a".repeat(100)));
        assert!(!is_valid_api_key(&"a".repeat(101)));
    }

    #[test]
    fn charset_is_restricted() {
        assert!(is_valid_api_key("abc-DEF_123-abc-DEF_123"));
        assert!(!is_valid_api_key("abc DEF 123 abc DEF 123"));
        assert!(!is_valid_api_key("abc.DEF/123+abc=DEF!123"));
    }

    #[test]
    fn google_prefix_requires_exact_length() {
        assert!(is_valid_api_key(&google_key()));
        assert!(!is_valid_api_key(&format!("{}x", google_key())));
        assert!(!is_valid_api_key(&google_key()[..38]));
    }

    #[test]
    fn save_validates_and_load_filters() {
        let kv = MemoryStore::new();
        assert!(save_api_key(&kv, "short").is_err());
        save_api_key(&kv, &format!("  {}  ", google_key())).unwrap();
        assert_eq!(load_api_key(&kv), Some(google_key()));

        kv.seed(API_KEY_KEY, "bad key");
        assert_eq!(load_api_key(&kv), None);

        clear_api_key(&kv).unwrap();
        assert_eq!(kv.get(API_KEY_KEY).unwrap(), None);
    }
}
