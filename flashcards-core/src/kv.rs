//! Key/value persistence seam.
//!
//! The card store only ever reads and writes whole string values under fixed
//! keys. [`MemoryStore`] is the in-process implementation; the file-backed one
//! lives in `flashcards-json`.

use crate::StorageError;
use parking_lot::RwLock;
use std::collections::HashMap;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    deny_writes: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would push the total stored bytes past `bytes`.
    /// Writes that do not grow the total always go through.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota_bytes: Some(bytes),
            ..Self::default()
        }
    }

    pub fn set_deny_writes(&self, deny: bool) {
        *self.deny_writes.write() = deny;
    }

    /// Write `value` directly, bypassing quota and denial.
    pub fn seed(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if *self.deny_writes.read() {
            return Err(StorageError::AccessDenied);
        }
        if let Some(quota) = self.quota_bytes {
            let others = self.used_bytes_without(key);
            let before = others + self.entries.read().get(key).map_or(0, |v| key.len() + v.len());
            let after = others + key.len() + value.len();
            if after > quota && after > before {
                return Err(StorageError::QuotaExceeded);
            }
        }
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if *self.deny_writes.read() {
            return Err(StorageError::AccessDenied);
        }
        self.entries.write().remove(key);
        Ok(())
    }
}
