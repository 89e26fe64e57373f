use chrono::{DateTime, Utc};
use flashcards_core::{KeyValueStore, StorageError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub mod paths;

const FILE_VERSION: u32 = 1;

/// Default quota, the same budget browsers give one origin's local storage.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Serialize, Deserialize)]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    entries: BTreeMap<String, String>,
}

impl FileImage {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            version: FILE_VERSION,
            created_at: now,
            updated_at: now,
            entries: BTreeMap::new(),
        }
    }

    fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

enum OnDisk {
    Missing,
    Corrupt(String),
    Present(FileImage),
}

/// A key/value store kept in one JSON file.
///
/// Every read goes to disk so several processes can share a file; the last
/// writer wins. Writes go through a temp file and a rename, and the previous
/// file is copied into `backups_dir` first.
pub struct JsonFileStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    quota_bytes: Option<usize>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open_with(
        path: PathBuf,
        backups_dir: PathBuf,
        max_backups: usize,
    ) -> Result<Self, StorageError> {
        ensure_parent_dirs(&path).map_err(|e| classify(&e))?;
        fs::create_dir_all(&backups_dir).map_err(|e| classify(&e))?;
        Ok(Self {
            path,
            backups_dir,
            max_backups: max_backups.max(1),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            write_lock: Mutex::new(()),
        })
    }

    /// `None` lifts the quota.
    pub fn with_quota(mut self, bytes: Option<usize>) -> Self {
        self.quota_bytes = bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_image(&self) -> Result<OnDisk, StorageError> {
        let buf = match fs::read_to_string(&self.path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(OnDisk::Missing),
            Err(e) => return Err(classify(&e)),
        };
        match serde_json::from_str::<FileImage>(&buf) {
            Ok(img) => Ok(OnDisk::Present(img)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "store file is corrupt");
                Ok(OnDisk::Corrupt(e.to_string()))
            }
        }
    }

    /// Current image for a write. A corrupt file is replaced; its content is
    /// still in the backup taken before the write.
    fn image_for_write(&self) -> Result<FileImage, StorageError> {
        Ok(match self.read_image()? {
            OnDisk::Present(img) => img,
            OnDisk::Missing | OnDisk::Corrupt(_) => FileImage::new_empty(),
        })
    }

    /// Writes `img`. Over quota, only writes that do not grow the stored
    /// bytes past `before` are accepted, so deleting still works after the
    /// quota is lowered.
    fn commit(&self, mut img: FileImage, before: usize) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            let used = img.used_bytes();
            if used > quota && used > before {
                debug!(used, before, quota, "write rejected by quota");
                return Err(StorageError::QuotaExceeded);
            }
        }
        img.updated_at = Utc::now();
        write_with_backup(&self.path, &self.backups_dir, self.max_backups, &img)
            .map_err(|e| classify(&e))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.read_image()? {
            OnDisk::Present(mut img) => Ok(img.entries.remove(key)),
            OnDisk::Missing => Ok(None),
            OnDisk::Corrupt(msg) => Err(StorageError::Other(format!("corrupt store file: {msg}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut img = self.image_for_write()?;
        let before = img.used_bytes();
        img.entries.insert(key.to_string(), value.to_string());
        self.commit(img, before)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut img = self.image_for_write()?;
        let before = img.used_bytes();
        if img.entries.remove(key).is_none() {
            return Ok(());
        }
        self.commit(img, before)
    }
}

/// Map filesystem failures onto the storage error kinds callers act on.
pub fn classify(e: &io::Error) -> StorageError {
    if e.kind() == ErrorKind::PermissionDenied {
        return StorageError::AccessDenied;
    }
    match e.raw_os_error() {
        // ENOSPC, EDQUOT, ERROR_DISK_FULL
        Some(28) | Some(122) | Some(112) => StorageError::QuotaExceeded,
        // EROFS
        Some(30) => StorageError::AccessDenied,
        _ => StorageError::Other(e.to_string()),
    }
}

fn ensure_parent_dirs(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn write_with_backup(
    path: &Path,
    backups_dir: &Path,
    max_backups: usize,
    img: &FileImage,
) -> io::Result<()> {
    ensure_parent_dirs(path)?;
    fs::create_dir_all(backups_dir)?;

    if path.exists() {
        let ts = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let backup_path = backups_dir.join(format!("flashcards-{ts}.json"));
        fs::copy(path, &backup_path)?;
        rotate_backups(backups_dir, max_backups)?;
    }

    let json = serde_json::to_vec_pretty(img).map_err(io::Error::other)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!(path = %path.display(), bytes = json.len(), "store file written");
    Ok(())
}

fn rotate_backups(dir: &Path, keep: usize) -> io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    entries.sort_by_key(|e| e.file_name());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            let _ = fs::remove_file(e.path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_permission_denied() {
        let e = io::Error::from(ErrorKind::PermissionDenied);
        assert_eq!(classify(&e), StorageError::AccessDenied);
    }

    #[test]
    fn classify_disk_full() {
        let e = io::Error::from_raw_os_error(28);
        assert_eq!(classify(&e), StorageError::QuotaExceeded);
    }

    #[test]
    fn classify_other() {
        let e = io::Error::new(ErrorKind::Other, "boom");
        assert!(matches!(classify(&e), StorageError::Other(_)));
    }
}
