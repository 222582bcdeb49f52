//! Directory-backed storage backend.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::storage::StorageBackend;

const FILE_EXTENSION: &str = "entry";
/// Extension of files named by key digest; the hex key is their first line
const HASHED_EXTENSION: &str = "hentry";
/// Longest hex key used verbatim as a file name (NAME_MAX is 255 bytes)
const MAX_HEX_NAME_LEN: usize = 200;

/// errno for "no space left on device"
#[cfg(unix)]
const ENOSPC: i32 = 28;

/// Stores each key as one file under a base directory.
///
/// File names are the hex encoding of the key, so any key is filesystem-safe
/// and can be recovered by [`keys`](StorageBackend::keys). Keys too long for
/// a file name are stored under their SHA-256 digest with the hex key written
/// as the file's first line.
#[derive(Debug)]
pub struct FileStorage {
    base_path: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileStorage {
    // == Open ==
    /// Opens (creating if needed) storage rooted at `base_path`.
    ///
    /// Fails with [`StorageError::Unavailable`] when the directory cannot be
    /// created or is not writable.
    pub fn open<P: AsRef<Path>>(base_path: P) -> StorageResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::Unavailable(format!("{}: {}", base_path.display(), e))
        })?;

        let metadata = fs::metadata(&base_path)?;
        if metadata.permissions().readonly() {
            return Err(StorageError::Unavailable(format!(
                "{} is read-only",
                base_path.display()
            )));
        }

        debug!("Opened file storage at {}", base_path.display());
        Ok(Self {
            base_path,
            quota_bytes: None,
        })
    }

    /// Caps the total size of stored values.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> StoredKey {
        let encoded = hex::encode(key);
        if encoded.len() <= MAX_HEX_NAME_LEN {
            StoredKey {
                path: self.base_path.join(format!("{}.{}", encoded, FILE_EXTENSION)),
                header: None,
            }
        } else {
            let digest = hex::encode(Sha256::digest(key.as_bytes()));
            StoredKey {
                path: self.base_path.join(format!("{}.{}", digest, HASHED_EXTENSION)),
                header: Some(encoded),
            }
        }
    }

    fn used_bytes(&self) -> StorageResult<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if is_entry_file(&entry.path()) {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let stored = self.key_path(key);
        let contents = match fs::read_to_string(&stored.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match stored.header {
            None => Ok(Some(contents)),
            Some(header) => match contents.split_once('\n') {
                Some((found, value)) if found == header => Ok(Some(value.to_string())),
                // Digest collision or a truncated file
                _ => Ok(None),
            },
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let stored = self.key_path(key);
        let contents = match &stored.header {
            Some(header) => format!("{}\n{}", header, value),
            None => value.to_string(),
        };

        if let Some(quota) = self.quota_bytes {
            let replaced = fs::metadata(&stored.path).map(|m| m.len()).unwrap_or(0);
            let projected = self.used_bytes()? - replaced + contents.len() as u64;
            if projected > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        fs::write(&stored.path, contents).map_err(map_write_error)
    }

    fn delete(&mut self, key: &str) -> StorageResult<bool> {
        match fs::remove_file(self.key_path(key).path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            // Foreign files that do not decode are not ours to list
            let key = match extension(&path) {
                Some(FILE_EXTENSION) => path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(decode_key),
                Some(HASHED_EXTENSION) => read_header(&path)?,
                _ => None,
            };
            keys.extend(key);
        }
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Where a key lives on disk, plus the header hashed files carry.
struct StoredKey {
    path: PathBuf,
    header: Option<String>,
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn read_header(path: &Path) -> StorageResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents.split_once('\n').and_then(|(header, _)| decode_key(header))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_entry_file(path: &Path) -> bool {
    matches!(extension(path), Some(FILE_EXTENSION | HASHED_EXTENSION))
}

fn map_write_error(err: io::Error) -> StorageError {
    #[cfg(unix)]
    if err.raw_os_error() == Some(ENOSPC) {
        return StorageError::QuotaExceeded;
    }
    StorageError::Io(err)
}

fn decode_key(encoded: &str) -> Option<String> {
    hex::decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}
