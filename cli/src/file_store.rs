//! JSON-file storage backend for the native CLI.
//!
//! The file holds one flat JSON object of string values, the same shape the
//! browser keeps in `localStorage`. Every operation re-reads the file so two
//! CLI invocations never work from a stale copy.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use authgate::{StorageBackend, StorageError};

pub const DEFAULT_STORE_FILE: &str = ".authgate-session.json";

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&e)),
        }
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let Some(raw) = self.read_raw()? else {
            return Ok(BTreeMap::new());
        };
        serde_json::from_str(&raw).map_err(|e| StorageError::Backend(format!("{}: {e}", self.path.display())))
    }

    /// Map to modify before a write, plus whether the file on disk was
    /// corrupt. A corrupt file is replaced by the write instead of blocking it.
    fn read_map_for_write(&self) -> Result<(BTreeMap<String, String>, bool), StorageError> {
        let Some(raw) = self.read_raw()? else {
            return Ok((BTreeMap::new(), false));
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok((map, false)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file is corrupt; overwriting");
                Ok((BTreeMap::new(), true))
            }
        }
    }

    /// Write through a sibling temp file so a crash never leaves half a file.
    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(&e))?;
        }
        let rendered = serde_json::to_string_pretty(map).map_err(|e| StorageError::Backend(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, rendered).map_err(|e| io_error(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| io_error(&e))
    }
}

fn io_error(e: &io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => StorageError::Unavailable(e.to_string()),
        io::ErrorKind::StorageFull => StorageError::QuotaExceeded,
        _ => StorageError::Backend(e.to_string()),
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let (mut map, _) = self.read_map_for_write()?;
        map.insert(key.to_owned(), value.to_owned());
        self.write_map(&map)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let (mut map, corrupt) = self.read_map_for_write()?;
        if map.remove(key).is_none() && !corrupt {
            return Ok(());
        }
        self.write_map(&map)
    }
}

#[cfg(test)]
#[path = "file_store_test.rs"]
mod file_store_test;
