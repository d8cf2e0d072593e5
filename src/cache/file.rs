//! File-based cache backend with atomic writes.
//!
//! Stores one `<fingerprint>.json` file per token under
//! `dirs::data_dir()/<namespace>/`. Uses temp file + rename so a reader never
//! sees a half-written entry.

use crate::cache::format::CacheEntry;
use crate::cache::store::CacheStore;
use crate::GateError;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// File-based cache backend.
#[derive(Debug)]
pub struct FileStore {
    /// Directory for cache files.
    cache_dir: PathBuf,
    /// Distinguishes temp files of concurrent writers.
    write_seq: AtomicU64,
}

impl FileStore {
    /// Create a file store with the given namespace.
    ///
    /// Cache files are stored under `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, GateError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| GateError::CacheIO("Could not find data directory".to_string()))?;

        Self::with_path(base_dir.join(namespace))
    }

    /// Create a file store at a specific directory.
    pub fn with_path(cache_dir: PathBuf) -> Result<Self, GateError> {
        fs::create_dir_all(&cache_dir)
            .map_err(|e| GateError::CacheIO(format!("Failed to create cache dir: {}", e)))?;
        Ok(Self {
            cache_dir,
            write_seq: AtomicU64::new(0),
        })
    }

    /// Directory holding the cache files.
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the path for an entry file.
    fn entry_path(&self, fingerprint: &str) -> Result<PathBuf, GateError> {
        // Fingerprints become file names; anything but hex is refused.
        if fingerprint.is_empty() || !fingerprint.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GateError::CacheIO(format!(
                "Refusing non-hex fingerprint {:?}",
                fingerprint
            )));
        }
        Ok(self.cache_dir.join(format!("{}.json", fingerprint)))
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>, GateError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)
            .map_err(|e| GateError::CacheIO(format!("Failed to read cache dir: {}", e)))?
        {
            let entry =
                entry.map_err(|e| GateError::CacheIO(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn read_entry(path: &Path) -> Result<Option<CacheEntry>, GateError> {
        match fs::read_to_string(path) {
            Ok(json) => CacheEntry::from_json(&json).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GateError::CacheIO(format!(
                "Failed to read cache file: {}",
                e
            ))),
        }
    }

    fn remove_file(path: &Path) -> Result<bool, GateError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GateError::CacheIO(format!("Failed to delete cache file: {}", e))),
        }
    }
}

impl CacheStore for FileStore {
    fn load(&self, fingerprint: &str) -> Result<Option<CacheEntry>, GateError> {
        Self::read_entry(&self.entry_path(fingerprint)?)
    }

    fn save(&self, entry: CacheEntry) -> Result<(), GateError> {
        let target_path = self.entry_path(&entry.fingerprint)?;
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = self.cache_dir.join(format!(
            "{}.{}.{}.tmp",
            entry.fingerprint,
            std::process::id(),
            seq
        ));

        let json = entry.to_json()?;

        fs::write(&temp_path, &json)
            .map_err(|e| GateError::CacheIO(format!("Failed to write temp file: {}", e)))?;

        if let Err(e) = fs::rename(&temp_path, &target_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(GateError::CacheIO(format!(
                "Failed to rename cache file: {}",
                e
            )));
        }

        Ok(())
    }

    fn delete(&self, fingerprint: &str) -> Result<bool, GateError> {
        Self::remove_file(&self.entry_path(fingerprint)?)
    }

    fn clear(&self) -> Result<usize, GateError> {
        let mut removed = 0;
        for path in self.entry_files()? {
            if Self::remove_file(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, GateError> {
        let mut removed = 0;
        for path in self.entry_files()? {
            let stale = match Self::read_entry(&path) {
                Ok(Some(entry)) => entry.created_at <= cutoff,
                Ok(None) => false,
                Err(e) => {
                    // Unreadable entries can never be served; drop them too.
                    warn!(error = %e, path = %path.display(), "Removing unreadable cache entry");
                    true
                }
            };
            if stale && Self::remove_file(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn entries(&self) -> Result<Vec<CacheEntry>, GateError> {
        let mut entries = Vec::new();
        for path in self.entry_files()? {
            match Self::read_entry(&path) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!(error = %e, path = %path.display(), "Skipping unreadable cache entry"),
            }
        }
        Ok(entries)
    }
}
