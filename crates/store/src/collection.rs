//! File-per-record key–value collection with mtime-driven refresh.
//!
//! Records live as `<id>.yml` under one directory. Reads go through an
//! in-memory cache that is invalidated by comparing the file's mtime against
//! the mtime observed at the last read — this is how one process observes
//! another's writes without any invalidation message. Writes stay in memory
//! (dirty set, tombstones) until [`Collection::save`], the sole writer.

use crate::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

struct CacheEntry<T> {
    value: T,
    /// mtime of the file when it was last read; None for unsaved records.
    read_mtime: Option<SystemTime>,
}

pub struct Collection<T> {
    dir: PathBuf,
    cache: HashMap<String, CacheEntry<T>>,
    dirty: BTreeSet<String>,
    deleted: BTreeSet<String>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
            dirty: BTreeSet::new(),
            deleted: BTreeSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.yml"))
    }

    /// Fetch a record, re-reading the file when its mtime is strictly newer
    /// than the cached read stamp. Tombstoned ids are absent immediately.
    pub fn get(&mut self, id: &str) -> Result<Option<T>, StoreError> {
        if self.deleted.contains(id) {
            return Ok(None);
        }
        // Unsaved local mutations win over whatever is on disk.
        if self.dirty.contains(id) {
            return Ok(self.cache.get(id).map(|e| e.value.clone()));
        }

        let path = self.path_for(id);
        let disk_mtime = match std::fs::metadata(&path) {
            Ok(meta) => meta.modified().ok(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.cache.remove(id);
                return Ok(None);
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let fresh = match (self.cache.get(id).and_then(|e| e.read_mtime), disk_mtime) {
            (Some(cached), Some(disk)) => disk <= cached,
            _ => false,
        };
        if fresh {
            return Ok(self.cache.get(id).map(|e| e.value.clone()));
        }

        match self.read_file(&path)? {
            Some(value) => {
                self.cache.insert(
                    id.to_string(),
                    CacheEntry { value: value.clone(), read_mtime: disk_mtime },
                );
                Ok(Some(value))
            }
            None => {
                self.cache.remove(id);
                Ok(None)
            }
        }
    }

    /// Update the cache and mark the id dirty. Nothing hits disk until `save`.
    pub fn set(&mut self, id: &str, value: T) {
        self.deleted.remove(id);
        self.cache.insert(id.to_string(), CacheEntry { value, read_mtime: None });
        self.dirty.insert(id.to_string());
    }

    /// Tombstone the id: absent immediately, file removed on `save`.
    pub fn delete(&mut self, id: &str) {
        self.cache.remove(id);
        self.dirty.remove(id);
        self.deleted.insert(id.to_string());
    }

    /// Ids present on disk. Always a directory scan — the directory is
    /// authoritative and may include ids never loaded.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// All records reachable from disk plus unsaved local ones.
    pub fn get_all(&mut self) -> Result<Vec<(String, T)>, StoreError> {
        let mut ids = self.list()?;
        for id in self.dirty.iter() {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids.sort();
        let mut out = Vec::new();
        for id in ids {
            if let Some(value) = self.get(&id)? {
                out.push((id, value));
            }
        }
        Ok(out)
    }

    /// Drop the non-dirty cache and read every record back from disk.
    pub fn load_all(&mut self) -> Result<(), StoreError> {
        let dirty: Vec<String> = self.dirty.iter().cloned().collect();
        self.cache.retain(|id, _| dirty.contains(id));
        for id in self.list()? {
            let _ = self.get(&id)?;
        }
        Ok(())
    }

    /// Flush: remove tombstoned files, write dirty records (creating the
    /// directory as needed), clear both sets. Repeated saves with no
    /// intervening mutation write nothing.
    pub fn save(&mut self) -> Result<(), StoreError> {
        for id in std::mem::take(&mut self.deleted) {
            let path = self.path_for(&id);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(path, e)),
            }
        }

        let dirty = std::mem::take(&mut self.dirty);
        if dirty.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        for id in dirty {
            let Some(entry) = self.cache.get_mut(&id) else { continue };
            let path = self.dir.join(format!("{id}.yml"));
            let text = serde_yaml::to_string(&entry.value)
                .map_err(|e| StoreError::Serialize { path: path.clone(), source: e })?;
            std::fs::write(&path, text).map_err(|e| StoreError::io(&path, e))?;
            entry.read_mtime = std::fs::metadata(&path)
                .ok()
                .and_then(|m| m.modified().ok());
        }
        Ok(())
    }

    /// Whether unsaved mutations exist.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty() || !self.deleted.is_empty()
    }

    fn read_file(&self, path: &Path) -> Result<Option<T>, StoreError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        match serde_yaml::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Corrupt records are treated as absent, never as partial loads.
                warn!(path = %path.display(), error = %e, "unreadable record skipped");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
