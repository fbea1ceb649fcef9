//! Persisted folder path cache
//!
//! Maps a folder's display name (or, in full-path mode, its slash-joined
//! path) to its remote key and parent key. The file is a pretty-printed JSON
//! object, rewritten atomically whenever an entry is added.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CacheKeying;
use crate::error::{Result, ZotsortError};
use crate::logging::ResourceMetrics;
use crate::remote::{full_paths, FolderKey, ReferenceStore};

/// One cached folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: FolderKey,
    pub parent: Option<FolderKey>,
}

pub struct PathCache {
    file: Option<PathBuf>,
    keying: CacheKeying,
    entries: BTreeMap<String, CacheEntry>,
    needs_rebuild: bool,
    metrics: ResourceMetrics,
}

impl PathCache {
    /// A cache that is never written to disk
    pub fn in_memory(keying: CacheKeying) -> Self {
        Self {
            file: None,
            keying,
            entries: BTreeMap::new(),
            needs_rebuild: true,
            metrics: ResourceMetrics::new(),
        }
    }

    /// Load the cache file.
    ///
    /// A missing or unreadable file gives an empty cache flagged for rebuild
    /// instead of an error.
    pub fn load(path: &Path, keying: CacheKeying) -> Self {
        let mut cache = Self::in_memory(keying);
        cache.file = Some(path.to_path_buf());

        if !path.exists() {
            debug!(path = %path.display(), "no cache file, starting empty");
            return cache;
        }

        let parsed = fs::read_to_string(path)
            .map_err(ZotsortError::from)
            .and_then(|content| {
                serde_json::from_str::<BTreeMap<String, CacheEntry>>(&content)
                    .map_err(ZotsortError::from)
            });

        match parsed {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "loaded cache");
                cache.entries = entries;
                cache.needs_rebuild = false;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache file unreadable, will rebuild");
            }
        }

        cache
    }

    /// Keep the loaded entries but stop writing them back to the file
    pub fn detached(mut self) -> Self {
        self.file = None;
        self
    }

    pub fn keying(&self) -> CacheKeying {
        self.keying
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// True until the cache has been filled from a good file or a reload
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    pub fn metrics(&self) -> &ResourceMetrics {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    /// Cache key for the last segment of `segments` under the current keying
    pub fn key_for(&self, segments: &[&str]) -> String {
        match self.keying {
            CacheKeying::Name => segments.last().copied().unwrap_or_default().to_string(),
            CacheKeying::FullPath => segments.join("/"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CacheEntry> {
        let entry = self.entries.get(name);
        if entry.is_some() {
            self.metrics.record_cache_hit();
        } else {
            self.metrics.record_cache_miss();
        }
        entry
    }

    /// Insert or replace an entry. Call [`PathCache::persist`] to save it.
    pub fn put(&mut self, name: &str, entry: CacheEntry) {
        self.entries.insert(name.to_string(), entry);
    }

    /// Write the whole mapping to the cache file (temp file + rename)
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| ZotsortError::io_operation("create cache dir", dir.display(), e))?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        let temp_path = path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, path)
        };
        write().map_err(|e| ZotsortError::io_operation("write cache", path.display(), e))?;

        debug!(path = %path.display(), entries = self.entries.len(), "persisted cache");
        Ok(())
    }

    /// Replace the whole mapping from a fresh remote listing.
    ///
    /// If the listing fails the in-memory entries and the file are untouched.
    pub fn reload(&mut self, store: &dyn ReferenceStore) -> Result<()> {
        let start = Instant::now();
        let folders = store.list_folders()?;
        self.metrics.record_remote_call();

        let names: BTreeMap<FolderKey, String> = match self.keying {
            CacheKeying::Name => folders
                .iter()
                .map(|f| (f.key.clone(), f.name.clone()))
                .collect(),
            CacheKeying::FullPath => full_paths(&folders),
        };

        let mut entries = BTreeMap::new();
        for folder in &folders {
            let Some(name) = names.get(&folder.key) else {
                continue;
            };
            let entry = CacheEntry {
                key: folder.key.clone(),
                parent: folder.parent.clone(),
            };
            match entries.entry(name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(existing) => {
                    warn!(
                        name = %name,
                        kept = %existing.get().key,
                        ignored = %folder.key,
                        "duplicate folder name, keeping first listed"
                    );
                }
            }
        }

        self.entries = entries;
        self.needs_rebuild = false;
        self.persist()?;

        info!(entries = self.entries.len(), "cache rebuilt from remote listing");
        crate::trace_time!(start, "cache_reload", folders = folders.len());
        Ok(())
    }
}
