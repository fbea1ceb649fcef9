//! Resolve slash-delimited collection paths to remote folders
//!
//! Each segment is looked up in the [`PathCache`]. A miss triggers one full
//! refresh from the remote listing per call; whatever is still missing after
//! that is created, cached and persisted. In dry-run mode nothing is created
//! and placeholders stand in for the folders that would be.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, PathCache};
use crate::config::CollisionPolicy;
use crate::log_resource_metrics;
use crate::remote::{FolderKey, ReferenceStore};


/// Path the classifier returns when it declines to classify
pub const UNCLASSIFIED: &str = "Unclassified";

const PLACEHOLDER_PREFIX: &str = "dry-run:";

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFolder {
    /// A folder that exists remotely
    Remote(FolderKey),
    /// A folder that would have been created (dry-run only)
    Placeholder(String),
}

impl ResolvedFolder {
    /// The remote key, if this is a real folder
    pub fn remote_key(&self) -> Option<&FolderKey> {
        match self {
            ResolvedFolder::Remote(key) => Some(key),
            ResolvedFolder::Placeholder(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ResolvedFolder::Placeholder(_))
    }
}

impl fmt::Display for ResolvedFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedFolder::Remote(key) => write!(f, "{}", key),
            ResolvedFolder::Placeholder(placeholder) => f.write_str(placeholder),
        }
    }
}

/// Position reached while walking a path
enum Cursor {
    Root,
    Remote(FolderKey),
    Planned(String),
}

/// Split a path into trimmed, non-empty segments
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// True for the sentinel the classifier uses to decline, in any slash or
/// whitespace dressing
pub fn is_unclassified(path: &str) -> bool {
    matches!(split_path(path).as_slice(), [only] if only.eq_ignore_ascii_case(UNCLASSIFIED))
}

pub struct CollectionResolver<'a> {
    store: &'a dyn ReferenceStore,
    cache: PathCache,
    dry_run: bool,
    policy: CollisionPolicy,
    planned: BTreeSet<String>,
}

impl<'a> CollectionResolver<'a> {
    pub fn new(store: &'a dyn ReferenceStore, cache: PathCache, dry_run: bool) -> Self {
        Self {
            store,
            cache,
            dry_run,
            policy: CollisionPolicy::default(),
            planned: BTreeSet::new(),
        }
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    pub fn into_cache(self) -> PathCache {
        self.cache
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Placeholders handed out so far in dry-run mode
    pub fn planned_folders(&self) -> impl Iterator<Item = &String> {
        self.planned.iter()
    }

    /// Resolve `path`, creating missing folders.
    ///
    /// Returns `None` for an empty path, the "Unclassified" sentinel, or any
    /// remote failure along the way. Folders created before a failure stay
    /// cached.
    pub fn resolve_path(&mut self, path: &str) -> Option<ResolvedFolder> {
        let segments = split_path(path);
        if segments.is_empty() || is_unclassified(path) {
            debug!(path, "nothing to resolve");
            return None;
        }

        let mut cursor = Cursor::Root;
        let mut refreshed = false;

        for (depth, name) in segments.iter().enumerate() {
            let parent = match cursor {
                Cursor::Planned(parent) => {
                    cursor = Cursor::Planned(self.plan(name, &parent));
                    continue;
                }
                Cursor::Remote(key) => Some(key),
                Cursor::Root => None,
            };

            let cache_key = self.cache.key_for(&segments[..=depth]);
            cursor = self.resolve_segment(&cache_key, name, parent, &mut refreshed)?;
        }

        log_resource_metrics!(self.cache.metrics(), "resolve_path");

        match cursor {
            Cursor::Remote(key) => Some(ResolvedFolder::Remote(key)),
            Cursor::Planned(placeholder) => Some(ResolvedFolder::Placeholder(placeholder)),
            Cursor::Root => None,
        }
    }

    fn resolve_segment(
        &mut self,
        cache_key: &str,
        name: &str,
        parent: Option<FolderKey>,
        refreshed: &mut bool,
    ) -> Option<Cursor> {
        loop {
            if let Some(entry) = self.cache.get(cache_key).cloned() {
                if entry.parent == parent {
                    return Some(Cursor::Remote(entry.key));
                }
                return match self.policy {
                    CollisionPolicy::ReuseWithWarning => {
                        warn!(
                            name,
                            cached_key = %entry.key,
                            cached_parent = ?entry.parent,
                            expected_parent = ?parent,
                            "folder name collision, reusing cached folder"
                        );
                        Some(Cursor::Remote(entry.key))
                    }
                    CollisionPolicy::CreateDistinct => {
                        warn!(
                            name,
                            cached_key = %entry.key,
                            expected_parent = ?parent,
                            "folder name collision, creating a distinct folder"
                        );
                        self.create(cache_key, name, parent)
                    }
                };
            }

            if *refreshed {
                break;
            }
            *refreshed = true;
            debug!(name, "cache miss, refreshing from remote");
            if let Err(e) = self.cache.reload(self.store) {
                warn!(name, error = %e, "folder listing failed, aborting resolution");
                return None;
            }
        }

        self.create(cache_key, name, parent)
    }

    fn create(&mut self, cache_key: &str, name: &str, parent: Option<FolderKey>) -> Option<Cursor> {
        if self.dry_run {
            let parent_label = parent.as_ref().map(FolderKey::as_str).unwrap_or("root");
            return Some(Cursor::Planned(self.plan(name, parent_label)));
        }

        self.cache.metrics().record_remote_call();
        let key = match self.store.create_folder(name, parent.as_ref()) {
            Ok(key) => key,
            Err(e) => {
                warn!(name, parent = ?parent, error = %e, "folder creation failed");
                return None;
            }
        };

        info!(name, key = %key, parent = ?parent, "created folder");
        self.cache.put(
            cache_key,
            CacheEntry {
                key: key.clone(),
                parent,
            },
        );
        if let Err(e) = self.cache.persist() {
            warn!(error = %e, "could not persist cache after folder creation");
        }
        Some(Cursor::Remote(key))
    }

    fn plan(&mut self, name: &str, parent_label: &str) -> String {
        let placeholder = format!("{}{}@{}", PLACEHOLDER_PREFIX, name, parent_label);
        if self.planned.insert(placeholder.clone()) {
            info!(name, parent = parent_label, "dry run: would create folder");
        }
        placeholder
    }

    /// Look up an existing folder by path without creating anything.
    ///
    /// Walks a fresh remote listing, matching each segment by name under the
    /// previous one. At the top level a parentless folder is preferred.
    pub fn find_existing(&self, path: &str) -> Option<FolderKey> {
        let segments = split_path(path);
        if segments.is_empty() {
            return None;
        }

        self.cache.metrics().record_remote_call();
        let folders = match self.store.list_folders() {
            Ok(folders) => folders,
            Err(e) => {
                warn!(path, error = %e, "folder listing failed");
                return None;
            }
        };

        let mut current: Option<FolderKey> = None;
        for (depth, name) in segments.iter().enumerate() {
            let mut candidates = folders.iter().filter(|f| f.name == *name);
            let found = if depth == 0 {
                let candidates: Vec<_> = candidates.collect();
                candidates
                    .iter()
                    .find(|f| f.parent.is_none())
                    .or_else(|| candidates.first())
                    .map(|f| f.key.clone())
            } else {
                candidates
                    .find(|f| f.parent == current)
                    .map(|f| f.key.clone())
            };

            match found {
                Some(key) => current = Some(key),
                None => {
                    debug!(path, segment = *name, "folder not found");
                    return None;
                }
            }
        }
        current
    }
}
