//! In-process reference store
//!
//! Backs the `--offline` mode and the resolver and organizer tests. Every
//! call is counted, and listing or creation can be made to fail on demand.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Folder, FolderKey, Item, ReferenceStore};
use crate::error::{Result, ZotsortError};

const SERVICE: &str = "memory";

/// Per-operation call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_folders: usize,
    pub create_folder: usize,
    pub list_items: usize,
    pub get_children: usize,
    pub move_item: usize,
    pub tag_writes: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list_folders
            + self.create_folder
            + self.list_items
            + self.get_children
            + self.move_item
            + self.tag_writes
    }
}

/// Serialized form used to seed a store from a JSON file
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub folders: Vec<SnapshotFolder>,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotFolder {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    folders: RefCell<Vec<Folder>>,
    items: RefCell<BTreeMap<String, Item>>,
    next_key: Cell<usize>,
    calls: Cell<CallCounts>,
    fail_listing: Cell<bool>,
    /// Creation succeeds this many more times, then fails
    create_budget: Cell<Option<usize>>,
    failing_items: RefCell<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        for folder in snapshot.folders {
            store.insert_folder(&folder.key, &folder.name, folder.parent.as_deref());
        }
        for item in snapshot.items {
            store.insert_item(item);
        }
        store
    }

    /// Add a folder as if another tool had created it
    pub fn insert_folder(&self, key: &str, name: &str, parent: Option<&str>) -> FolderKey {
        let key = FolderKey::new(key);
        self.folders.borrow_mut().push(Folder {
            key: key.clone(),
            name: name.to_string(),
            parent: parent.map(FolderKey::new),
        });
        key
    }

    pub fn insert_item(&self, item: Item) {
        self.items.borrow_mut().insert(item.key.clone(), item);
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.folders.borrow().clone()
    }

    pub fn item(&self, key: &str) -> Option<Item> {
        self.items.borrow().get(key).cloned()
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    pub fn reset_calls(&self) {
        self.calls.set(CallCounts::default());
    }

    /// Make every folder listing fail until turned off
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.set(fail);
    }

    /// Allow `remaining` more folder creations, then fail the rest
    pub fn fail_create_after(&self, remaining: usize) {
        self.create_budget.set(Some(remaining));
    }

    /// Make every write to this item fail
    pub fn fail_writes_for(&self, item_key: &str) {
        self.failing_items.borrow_mut().insert(item_key.to_string());
    }

    fn count(&self, update: impl FnOnce(&mut CallCounts)) {
        let mut calls = self.calls.get();
        update(&mut calls);
        self.calls.set(calls);
    }

    fn check_writable(&self, item: &Item) -> Result<()> {
        if self.failing_items.borrow().contains(&item.key) {
            return Err(ZotsortError::remote_status(SERVICE, 412, "version conflict"));
        }
        Ok(())
    }

    /// Apply a change to both the stored copy and the caller's copy
    fn update_item(&self, item: &mut Item, change: impl Fn(&mut Item)) {
        change(item);
        item.version += 1;
        if let Some(stored) = self.items.borrow_mut().get_mut(&item.key) {
            change(stored);
            stored.version = item.version;
        }
    }
}

impl ReferenceStore for MemoryStore {
    fn list_folders(&self) -> Result<Vec<Folder>> {
        self.count(|c| c.list_folders += 1);
        if self.fail_listing.get() {
            return Err(ZotsortError::remote_transport(SERVICE, "listing disabled"));
        }
        Ok(self.folders())
    }

    fn create_folder(&self, name: &str, parent: Option<&FolderKey>) -> Result<FolderKey> {
        self.count(|c| c.create_folder += 1);
        match self.create_budget.get() {
            Some(0) => {
                return Err(ZotsortError::remote_status(SERVICE, 403, "write access denied"))
            }
            Some(remaining) => self.create_budget.set(Some(remaining - 1)),
            None => {}
        }
        if let Some(parent) = parent {
            if !self.folders.borrow().iter().any(|f| &f.key == parent) {
                return Err(ZotsortError::remote_status(
                    SERVICE,
                    400,
                    format!("parent collection {} does not exist", parent),
                ));
            }
        }

        let index = self.next_key.get() + 1;
        self.next_key.set(index);
        let key = format!("MEM{:05}", index);
        Ok(self.insert_folder(&key, name, parent.map(FolderKey::as_str)))
    }

    fn list_items_by_tag(&self, tag: &str, folder: Option<&FolderKey>) -> Result<Vec<Item>> {
        self.count(|c| c.list_items += 1);
        Ok(self
            .items
            .borrow()
            .values()
            .filter(|item| item.parent_item.is_none() && item.has_tag(tag))
            .filter(|item| folder.map_or(true, |f| item.in_folder(f)))
            .cloned()
            .collect())
    }

    fn list_items(&self) -> Result<Vec<Item>> {
        self.count(|c| c.list_items += 1);
        Ok(self
            .items
            .borrow()
            .values()
            .filter(|item| item.parent_item.is_none())
            .cloned()
            .collect())
    }

    fn get_children(&self, item_key: &str) -> Result<Vec<Item>> {
        self.count(|c| c.get_children += 1);
        Ok(self
            .items
            .borrow()
            .values()
            .filter(|item| item.parent_item.as_deref() == Some(item_key))
            .cloned()
            .collect())
    }

    fn move_item_to_folder(&self, folder: &FolderKey, item: &mut Item) -> Result<()> {
        self.count(|c| c.move_item += 1);
        self.check_writable(item)?;
        if !self.folders.borrow().iter().any(|f| &f.key == folder) {
            return Err(ZotsortError::not_found("collection", folder));
        }
        if item.in_folder(folder) {
            return Ok(());
        }
        self.update_item(item, |i| i.collections.push(folder.to_string()));
        Ok(())
    }

    fn add_tag(&self, item: &mut Item, tag: &str) -> Result<()> {
        if item.has_tag(tag) {
            return Ok(());
        }
        let mut tags = item.tags.clone();
        tags.push(tag.to_string());
        self.set_tags(item, &tags)
    }

    fn set_tags(&self, item: &mut Item, tags: &[String]) -> Result<()> {
        self.count(|c| c.tag_writes += 1);
        self.check_writable(item)?;
        self.update_item(item, |i| i.replace_tags(tags));
        Ok(())
    }
}
