//! Remote reference store: folders (collections), items and tags
//!
//! The organizer only talks to the store through [`ReferenceStore`], so the
//! Zotero client and the in-memory store are interchangeable.

pub mod memory;
pub mod retry;
pub mod zotero;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use memory::MemoryStore;
pub use retry::RetryPolicy;
pub use zotero::ZoteroClient;

/// Identifier assigned by the remote store to a folder that really exists.
///
/// Only values returned by a listing or a creation call become a
/// `FolderKey`, so a dry-run placeholder can never reach a move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderKey(String);

impl FolderKey {
    pub fn new(key: impl Into<String>) -> Self {
        FolderKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One folder as reported by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub key: FolderKey,
    pub name: String,
    /// `None` for a top-level folder
    pub parent: Option<FolderKey>,
}

/// A library item (paper, note, attachment)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    /// Last-modified version, sent back on writes
    #[serde(default)]
    pub version: u64,
    pub item_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Type of each tag that is not a plain manual tag (1 = automatic)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tag_types: BTreeMap<String, u32>,
    /// Keys of the folders the item is filed in
    #[serde(default)]
    pub collections: Vec<String>,
    /// Note body (HTML), for note items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_item: Option<String>,
}

impl Item {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Tag type as the remote reports it; 0 for manual or unknown tags
    pub fn tag_type(&self, tag: &str) -> u32 {
        self.tag_types.get(tag).copied().unwrap_or(0)
    }

    /// Replace the tag list, forgetting the types of dropped tags
    pub fn replace_tags(&mut self, tags: &[String]) {
        self.tags = tags.to_vec();
        self.tag_types.retain(|name, _| tags.contains(name));
    }

    pub fn in_folder(&self, folder: &FolderKey) -> bool {
        self.collections.iter().any(|c| c == folder.as_str())
    }

    pub fn is_note(&self) -> bool {
        self.item_type == "note"
    }
}

/// Operations the organizer needs from the reference manager.
///
/// Writes take the item mutably: on success the implementation updates the
/// item's version, folders and tags so a following write does not conflict.
pub trait ReferenceStore {
    /// Every folder in the library
    fn list_folders(&self) -> Result<Vec<Folder>>;

    fn create_folder(&self, name: &str, parent: Option<&FolderKey>) -> Result<FolderKey>;

    /// Top-level items carrying `tag`, optionally restricted to one folder
    fn list_items_by_tag(&self, tag: &str, folder: Option<&FolderKey>) -> Result<Vec<Item>>;

    /// Every top-level item in the library
    fn list_items(&self) -> Result<Vec<Item>>;

    /// Child notes and attachments of an item
    fn get_children(&self, item_key: &str) -> Result<Vec<Item>>;

    /// Add the item to a folder, keeping its existing folders
    fn move_item_to_folder(&self, folder: &FolderKey, item: &mut Item) -> Result<()>;

    fn add_tag(&self, item: &mut Item, tag: &str) -> Result<()>;

    /// Replace the item's tags
    fn set_tags(&self, item: &mut Item, tags: &[String]) -> Result<()>;
}

/// Full slash-joined path of every listed folder.
///
/// Folders whose ancestry is broken (missing parent or a cycle) get the path
/// of the part that could be walked.
pub fn full_paths(folders: &[Folder]) -> BTreeMap<FolderKey, String> {
    let by_key: HashMap<&FolderKey, &Folder> = folders.iter().map(|f| (&f.key, f)).collect();

    folders
        .iter()
        .map(|folder| {
            let mut names = vec![folder.name.as_str()];
            let mut current = folder.parent.as_ref();
            while let Some(parent_key) = current {
                if names.len() > folders.len() {
                    break;
                }
                match by_key.get(parent_key) {
                    Some(parent) => {
                        names.push(parent.name.as_str());
                        current = parent.parent.as_ref();
                    }
                    None => break,
                }
            }
            names.reverse();
            (folder.key.clone(), names.join("/"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(key: &str, name: &str, parent: Option<&str>) -> Folder {
        Folder {
            key: FolderKey::new(key),
            name: name.to_string(),
            parent: parent.map(FolderKey::new),
        }
    }

    #[test]
    fn test_full_paths_follow_parents() {
        let folders = vec![
            folder("C", "Flash Drought", Some("B")),
            folder("A", "Hydrology", None),
            folder("B", "Extremes", Some("A")),
        ];
        let paths = full_paths(&folders);
        assert_eq!(paths[&FolderKey::new("A")], "Hydrology");
        assert_eq!(paths[&FolderKey::new("B")], "Hydrology/Extremes");
        assert_eq!(paths[&FolderKey::new("C")], "Hydrology/Extremes/Flash Drought");
    }

    #[test]
    fn test_full_paths_survive_cycles_and_orphans() {
        let folders = vec![
            folder("X", "x", Some("Y")),
            folder("Y", "y", Some("X")),
            folder("O", "orphan", Some("GONE")),
        ];
        let paths = full_paths(&folders);
        assert_eq!(paths[&FolderKey::new("O")], "orphan");
        assert!(paths[&FolderKey::new("X")].ends_with("/x"));
    }

    #[test]
    fn test_item_helpers() {
        let item = Item {
            key: "I1".into(),
            item_type: "journalArticle".into(),
            tags: vec!["gemini_read".into()],
            collections: vec!["K1".into()],
            ..Default::default()
        };
        assert!(item.has_tag("gemini_read"));
        assert!(!item.has_tag("auto_organized"));
        assert!(item.in_folder(&FolderKey::new("K1")));
        assert!(!item.is_note());
    }
}
