//! Keyword documents and per-keyword statistics
//!
//! A document is one paper's keyword list. The corpus indexes which documents
//! mention each keyword so similarity scoring can look them up directly.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::extract::extract_keyword_section;
use super::normalize::KeywordNormalizer;
use crate::error::{Result, ZotsortError};
use crate::remote::{Item, ReferenceStore};

/// One paper's keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub keywords: Vec<String>,
}

/// Statistics for one normalized keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordStats {
    pub text: String,
    /// Indices of the documents that mention the keyword
    pub documents: BTreeSet<usize>,
    /// Total mentions across all documents
    pub frequency: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    stats: BTreeMap<String, KeywordStats>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        let mut stats: BTreeMap<String, KeywordStats> = BTreeMap::new();
        for (index, document) in documents.iter().enumerate() {
            for keyword in &document.keywords {
                let entry = stats
                    .entry(keyword.clone())
                    .or_insert_with(|| KeywordStats {
                        text: keyword.clone(),
                        documents: BTreeSet::new(),
                        frequency: 0,
                    });
                entry.documents.insert(index);
                entry.frequency += 1;
            }
        }
        Self { documents, stats }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.stats.len()
    }

    /// Keywords in lexicographic order
    pub fn keywords(&self) -> impl Iterator<Item = &KeywordStats> {
        self.stats.values()
    }

    pub fn stats(&self, keyword: &str) -> Option<&KeywordStats> {
        self.stats.get(keyword)
    }

    pub fn frequency(&self, keyword: &str) -> usize {
        self.stats.get(keyword).map_or(0, |s| s.frequency)
    }

    /// Number of documents mentioning both keywords
    pub fn cooccurrence(&self, a: &str, b: &str) -> usize {
        match (self.stats.get(a), self.stats.get(b)) {
            (Some(a), Some(b)) => a.documents.intersection(&b.documents).count(),
            _ => 0,
        }
    }

    /// Distinct unordered keyword pairs that share at least one document
    pub fn total_cooccurrences(&self) -> usize {
        let mut pairs: BTreeSet<(&str, &str)> = BTreeSet::new();
        for document in &self.documents {
            let unique: BTreeSet<&str> = document.keywords.iter().map(String::as_str).collect();
            let unique: Vec<&str> = unique.into_iter().collect();
            for (i, a) in unique.iter().enumerate() {
                for b in &unique[i + 1..] {
                    pairs.insert((*a, *b));
                }
            }
        }
        pairs.len()
    }
}

/// Entry of a keyword input file: either a keyword list or a note body
#[derive(Debug, Deserialize)]
struct InputRecord {
    key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    note: Option<String>,
}

/// Read documents from a JSON array of `{key, title, keywords}` or
/// `{key, title, note}` records. Records without keywords are dropped.
pub fn load_documents(path: &Path, normalizer: &KeywordNormalizer) -> Result<Vec<Document>> {
    let content = fs::read_to_string(path)
        .map_err(|e| ZotsortError::io_operation("read keyword input", path.display(), e))?;
    let records: Vec<InputRecord> =
        serde_json::from_str(&content).map_err(|e| ZotsortError::InvalidInput {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let total = records.len();
    let documents: Vec<Document> = records
        .into_iter()
        .filter_map(|record| {
            let keywords = match (&record.keywords, &record.note) {
                (Some(list), _) => normalizer.split_all(list),
                (None, Some(note)) => extract_keyword_section(note)
                    .map(|section| normalizer.split(&section))
                    .unwrap_or_default(),
                (None, None) => Vec::new(),
            };
            if keywords.is_empty() {
                debug!(key = %record.key, "no keywords in record");
                return None;
            }
            Some(Document {
                key: record.key,
                title: record.title,
                keywords,
            })
        })
        .collect();

    info!(path = %path.display(), records = total, documents = documents.len(), "loaded keyword input");
    Ok(documents)
}

/// Keywords from the first matching reading note among an item's children
pub fn keywords_from_children(
    children: &[Item],
    note_title: &str,
    normalizer: &KeywordNormalizer,
) -> Option<Vec<String>> {
    children
        .iter()
        .filter(|child| child.is_note())
        .filter_map(|child| child.note.as_deref())
        .filter(|note| note_title.is_empty() || note.contains(note_title))
        .filter_map(extract_keyword_section)
        .map(|section| normalizer.split(&section))
        .find(|keywords| !keywords.is_empty())
}

/// Build documents from every top-level item's reading note.
///
/// Items whose children cannot be fetched are skipped with a warning.
pub fn fetch_documents(
    store: &dyn ReferenceStore,
    note_title: &str,
    normalizer: &KeywordNormalizer,
) -> Result<Vec<Document>> {
    let start = Instant::now();
    let items = store.list_items()?;
    let mut documents = Vec::new();

    for item in &items {
        if item.is_note() || item.item_type == "attachment" {
            continue;
        }
        let children = match store.get_children(&item.key) {
            Ok(children) => children,
            Err(e) => {
                warn!(key = %item.key, error = %e, "could not fetch children, skipping");
                continue;
            }
        };
        if let Some(keywords) = keywords_from_children(&children, note_title, normalizer) {
            documents.push(Document {
                key: item.key.clone(),
                title: item.title.clone(),
                keywords,
            });
        }
    }

    info!(items = items.len(), documents = documents.len(), "collected keyword documents");
    crate::trace_time!(start, "fetch_documents");
    Ok(documents)
}
