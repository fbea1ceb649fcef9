//! Batch classification of papers into collection paths
//!
//! A [`Classifier`] turns one batch into raw model text. [`parse_decisions`]
//! reads that text into per-index decisions and never fails: anything it
//! cannot interpret becomes "no decision" for that index.

pub mod gemini;
pub mod prompt;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::remote::Item;

pub use gemini::GeminiClassifier;
pub use prompt::build_prompt;

/// A paper waiting to be filed, with the keywords from its reading note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub item: Item,
    pub keywords: Vec<String>,
}

impl Paper {
    pub fn new(item: Item, keywords: Vec<String>) -> Self {
        Self { item, keywords }
    }

    pub fn key(&self) -> &str {
        &self.item.key
    }

    pub fn title(&self) -> &str {
        &self.item.title
    }
}

/// Consecutive papers submitted to the classifier together
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationBatch {
    /// 0-based batch number within the run
    pub index: usize,
    pub papers: Vec<Paper>,
}

impl ClassificationBatch {
    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

/// Target paths chosen for one paper, in the order the model gave them
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Decision {
    pub paths: Vec<String>,
}

/// External service that proposes collection paths for a batch
pub trait Classifier {
    /// Raw model output for `batch`. Errors mean "no decision" for the
    /// whole batch; callers never abort on them.
    fn classify(&self, batch: &ClassificationBatch, taxonomy: &[String]) -> Result<String>;
}

/// Drop a surrounding markdown code fence, with or without a language tag
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Paths from one decision value: a string, a list of strings, or an
/// `{archive_path, idea_path}` object. Blank strings are dropped.
fn decision_paths(value: &Value) -> Vec<String> {
    let candidates: Vec<&Value> = match value {
        Value::String(_) => vec![value],
        Value::Array(values) => values.iter().collect(),
        Value::Object(map) => ["archive_path", "idea_path", "path"]
            .iter()
            .filter_map(|field| map.get(*field))
            .collect(),
        _ => Vec::new(),
    };

    candidates
        .into_iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read classifier output into decisions keyed by in-batch index.
///
/// Accepts an object keyed by index (`{"0": ...}`) or an array in batch
/// order. Non-integer keys, indices outside `0..batch_len` and entries with
/// no usable path are skipped.
pub fn parse_decisions(raw: &str, batch_len: usize) -> BTreeMap<usize, Decision> {
    let body = strip_code_fence(raw);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "classifier output is not JSON, no decisions");
            return BTreeMap::new();
        }
    };

    let entries: Vec<(usize, &Value)> = match &value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, value)| match key.trim().parse::<usize>() {
                Ok(index) => Some((index, value)),
                Err(_) => {
                    debug!(key = %key, "ignoring non-integer decision key");
                    None
                }
            })
            .collect(),
        Value::Array(values) => values.iter().enumerate().collect(),
        _ => {
            warn!("classifier output is neither an object nor an array, no decisions");
            return BTreeMap::new();
        }
    };

    let mut decisions = BTreeMap::new();
    for (index, value) in entries {
        if index >= batch_len {
            debug!(index, batch_len, "ignoring out-of-range decision");
            continue;
        }
        let paths = decision_paths(value);
        if paths.is_empty() {
            debug!(index, "decision has no usable path");
            continue;
        }
        decisions.insert(index, Decision { paths });
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(decisions: &BTreeMap<usize, Decision>, index: usize) -> Vec<&str> {
        decisions[&index].paths.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_parse_plain_object() {
        let raw = r#"{"0": "Extremes×Mechanisms/Flash Drought Dynamics", "1": "Unclassified"}"#;
        let decisions = parse_decisions(raw, 2);
        assert_eq!(decisions.len(), 2);
        assert_eq!(paths(&decisions, 0), vec!["Extremes×Mechanisms/Flash Drought Dynamics"]);
        assert_eq!(paths(&decisions, 1), vec!["Unclassified"]);
    }

    #[test]
    fn test_parse_strips_code_fences() {
        let raw = "```json\n{\"0\": \"A/B\"}\n```";
        assert_eq!(paths(&parse_decisions(raw, 1), 0), vec!["A/B"]);

        let raw = "```\n{\"0\": \"A/B\"}```";
        assert_eq!(paths(&parse_decisions(raw, 1), 0), vec!["A/B"]);
    }

    #[test]
    fn test_parse_dual_track_objects() {
        let raw = r#"{
            "0": {"archive_path": "Archive/Hydrology", "idea_path": "Idea Lab/Memory"},
            "1": {"archive_path": "Archive/Remote Sensing", "idea_path": ""},
            "2": {"idea_path": 42}
        }"#;
        let decisions = parse_decisions(raw, 3);
        assert_eq!(paths(&decisions, 0), vec!["Archive/Hydrology", "Idea Lab/Memory"]);
        assert_eq!(paths(&decisions, 1), vec!["Archive/Remote Sensing"]);
        assert!(!decisions.contains_key(&2));
    }

    #[test]
    fn test_parse_ignores_invalid_indices() {
        let raw = r#"{"0": "A", "x": "B", "-1": "C", "5": "D", " 2 ": "E", "1": null}"#;
        let decisions = parse_decisions(raw, 3);
        assert_eq!(decisions.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(paths(&decisions, 2), vec!["E"]);
    }

    #[test]
    fn test_parse_partial_batch() {
        let raw = r#"{"0": "A/B", "1": {"oops": true}, "2": "C", "3": [], "4": ["D", " ", "E/F"]}"#;
        let decisions = parse_decisions(raw, 5);
        assert_eq!(decisions.keys().copied().collect::<Vec<_>>(), vec![0, 2, 4]);
        assert_eq!(paths(&decisions, 4), vec!["D", "E/F"]);
    }

    #[test]
    fn test_parse_array_in_batch_order() {
        let decisions = parse_decisions(r#"["A", "", "B"]"#, 2);
        assert_eq!(decisions.keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_parse_malformed_output() {
        assert!(parse_decisions("", 3).is_empty());
        assert!(parse_decisions("Sorry, I cannot help with that.", 3).is_empty());
        assert!(parse_decisions("{\"0\": \"A\"", 3).is_empty());
        assert!(parse_decisions("\"A/B\"", 3).is_empty());
        assert!(parse_decisions(r#"{"0": "A"}"#, 0).is_empty());
    }
}
