//! Strip every tag except a keep-list from library items

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::remote::ReferenceStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagCleanSummary {
    /// Items with tags that were examined
    pub processed: usize,
    /// Items whose tags were (or would be) rewritten
    pub cleaned: usize,
    /// Items filtered out by type or carrying no tags
    pub skipped: usize,
    pub failed: usize,
}

/// Keep only the tags listed in `keep` (exact, case-sensitive match).
///
/// An empty `item_types` means every type. Items that are already clean are
/// not written. Failing to list the library is an error; a failed write
/// only counts against that item.
pub fn clean_tags(
    store: &dyn ReferenceStore,
    keep: &[String],
    item_types: &[String],
    dry_run: bool,
) -> Result<TagCleanSummary> {
    let items = store.list_items()?;
    let mut summary = TagCleanSummary::default();

    for mut item in items {
        if !item_types.is_empty() && !item_types.contains(&item.item_type) {
            summary.skipped += 1;
            continue;
        }
        if item.tags.is_empty() {
            summary.skipped += 1;
            continue;
        }

        summary.processed += 1;
        let kept: Vec<String> = item
            .tags
            .iter()
            .filter(|tag| keep.contains(tag))
            .cloned()
            .collect();
        if kept.len() == item.tags.len() {
            debug!(key = %item.key, "tags already clean");
            continue;
        }

        let removed: Vec<&String> = item.tags.iter().filter(|t| !keep.contains(t)).collect();
        if dry_run {
            info!(key = %item.key, removed = ?removed, "[dry run] would remove tags");
            summary.cleaned += 1;
            continue;
        }
        debug!(key = %item.key, removed = ?removed, "removing tags");

        match store.set_tags(&mut item, &kept) {
            Ok(()) => summary.cleaned += 1,
            Err(e) => {
                warn!(key = %item.key, error = %e, "failed to clean tags");
                summary.failed += 1;
            }
        }
    }

    info!(
        processed = summary.processed,
        cleaned = summary.cleaned,
        skipped = summary.skipped,
        failed = summary.failed,
        dry_run,
        "tag cleaning complete"
    );
    Ok(summary)
}
