//! File papers into collections in classifier-sized batches
//!
//! Papers tagged with the source tag and carrying a reading note become the
//! todo list. Each batch goes to the classifier once; every decided path is
//! resolved to a folder and the paper is added to it, then tagged as
//! processed so later runs skip it.

pub mod tags;

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{parse_decisions, ClassificationBatch, Classifier, Decision, Paper};
use crate::config::OrganizerConfig;
use crate::error::Result;
use crate::keywords::{keywords_from_children, KeywordNormalizer};
use crate::remote::{FolderKey, ReferenceStore};
use crate::resolver::{is_unclassified, CollectionResolver, ResolvedFolder};


pub use tags::{clean_tags, TagCleanSummary};

/// Outcome of one organize run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Papers submitted to the classifier
    pub processed: usize,
    /// Papers filed into at least one folder (planned, in dry-run)
    pub organized: usize,
    /// Papers the classifier gave no usable decision for
    pub undecided: usize,
    /// Papers whose moves or tagging failed
    pub failed: usize,
    pub batches: usize,
}

/// Papers carrying `source_tag` but not the processed tag, with their
/// note keywords. Papers without a keyword section are left out.
pub fn build_todo_list(
    store: &dyn ReferenceStore,
    config: &OrganizerConfig,
    folder: Option<&FolderKey>,
) -> Result<Vec<Paper>> {
    let start = Instant::now();
    let normalizer = KeywordNormalizer::from_config(&config.keywords);
    let organize = &config.organizer;

    let items = store.list_items_by_tag(&organize.source_tag, folder)?;
    let total = items.len();
    let mut papers = Vec::new();

    for item in items {
        if item.has_tag(&organize.processed_tag) {
            debug!(key = %item.key, "already organized, skipping");
            continue;
        }
        let children = match store.get_children(&item.key) {
            Ok(children) => children,
            Err(e) => {
                warn!(key = %item.key, error = %e, "could not fetch notes, skipping");
                continue;
            }
        };
        match keywords_from_children(&children, &config.keywords.note_title, &normalizer) {
            Some(keywords) => papers.push(Paper::new(item, keywords)),
            None => debug!(key = %item.key, "no keyword section in notes, skipping"),
        }
    }

    info!(
        tag = %organize.source_tag,
        listed = total,
        todo = papers.len(),
        "built todo list"
    );
    crate::trace_time!(start, "build_todo_list");
    Ok(papers)
}

/// Runs the classify, resolve, move and tag loop
pub struct Organizer<'a> {
    store: &'a dyn ReferenceStore,
    classifier: &'a dyn Classifier,
    taxonomy: Vec<String>,
    processed_tag: String,
    batch_size: usize,
    batch_delay: Duration,
    sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a> Organizer<'a> {
    pub fn new(
        store: &'a dyn ReferenceStore,
        classifier: &'a dyn Classifier,
        config: &OrganizerConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            taxonomy: config.classifier.taxonomy.clone(),
            processed_tag: config.organizer.processed_tag.clone(),
            batch_size: config.organizer.batch_size.max(1),
            batch_delay: config.organizer.batch_delay(),
            sleep: Box::new(std::thread::sleep),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Replace the pause between batches, for tests and dry runs
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Classify and file `papers`.
    ///
    /// Per-paper failures are logged and counted; the run always completes.
    /// Papers that already carry the processed tag are dropped up front.
    pub fn process_todo_list(
        &self,
        resolver: &mut CollectionResolver<'_>,
        papers: Vec<Paper>,
    ) -> Summary {
        let start = Instant::now();
        let papers: Vec<Paper> = papers
            .into_iter()
            .filter(|p| !p.item.has_tag(&self.processed_tag))
            .collect();

        let mut summary = Summary::default();
        let total_batches = papers.len().div_ceil(self.batch_size);
        let mut remaining = papers.into_iter().peekable();
        let mut index = 0;

        while remaining.peek().is_some() {
            if index > 0 && !self.batch_delay.is_zero() {
                debug!(delay_ms = self.batch_delay.as_millis() as u64, "pausing between batches");
                (self.sleep)(self.batch_delay);
            }
            let batch = ClassificationBatch {
                index,
                papers: remaining.by_ref().take(self.batch_size).collect(),
            };
            info!(
                batch = index + 1,
                of = total_batches,
                papers = batch.len(),
                "processing batch"
            );
            self.process_batch(resolver, batch, &mut summary);
            index += 1;
        }

        summary.batches = index;
        info!(
            processed = summary.processed,
            organized = summary.organized,
            undecided = summary.undecided,
            failed = summary.failed,
            batches = summary.batches,
            dry_run = resolver.is_dry_run(),
            "organize run complete"
        );
        crate::trace_time!(start, "process_todo_list", batches = summary.batches);
        summary
    }

    fn process_batch(
        &self,
        resolver: &mut CollectionResolver<'_>,
        mut batch: ClassificationBatch,
        summary: &mut Summary,
    ) {
        summary.processed += batch.len();

        let decisions = match self.classifier.classify(&batch, &self.taxonomy) {
            Ok(raw) => parse_decisions(&raw, batch.len()),
            Err(e) => {
                warn!(batch = batch.index, error = %e, "classifier failed, no decisions for batch");
                summary.undecided += batch.len();
                return;
            }
        };
        summary.undecided += batch.len() - decisions.len();

        for (index, decision) in &decisions {
            let Some(paper) = batch.papers.get_mut(*index) else {
                continue;
            };
            match self.apply_decision(resolver, paper, decision) {
                Ok(true) => summary.organized += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(key = %paper.key(), index, error = %e, "failed to file paper");
                    summary.failed += 1;
                }
            }
        }
    }

    /// Returns whether the paper was (or would be) filed anywhere
    fn apply_decision(
        &self,
        resolver: &mut CollectionResolver<'_>,
        paper: &mut Paper,
        decision: &Decision,
    ) -> Result<bool> {
        let mut targets: Vec<FolderKey> = Vec::new();
        let mut planned = false;

        for path in &decision.paths {
            match resolver.resolve_path(path) {
                Some(ResolvedFolder::Remote(key)) => {
                    if !targets.contains(&key) {
                        targets.push(key);
                    }
                }
                Some(ResolvedFolder::Placeholder(placeholder)) => {
                    debug!(path = %path, placeholder = %placeholder, "folder would be created");
                    planned = true;
                }
                None => debug!(key = %paper.key(), path = %path, "no folder for path"),
            }
        }

        if resolver.is_dry_run() {
            info!(
                key = %paper.key(),
                title = %paper.title(),
                paths = ?decision.paths,
                "[dry run] would file paper"
            );
            return Ok(planned || !targets.is_empty());
        }

        for key in &targets {
            if paper.item.in_folder(key) {
                debug!(key = %paper.key(), folder = %key, "already in folder");
                continue;
            }
            self.store.move_item_to_folder(key, &mut paper.item)?;
            info!(key = %paper.key(), folder = %key, "filed paper");
        }

        // A failed resolution leaves the paper untagged for the next run
        let declined = decision.paths.iter().all(|p| is_unclassified(p));
        if !targets.is_empty() || declined {
            self.store.add_tag(&mut paper.item, &self.processed_tag)?;
        }

        Ok(!targets.is_empty())
    }
}
