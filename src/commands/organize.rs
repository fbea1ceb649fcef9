//! `zotsort organize` - classify tagged papers and file them

use tracing::{debug, info};

use crate::commands::dispatch::CommandContext;
use crate::commands::print_json;
use crate::output_by_format;
use zotsort_core::bail_usage;
use zotsort_core::classify::GeminiClassifier;
use zotsort_core::error::{Result, ZotsortError};
use zotsort_core::organizer::{build_todo_list, Organizer, Summary};

pub fn execute(ctx: &CommandContext, batch_size: Option<usize>, target: Option<&str>) -> Result<()> {
    if batch_size == Some(0) {
        bail_usage!("--batch-size must be at least 1");
    }

    let config = &ctx.config;
    let classifier = GeminiClassifier::new(config.require_classifier()?, ctx.retry_policy());
    let store = ctx.open_store()?;
    let mut resolver = ctx.resolver(store.as_ref());

    let target = target.or(config.organizer.target_collection.as_deref());
    let folder = match target {
        Some(path) => {
            let key = resolver
                .find_existing(path)
                .ok_or_else(|| ZotsortError::not_found("collection", path))?;
            debug!(path, key = %key, "limiting to collection");
            Some(key)
        }
        None => None,
    };

    let papers = build_todo_list(store.as_ref(), config, folder.as_ref())?;
    let mut organizer = Organizer::new(store.as_ref(), &classifier, config);
    if let Some(size) = batch_size {
        organizer = organizer.with_batch_size(size);
    }

    info!(
        papers = papers.len(),
        batch_size = organizer.batch_size(),
        dry_run = ctx.dry_run(),
        "organizing"
    );
    let summary = organizer.process_todo_list(&mut resolver, papers);

    output_by_format!(ctx.cli.format,
        json => print_json(&serde_json::json!({
            "dry_run": ctx.dry_run(),
            "summary": summary,
            "planned_folders": resolver.planned_folders().collect::<Vec<_>>(),
        })),
        human => {
            if !ctx.cli.quiet {
                print_human(&summary, ctx.dry_run());
                for planned in resolver.planned_folders() {
                    println!("  would create {}", planned);
                }
            }
        }
    )
}

fn print_human(summary: &Summary, dry_run: bool) {
    let mode = if dry_run { " (dry run)" } else { "" };
    println!(
        "Processed {} papers in {} batches{}",
        summary.processed, summary.batches, mode
    );
    println!("  organized: {}", summary.organized);
    println!("  undecided: {}", summary.undecided);
    println!("  failed:    {}", summary.failed);
}
