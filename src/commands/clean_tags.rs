//! `zotsort clean-tags` - strip tags outside the keep-list

use crate::commands::dispatch::CommandContext;
use crate::commands::print_json;
use crate::output_by_format;
use zotsort_core::error::Result;
use zotsort_core::organizer::clean_tags;

pub fn execute(ctx: &CommandContext, keep: &[String], item_types: &[String]) -> Result<()> {
    let config = &ctx.config.tags;
    let keep = if keep.is_empty() { &config.keep[..] } else { keep };
    let item_types = if item_types.is_empty() {
        &config.item_types[..]
    } else {
        item_types
    };

    let store = ctx.open_store()?;
    let summary = clean_tags(store.as_ref(), keep, item_types, ctx.dry_run())?;

    output_by_format!(ctx.cli.format,
        json => print_json(&serde_json::json!({
            "dry_run": ctx.dry_run(),
            "keep": keep,
            "summary": summary,
        })),
        human => {
            if !ctx.cli.quiet {
                let verb = if ctx.dry_run() { "Would clean" } else { "Cleaned" };
                println!(
                    "{} {} of {} items ({} skipped, {} failed)",
                    verb, summary.cleaned, summary.processed, summary.skipped, summary.failed
                );
            }
        }
    )
}
