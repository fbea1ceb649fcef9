//! `zotsort keywords` commands - cluster reading-note keywords

use std::path::Path;

use crate::commands::dispatch::CommandContext;
use crate::commands::print_json;
use crate::output_by_format;
use zotsort_core::error::Result;
use zotsort_core::keywords::{
    analyze, fetch_documents, load_documents, Document, KeywordAnalysis, KeywordNormalizer,
};

/// Documents from `input`, or from the library's reading notes
fn collect_documents(ctx: &CommandContext, input: Option<&Path>) -> Result<Vec<Document>> {
    let config = &ctx.config.keywords;
    let normalizer = KeywordNormalizer::from_config(config);
    match input {
        Some(path) => load_documents(path, &normalizer),
        None => {
            let store = ctx.open_store()?;
            fetch_documents(store.as_ref(), &config.note_title, &normalizer)
        }
    }
}

fn run_analysis(ctx: &CommandContext, input: Option<&Path>) -> Result<KeywordAnalysis> {
    let documents = collect_documents(ctx, input)?;
    Ok(analyze(documents, &ctx.config.keywords))
}

/// Execute the analyze command
pub fn execute_analyze(ctx: &CommandContext, input: Option<&Path>, output_dir: &Path) -> Result<()> {
    let analysis = run_analysis(ctx, input)?;
    let report = analysis.report();
    let written = report.write_to(output_dir)?;

    output_by_format!(ctx.cli.format,
        json => print_json(&serde_json::json!({
            "files": written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "statistics": report.statistics,
            "categories": report.categories,
        })),
        human => {
            if !ctx.cli.quiet {
                let stats = &report.statistics;
                println!(
                    "{} papers, {} keywords, {} categories",
                    stats.total_items, stats.total_unique_keywords, stats.total_categories
                );
                for path in &written {
                    println!("  wrote {}", path.display());
                }
            }
        }
    )
}

/// Execute the top command
pub fn execute_top(ctx: &CommandContext, input: Option<&Path>, limit: Option<usize>) -> Result<()> {
    let analysis = run_analysis(ctx, input)?;
    let top = analysis.top(limit.unwrap_or(ctx.config.keywords.top_n));

    output_by_format!(ctx.cli.format,
        json => print_json(&top),
        human => {
            for (rank, ranked) in top.iter().enumerate() {
                if ranked.merged.len() <= 1 {
                    println!("{:>3}. {} ({})", rank + 1, ranked.keyword, ranked.frequency);
                } else {
                    println!(
                        "{:>3}. {} ({}) [{}]",
                        rank + 1,
                        ranked.keyword,
                        ranked.frequency,
                        ranked.merged.join(", ")
                    );
                }
            }
        }
    )
}
