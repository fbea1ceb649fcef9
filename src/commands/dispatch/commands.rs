//! Command implementations for all zotsort commands

use crate::cli::{CacheCommands, Commands, KeywordsCommands};
use crate::commands::dispatch::command::{Command, CommandContext};
use crate::commands::{cache, clean_tags, keywords, organize, resolve};
use zotsort_core::error::Result;

impl Command for Commands {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let result = match self {
            Commands::Organize { batch_size, target } => {
                organize::execute(ctx, *batch_size, target.as_deref())
            }
            Commands::Resolve { path } => resolve::execute(ctx, path),
            Commands::Cache { command } => match command {
                CacheCommands::Show => cache::execute_show(ctx),
                CacheCommands::Refresh => cache::execute_refresh(ctx),
            },
            Commands::Keywords { command } => match command {
                KeywordsCommands::Analyze { input, output_dir } => {
                    keywords::execute_analyze(ctx, input.as_deref(), output_dir)
                }
                KeywordsCommands::Top { input, limit } => {
                    keywords::execute_top(ctx, input.as_deref(), *limit)
                }
            },
            Commands::CleanTags { keep, item_types } => {
                clean_tags::execute(ctx, keep, item_types)
            }
        };
        tracing::debug!(elapsed = ?ctx.start.elapsed(), "execute_command");
        result
    }
}
