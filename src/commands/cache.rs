//! `zotsort cache` commands - inspect and rebuild the path cache

use std::collections::BTreeMap;

use crate::commands::dispatch::CommandContext;
use crate::commands::print_json;
use crate::output_by_format;
use zotsort_core::cache::CacheEntry;
use zotsort_core::error::Result;

/// Execute the show command
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let cache = ctx.load_cache();
    let path = ctx.cache_path();
    let entries: BTreeMap<&String, &CacheEntry> = cache.iter().collect();

    output_by_format!(ctx.cli.format,
        json => print_json(&serde_json::json!({
            "file": path.display().to_string(),
            "needs_rebuild": cache.needs_rebuild(),
            "entries": entries,
        })),
        human => {
            if cache.is_empty() {
                println!("Cache {} is empty", path.display());
            } else {
                println!("Cache {} ({} entries)", path.display(), cache.len());
                for (name, entry) in cache.iter() {
                    match &entry.parent {
                        Some(parent) => println!("  {} -> {} (parent {})", name, entry.key, parent),
                        None => println!("  {} -> {}", name, entry.key),
                    }
                }
            }
        }
    )
}

/// Execute the refresh command
pub fn execute_refresh(ctx: &CommandContext) -> Result<()> {
    let store = ctx.open_store()?;
    let mut cache = ctx.load_cache();
    cache.reload(store.as_ref())?;

    let saved = cache.file().is_some();

    output_by_format!(ctx.cli.format,
        json => print_json(&serde_json::json!({
            "file": ctx.cache_path().display().to_string(),
            "entries": cache.len(),
            "saved": saved,
        })),
        human => {
            if !ctx.cli.quiet {
                if saved {
                    println!("Rebuilt {} with {} folders", ctx.cache_path().display(), cache.len());
                } else {
                    println!(
                        "Listed {} folders offline, {} left unchanged",
                        cache.len(),
                        ctx.cache_path().display()
                    );
                }
            }
        }
    )
}
