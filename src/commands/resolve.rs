//! `zotsort resolve` - map a collection path to its key

use crate::commands::dispatch::CommandContext;
use crate::commands::print_json;
use crate::output_by_format;
use zotsort_core::error::{Result, ZotsortError};
use zotsort_core::resolver::{is_unclassified, ResolvedFolder};

pub fn execute(ctx: &CommandContext, path: &str) -> Result<()> {
    let store = ctx.open_store()?;
    let mut resolver = ctx.resolver(store.as_ref());

    let resolved = resolver.resolve_path(path);
    let (key, placeholder) = match &resolved {
        Some(ResolvedFolder::Remote(key)) => (Some(key.as_str()), false),
        Some(ResolvedFolder::Placeholder(planned)) => (Some(planned.as_str()), true),
        None if is_unclassified(path) => (None, false),
        None => return Err(ZotsortError::not_found("collection path", path)),
    };

    output_by_format!(ctx.cli.format,
        json => print_json(&serde_json::json!({
            "path": path,
            "key": key,
            "placeholder": placeholder,
            "dry_run": ctx.dry_run(),
        })),
        human => {
            match key {
                Some(key) if placeholder => println!("{} (would be created)", key),
                Some(key) => println!("{}", key),
                None => println!("unclassified"),
            }
        }
    )
}
