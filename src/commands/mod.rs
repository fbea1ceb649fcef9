//! CLI commands for zotsort

pub mod cache;
pub mod clean_tags;
pub mod dispatch;
pub mod keywords;
pub mod organize;
pub mod resolve;

use serde::Serialize;
use zotsort_core::error::Result;

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
