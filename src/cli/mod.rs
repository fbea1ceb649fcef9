//! CLI argument parsing for zotsort
//!
//! Global flags: --config, --format, --quiet, --verbose, --log-level,
//! --log-json, --live, --offline, --snapshot

pub mod cache;
pub mod format;
pub mod keywords;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use cache::CacheCommands;
pub use keywords::KeywordsCommands;
pub use zotsort_core::format::OutputFormat;

/// zotsort - file Zotero papers into collections and cluster note keywords
#[derive(Parser, Debug)]
#[command(name = "zotsort")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: $ZOTSORT_CONFIG, ./zotsort.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log filter, e.g. `debug` or `zotsort_core=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Perform remote writes (overrides `organizer.dry_run`)
    #[arg(long, global = true)]
    pub live: bool,

    /// Use an in-memory library instead of the Zotero API
    #[arg(long, global = true)]
    pub offline: bool,

    /// Seed the in-memory library from a JSON snapshot (implies --offline)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify tagged papers and file them into collections
    Organize {
        /// Papers per classifier request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Only process papers in this collection path
        #[arg(long)]
        target: Option<String>,
    },

    /// Resolve a collection path to its key, creating missing folders
    Resolve {
        /// Slash-separated path, e.g. "Extremes×Mechanisms/Flash Drought Dynamics"
        path: String,
    },

    /// Inspect or rebuild the collection path cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Cluster reading-note keywords into categories
    Keywords {
        #[command(subcommand)]
        command: KeywordsCommands,
    },

    /// Remove every tag not on the keep-list
    CleanTags {
        /// Tag to keep (can be specified multiple times; default from config)
        #[arg(long, action = clap::ArgAction::Append)]
        keep: Vec<String>,

        /// Only clean items of this type (can be specified multiple times)
        #[arg(long = "item-type", action = clap::ArgAction::Append)]
        item_types: Vec<String>,
    },
}

impl Cli {
    pub fn is_offline(&self) -> bool {
        self.offline || self.snapshot.is_some()
    }
}
