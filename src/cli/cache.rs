//! Cache subcommands for the collection path cache

use clap::Subcommand;

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List cached collection paths and their keys
    Show,

    /// Rebuild the cache from a full collection listing
    Refresh,
}
