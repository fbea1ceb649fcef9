//! Command trait and context for dispatching commands

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::cli::Cli;
use zotsort_core::cache::PathCache;
use zotsort_core::config::OrganizerConfig;
use zotsort_core::error::{Result, ZotsortError};
use zotsort_core::remote::memory::Snapshot;
use zotsort_core::remote::{MemoryStore, ReferenceStore, RetryPolicy, ZoteroClient};
use zotsort_core::resolver::CollectionResolver;

/// Shared context for command execution
pub struct CommandContext<'a> {
    pub cli: &'a Cli,
    pub config: OrganizerConfig,
    pub start: Instant,
}

impl<'a> CommandContext<'a> {
    /// Discover the configuration and apply the global CLI overrides
    pub fn load(cli: &'a Cli, start: Instant) -> Result<Self> {
        let mut config = OrganizerConfig::discover(cli.config.as_deref())?;
        if cli.live {
            config.organizer.dry_run = false;
        }
        Ok(Self { cli, config, start })
    }

    pub fn dry_run(&self) -> bool {
        self.config.organizer.dry_run
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.config.retry)
    }

    /// The Zotero client, or an in-memory library when offline
    pub fn open_store(&self) -> Result<Box<dyn ReferenceStore>> {
        if let Some(path) = &self.cli.snapshot {
            let store = MemoryStore::from_snapshot(load_snapshot(path)?);
            info!(path = %path.display(), "using library snapshot");
            return Ok(Box::new(store));
        }
        if self.cli.is_offline() {
            debug!("offline, using empty in-memory library");
            return Ok(Box::new(MemoryStore::new()));
        }

        let zotero = self.config.require_zotero()?;
        Ok(Box::new(ZoteroClient::new(zotero, self.retry_policy())))
    }

    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(&self.config.organizer.cache_file)
    }

    /// The configured cache file. Offline runs read it but never write it back.
    pub fn load_cache(&self) -> PathCache {
        let cache = PathCache::load(&self.cache_path(), self.config.organizer.cache_keying);
        if self.cli.is_offline() {
            debug!(path = %self.cache_path().display(), "offline, cache changes stay in memory");
            return cache.detached();
        }
        cache
    }

    /// A resolver over `store` with the configured cache and policies
    pub fn resolver<'s>(&self, store: &'s dyn ReferenceStore) -> CollectionResolver<'s> {
        CollectionResolver::new(store, self.load_cache(), self.dry_run())
            .with_collision_policy(self.config.organizer.collision_policy)
    }
}

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content = fs::read_to_string(path)
        .map_err(|e| ZotsortError::io_operation("read snapshot", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| ZotsortError::InvalidInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Trait for commands that can be executed
pub trait Command {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// No-op command (when no subcommand is provided)
pub struct NoCommand;

impl NoCommand {
    pub fn execute(&self) -> Result<()> {
        println!("zotsort {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("File Zotero papers into collections and cluster reading-note keywords.");
        println!();
        println!("Run `zotsort --help` for usage information.");
        Ok(())
    }
}
