//! Configuration for zotsort
//!
//! Configuration is a TOML file. Lookup order: an explicit path, the
//! `ZOTSORT_CONFIG` environment variable, `./zotsort.toml`, then
//! `<config dir>/zotsort/config.toml`. A missing file yields the defaults.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::bail_invalid;
use crate::error::{Result, ZotsortError};

pub use types::{
    CacheKeying, ClassifierConfig, CollisionPolicy, ExpansionMode, KeywordConfig, LibraryType,
    OrganizeConfig, OrganizerConfig, RetryConfig, TagCleanConfig, ZoteroConfig,
};

const CONFIG_DIR: &str = "zotsort";
const CONFIG_FILE: &str = "config.toml";
const LOCAL_CONFIG_FILE: &str = "zotsort.toml";
const CONFIG_PATH_ENV_VAR: &str = "ZOTSORT_CONFIG";

impl OrganizerConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ZotsortError::io_operation("read config", path.display(), e))?;
        let config: OrganizerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ZotsortError::Other(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| ZotsortError::io_operation("write config", path.display(), e))?;
        Ok(())
    }

    /// Find and load the configuration, then apply environment overrides.
    ///
    /// An explicit path must exist; the implicit locations are optional.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) if !path.is_file() => {
                return Err(ZotsortError::MissingConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Self::load(path)?,
            None => match Self::implicit_path() {
                Some(path) => {
                    debug!(path = %path.display(), "loading config");
                    Self::load(&path)?
                }
                None => {
                    debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_with(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn implicit_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV_VAR) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
            .filter(|path| path.is_file())
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// Secrets are usually kept out of the file and passed this way.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ZOTSORT_ZOTERO_API_KEY").filter(|v| !v.is_empty()) {
            self.zotero.api_key = key;
        }
        if let Some(id) = lookup("ZOTSORT_LIBRARY_ID").filter(|v| !v.is_empty()) {
            self.zotero.library_id = id;
        }
        if let Some(key) = lookup("ZOTSORT_CLASSIFIER_API_KEY").filter(|v| !v.is_empty()) {
            self.classifier.api_key = key;
        }
        if let Some(value) = lookup("ZOTSORT_DRY_RUN") {
            match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.organizer.dry_run = true,
                "0" | "false" | "no" => self.organizer.dry_run = false,
                other => debug!(value = other, "ignoring unrecognized ZOTSORT_DRY_RUN"),
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.organizer.batch_size == 0 {
            bail_invalid!("organizer.batch_size", self.organizer.batch_size);
        }
        if self.zotero.page_size == 0 || self.zotero.page_size > 100 {
            bail_invalid!("zotero.page_size (1-100)", self.zotero.page_size);
        }
        if self.retry.max_attempts == 0 {
            bail_invalid!("retry.max_attempts", self.retry.max_attempts);
        }

        let unit_values = [
            ("keywords.merge_threshold", self.keywords.merge_threshold),
            ("keywords.string_threshold", self.keywords.string_threshold),
            ("keywords.string_weight", self.keywords.string_weight),
            ("keywords.semantic_weight", self.keywords.semantic_weight),
            ("keywords.cooccurrence_weight", self.keywords.cooccurrence_weight),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                bail_invalid!(name, value);
            }
        }

        if self.keywords.min_cluster_size == 0 {
            bail_invalid!("keywords.min_cluster_size", 0);
        }

        Ok(())
    }

    /// Zotero settings, failing if the credentials are incomplete
    pub fn require_zotero(&self) -> Result<&ZoteroConfig> {
        if self.zotero.library_id.trim().is_empty() {
            return Err(ZotsortError::MissingConfig("zotero.library_id".to_string()));
        }
        if self.zotero.api_key.trim().is_empty() {
            return Err(ZotsortError::MissingConfig("zotero.api_key".to_string()));
        }
        Ok(&self.zotero)
    }

    /// Classifier settings, failing if no API key is configured
    pub fn require_classifier(&self) -> Result<&ClassifierConfig> {
        if self.classifier.api_key.trim().is_empty() {
            return Err(ZotsortError::MissingConfig(
                "classifier.api_key".to_string(),
            ));
        }
        Ok(&self.classifier)
    }
}

impl OrganizeConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}
