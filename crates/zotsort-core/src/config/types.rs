//! Configuration type definitions

use serde::{Deserialize, Serialize};

/// Top-level configuration, stored as TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Zotero Web API access
    #[serde(default)]
    pub zotero: ZoteroConfig,

    /// Language model used for classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Batch organizing behavior
    #[serde(default)]
    pub organizer: OrganizeConfig,

    /// Keyword extraction and clustering
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Retry policy for remote calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Tag cleaner
    #[serde(default)]
    pub tags: TagCleanConfig,
}

/// Zotero library type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

impl LibraryType {
    /// URL path segment for this library type
    pub fn path_segment(&self) -> &'static str {
        match self {
            LibraryType::User => "users",
            LibraryType::Group => "groups",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoteroConfig {
    /// Numeric library ID (user ID or group ID)
    #[serde(default)]
    pub library_id: String,

    #[serde(default)]
    pub library_type: LibraryType,

    /// API key with read and write access
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(default = "default_zotero_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Items requested per page when listing
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ZoteroConfig {
    fn default() -> Self {
        Self {
            library_id: String::new(),
            library_type: LibraryType::default(),
            api_key: String::new(),
            base_url: default_zotero_base_url(),
            timeout_seconds: default_timeout_seconds(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_classifier_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Preferred collection paths offered to the model
    #[serde(default = "default_taxonomy")]
    pub taxonomy: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            endpoint: default_classifier_endpoint(),
            timeout_seconds: default_classifier_timeout_seconds(),
            taxonomy: default_taxonomy(),
        }
    }
}

/// How the path cache is keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKeying {
    /// Keyed by bare display name; same-named folders collide
    #[default]
    Name,
    /// Keyed by full slash-joined path; no collisions
    FullPath,
}

/// What the resolver does when a cached name has an unexpected parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Warn and keep using the cached folder
    #[default]
    ReuseWithWarning,
    /// Create a new folder under the expected parent
    CreateDistinct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeConfig {
    /// Simulate every mutating remote operation
    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Tag added to papers once they have been filed
    #[serde(default = "default_processed_tag")]
    pub processed_tag: String,

    /// Tag marking papers that already carry a reading note
    #[serde(default = "default_source_tag")]
    pub source_tag: String,

    /// Only process papers inside this collection path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_collection: Option<String>,

    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    #[serde(default)]
    pub cache_keying: CacheKeying,

    #[serde(default)]
    pub collision_policy: CollisionPolicy,

    /// Pause between classifier batches
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            batch_size: default_batch_size(),
            processed_tag: default_processed_tag(),
            source_tag: default_source_tag(),
            target_collection: None,
            cache_file: default_cache_file(),
            cache_keying: CacheKeying::default(),
            collision_policy: CollisionPolicy::default(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

/// Whether category expansion runs once or until nothing changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpansionMode {
    #[default]
    SinglePass,
    FixedPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Only notes whose title contains this text are analyzed (empty = all)
    #[serde(default = "default_note_title")]
    pub note_title: String,

    #[serde(default = "default_min_keyword_len")]
    pub min_keyword_len: usize,

    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,

    /// Composite score needed to merge two keywords
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f64,

    /// String similarity that merges regardless of the composite score
    #[serde(default = "default_string_threshold")]
    pub string_threshold: f64,

    #[serde(default = "default_string_weight")]
    pub string_weight: f64,

    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,

    #[serde(default = "default_cooccurrence_weight")]
    pub cooccurrence_weight: f64,

    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    #[serde(default)]
    pub expansion: ExpansionMode,

    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            note_title: default_note_title(),
            min_keyword_len: default_min_keyword_len(),
            stopwords: default_stopwords(),
            merge_threshold: default_merge_threshold(),
            string_threshold: default_string_threshold(),
            string_weight: default_string_weight(),
            semantic_weight: default_semantic_weight(),
            cooccurrence_weight: default_cooccurrence_weight(),
            min_cluster_size: default_min_cluster_size(),
            expansion: ExpansionMode::default(),
            top_n: default_top_n(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCleanConfig {
    /// Tags that survive cleaning (case-sensitive)
    #[serde(default = "default_keep_tags")]
    pub keep: Vec<String>,

    /// Only clean items of these types (empty = all)
    #[serde(default)]
    pub item_types: Vec<String>,
}

impl Default for TagCleanConfig {
    fn default() -> Self {
        Self {
            keep: default_keep_tags(),
            item_types: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_zotero_base_url() -> String {
    "https://api.zotero.org".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_page_size() -> usize {
    100
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_classifier_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_classifier_timeout_seconds() -> u64 {
    120
}

fn default_taxonomy() -> Vec<String> {
    [
        "Extremes×Mechanisms/Flash Drought Dynamics",
        "Extremes×Mechanisms/DFA×Land-Atmosphere",
        "Extremes×Mechanisms/Flood Early Warning",
        "AI×Hydrology Applications/Physics-Informed ML",
        "AI×Hydrology Applications/Deep Learning for Extremes",
        "AI×Hydrology Applications/Hybrid Modeling",
        "Data×Uncertainty/Triple Collocation & QA",
        "Data×Uncertainty/Multi-Source Fusion",
        "Data×Uncertainty/Satellite×In-situ Integration",
        "Vegetation×Water Coupling/VOD×Plant Hydraulics",
        "Vegetation×Water Coupling/ET×GPP Coupling",
        "Vegetation×Water Coupling/Drought×Vegetation Response",
        "Global Products×Datasets/GRACE×Water Storage",
        "Global Products×Datasets/ET Product Intercomparison",
        "Global Products×Datasets/Precipitation Products",
        "Reviews×Synthesis/Methodology Reviews",
        "Reviews×Synthesis/Domain Reviews",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_batch_size() -> usize {
    5
}

fn default_processed_tag() -> String {
    "auto_organized".to_string()
}

fn default_source_tag() -> String {
    "gemini_read".to_string()
}

fn default_cache_file() -> String {
    "collections_cache.json".to_string()
}

fn default_batch_delay_ms() -> u64 {
    3000
}

fn default_note_title() -> String {
    "AI 深度阅读报告".to_string()
}

fn default_min_keyword_len() -> usize {
    2
}

pub(crate) fn default_stopwords() -> Vec<String> {
    [
        "tags", "tag", "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
        "with", "by", "from", "as", "is", "are", "was", "were", "be", "been", "being", "have",
        "has", "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
        "must", "can", "this", "that", "these", "those",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_merge_threshold() -> f64 {
    0.6
}

fn default_string_threshold() -> f64 {
    0.8
}

fn default_string_weight() -> f64 {
    0.5
}

fn default_semantic_weight() -> f64 {
    0.3
}

fn default_cooccurrence_weight() -> f64 {
    0.3
}

fn default_min_cluster_size() -> usize {
    2
}

fn default_top_n() -> usize {
    20
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_keep_tags() -> Vec<String> {
    ["精读", "重要", "可行", "参考"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
