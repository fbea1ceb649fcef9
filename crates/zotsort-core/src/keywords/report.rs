//! Category reports and merged keyword rankings

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::cluster::Clustering;
use super::corpus::Corpus;
use crate::error::{Result, ZotsortError};

pub const CATEGORIES_FILE: &str = "keyword_categories.json";
pub const STATISTICS_FILE: &str = "keyword_statistics.json";
pub const REPORT_FILE: &str = "keyword_report.txt";

const RULE: &str = "======================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------------";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatistics {
    pub total_items: usize,
    pub total_unique_keywords: usize,
    pub total_categories: usize,
    pub keywords_per_category: BTreeMap<String, usize>,
    pub multi_category_keywords: usize,
    pub total_cooccurrences: usize,
    pub generated_at: DateTime<Utc>,
}

/// Categories, per-keyword labels and summary statistics of one analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub categories: BTreeMap<String, Vec<String>>,
    pub keyword_assignments: BTreeMap<String, Vec<String>>,
    pub statistics: CategoryStatistics,
}

impl CategoryReport {
    pub fn new(corpus: &Corpus, clustering: &Clustering) -> Self {
        let categories: BTreeMap<String, Vec<String>> = clustering
            .clusters
            .iter()
            .map(|c| (c.name.clone(), c.members.clone()))
            .collect();
        let keyword_assignments: BTreeMap<String, Vec<String>> = clustering
            .assignments
            .iter()
            .map(|(keyword, labels)| (keyword.clone(), labels.iter().cloned().collect()))
            .collect();

        let statistics = CategoryStatistics {
            total_items: corpus.len(),
            total_unique_keywords: corpus.vocabulary_size(),
            total_categories: categories.len(),
            keywords_per_category: categories
                .iter()
                .map(|(name, members)| (name.clone(), members.len()))
                .collect(),
            multi_category_keywords: clustering.multi_category_keywords(),
            total_cooccurrences: corpus.total_cooccurrences(),
            generated_at: Utc::now(),
        };

        Self {
            categories,
            keyword_assignments,
            statistics,
        }
    }

    /// Plain text report: statistics, categories by size, multi-label keywords
    pub fn render_text(&self) -> String {
        let stats = &self.statistics;
        let mut out = String::new();

        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Keyword Category Report");
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Generated: {}", stats.generated_at.to_rfc3339());
        let _ = writeln!(out);
        let _ = writeln!(out, "Statistics");
        let _ = writeln!(out, "{}", THIN_RULE);
        let _ = writeln!(out, "Items:                   {}", stats.total_items);
        let _ = writeln!(out, "Unique keywords:         {}", stats.total_unique_keywords);
        let _ = writeln!(out, "Categories:              {}", stats.total_categories);
        let _ = writeln!(out, "Multi-category keywords: {}", stats.multi_category_keywords);
        let _ = writeln!(out, "Co-occurring pairs:      {}", stats.total_cooccurrences);
        let _ = writeln!(out);

        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Categories");
        let _ = writeln!(out, "{}", RULE);
        let mut categories: Vec<(&String, &Vec<String>)> = self.categories.iter().collect();
        categories.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));
        for (i, (name, members)) in categories.iter().enumerate() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}. {} ({} keywords)", i + 1, name, members.len());
            let _ = writeln!(out, "{}", THIN_RULE);
            for member in members.iter() {
                match self.keyword_assignments.get(member) {
                    Some(labels) if labels.len() > 1 => {
                        let _ = writeln!(out, "   - {} [also: {}]", member, labels.join(", "));
                    }
                    _ => {
                        let _ = writeln!(out, "   - {}", member);
                    }
                }
            }
        }

        let mut multi: Vec<(&String, &Vec<String>)> = self
            .keyword_assignments
            .iter()
            .filter(|(_, labels)| labels.len() > 1)
            .collect();
        if !multi.is_empty() {
            multi.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", RULE);
            let _ = writeln!(out, "Multi-category keywords");
            let _ = writeln!(out, "{}", RULE);
            for (keyword, labels) in multi {
                let _ = writeln!(out, "- {}: {}", keyword, labels.join(", "));
            }
        }

        out
    }

    /// Write the three report files into `dir`, creating it if needed
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)
            .map_err(|e| ZotsortError::io_operation("create report directory", dir.display(), e))?;

        #[derive(Serialize)]
        struct CategoriesFile<'a> {
            categories: &'a BTreeMap<String, Vec<String>>,
            keyword_assignments: &'a BTreeMap<String, Vec<String>>,
            statistics: &'a CategoryStatistics,
        }

        let categories = serde_json::to_string_pretty(&CategoriesFile {
            categories: &self.categories,
            keyword_assignments: &self.keyword_assignments,
            statistics: &self.statistics,
        })?;
        let statistics = serde_json::to_string_pretty(&self.statistics)?;

        let outputs = [
            (CATEGORIES_FILE, categories),
            (STATISTICS_FILE, statistics),
            (REPORT_FILE, self.render_text()),
        ];

        let mut written = Vec::with_capacity(outputs.len());
        for (name, content) in outputs {
            let path = dir.join(name);
            fs::write(&path, content)
                .map_err(|e| ZotsortError::io_operation("write report", path.display(), e))?;
            written.push(path);
        }

        info!(dir = %dir.display(), files = written.len(), "wrote keyword reports");
        Ok(written)
    }
}

/// A keyword with its frequency after merging through the cluster map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedKeyword {
    pub keyword: String,
    pub frequency: usize,
    /// Keywords folded into this entry, the entry itself included
    pub merged: Vec<String>,
}

/// Most frequent keywords once clustered keywords count toward their
/// representative. Ties sort by name.
pub fn top_keywords(corpus: &Corpus, clustering: &Clustering, n: usize) -> Vec<RankedKeyword> {
    let mut merged: BTreeMap<String, RankedKeyword> = BTreeMap::new();

    for stats in corpus.keywords() {
        let target = clustering
            .representative(&stats.text)
            .unwrap_or(stats.text.as_str())
            .to_string();
        let entry = merged.entry(target.clone()).or_insert_with(|| RankedKeyword {
            keyword: target,
            frequency: 0,
            merged: Vec::new(),
        });
        entry.frequency += stats.frequency;
        entry.merged.push(stats.text.clone());
    }

    let mut ranked: Vec<RankedKeyword> = merged.into_values().collect();
    ranked.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordConfig;
    use crate::keywords::cluster::ClusterBuilder;
    use crate::keywords::corpus::Document;
    use crate::keywords::similarity::SimilarityScorer;
    use tempfile::tempdir;

    fn corpus(docs: &[&[&str]]) -> Corpus {
        Corpus::new(
            docs.iter()
                .enumerate()
                .map(|(i, keywords)| Document {
                    key: format!("P{}", i),
                    title: String::new(),
                    keywords: keywords.iter().map(|k| k.to_string()).collect(),
                })
                .collect(),
        )
    }

    fn sample() -> (Corpus, Clustering) {
        let c = corpus(&[
            &["lstm", "basin"],
            &["basin", "streamflow"],
            &["basin", "evaporation"],
            &["streamflows"],
            &["evaporative"],
        ]);
        let config = KeywordConfig::default();
        let clustering = {
            let scorer = SimilarityScorer::new(&c, &config);
            ClusterBuilder::new(&scorer, &config).build()
        };
        (c, clustering)
    }

    #[test]
    fn test_report_statistics() {
        let (c, clustering) = sample();
        let report = CategoryReport::new(&c, &clustering);

        assert_eq!(report.statistics.total_items, 5);
        assert_eq!(report.statistics.total_unique_keywords, 6);
        assert_eq!(report.statistics.total_categories, clustering.clusters.len());
        assert_eq!(report.statistics.total_cooccurrences, 3);
        assert_eq!(
            report.statistics.keywords_per_category.values().sum::<usize>(),
            report.categories.values().map(Vec::len).sum::<usize>()
        );
        assert_eq!(
            report.statistics.multi_category_keywords,
            clustering.multi_category_keywords()
        );
    }

    #[test]
    fn test_write_reports() {
        let (c, clustering) = sample();
        let report = CategoryReport::new(&c, &clustering);
        let dir = tempdir().unwrap();
        let out = dir.path().join("reports");

        let written = report.write_to(&out).unwrap();
        assert_eq!(written.len(), 3);
        for name in [CATEGORIES_FILE, STATISTICS_FILE, REPORT_FILE] {
            assert!(out.join(name).exists(), "{} missing", name);
        }

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(CATEGORIES_FILE)).unwrap())
                .unwrap();
        assert!(json["categories"].is_object());
        assert!(json["keyword_assignments"].is_object());
        assert_eq!(json["statistics"]["total_items"], 5);

        let text = fs::read_to_string(out.join(REPORT_FILE)).unwrap();
        assert!(text.contains("Keyword Category Report"));
        assert!(text.contains("Unique keywords:         6"));
    }

    #[test]
    fn test_render_lists_multi_category_keywords() {
        let (c, clustering) = sample();
        let report = CategoryReport::new(&c, &clustering);
        let text = report.render_text();
        if report.statistics.multi_category_keywords > 0 {
            assert!(text.contains("Multi-category keywords\n"));
        }
        for name in report.categories.keys() {
            assert!(text.contains(name.as_str()));
        }
    }

    #[test]
    fn test_top_keywords_merges_through_representative() {
        let (c, clustering) = sample();
        let top = top_keywords(&c, &clustering, 20);

        let total: usize = top.iter().map(|k| k.frequency).sum();
        assert_eq!(total, 8);

        for cluster in &clustering.clusters {
            let entry = top.iter().find(|k| k.keyword == cluster.name).unwrap();
            assert_eq!(entry.frequency, cluster.frequency);
            assert_eq!(entry.merged, cluster.members);
        }

        for pair in top.windows(2) {
            assert!(
                pair[0].frequency > pair[1].frequency
                    || (pair[0].frequency == pair[1].frequency && pair[0].keyword < pair[1].keyword)
            );
        }
    }

    #[test]
    fn test_top_keywords_without_clusters_and_truncation() {
        let c = corpus(&[&["drought", "flood"], &["drought"], &["heatwave", "flood"], &["drought"]]);
        let clustering = Clustering::default();
        let top = top_keywords(&c, &clustering, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].keyword, "drought");
        assert_eq!(top[0].frequency, 3);
        assert_eq!(top[1].keyword, "flood");
        assert_eq!(top[1].frequency, 2);
        assert!(top_keywords(&c, &clustering, 0).is_empty());
    }
}
