//! Union-find clustering of keywords into categories

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use super::corpus::KeywordStats;
use super::similarity::{PairScore, SimilarityScorer};
use crate::config::{ExpansionMode, KeywordConfig};

/// A category: keywords merged under one representative name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCluster {
    pub name: String,
    /// Sorted member keywords, including the representative
    pub members: Vec<String>,
    /// Sum of the members' frequencies
    pub frequency: usize,
}

/// Result of one clustering run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Clustering {
    /// Clusters by descending frequency, then name
    pub clusters: Vec<KeywordCluster>,
    /// Every category label attached to each keyword after expansion
    pub assignments: BTreeMap<String, BTreeSet<String>>,
    /// Unordered keyword pairs scored
    pub pairs_considered: usize,
    /// Unions that joined two distinct clusters
    pub merges: usize,
}

impl Clustering {
    /// Representative name of the base cluster containing `keyword`
    pub fn representative(&self, keyword: &str) -> Option<&str> {
        self.clusters
            .iter()
            .find(|c| c.members.iter().any(|m| m == keyword))
            .map(|c| c.name.as_str())
    }

    /// Keywords carrying more than one category label
    pub fn multi_category_keywords(&self) -> usize {
        self.assignments.values().filter(|c| c.len() > 1).count()
    }
}

/// Disjoint-set forest over keyword indices
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Returns false if both were already in the same set
    fn union(&mut self, i: usize, j: usize) -> bool {
        let (ri, rj) = (self.find(i), self.find(j));
        if ri == rj {
            return false;
        }
        self.parent[rj] = ri;
        true
    }
}

struct ScoredPair {
    a: usize,
    b: usize,
    score: PairScore,
}

pub struct ClusterBuilder<'s, 'c> {
    scorer: &'s SimilarityScorer<'c>,
    min_cluster_size: usize,
    expansion: ExpansionMode,
}

impl<'s, 'c> ClusterBuilder<'s, 'c> {
    pub fn new(scorer: &'s SimilarityScorer<'c>, config: &KeywordConfig) -> Self {
        Self {
            scorer,
            min_cluster_size: config.min_cluster_size.max(1),
            expansion: config.expansion,
        }
    }

    pub fn with_expansion(mut self, expansion: ExpansionMode) -> Self {
        self.expansion = expansion;
        self
    }

    pub fn build(&self) -> Clustering {
        let start = Instant::now();
        let corpus = self.scorer.corpus();
        let words: Vec<&KeywordStats> = corpus.keywords().collect();

        let pairs = self.candidate_pairs(&words);
        let pairs_considered = words.len() * words.len().saturating_sub(1) / 2;

        let mut forest = UnionFind::new(words.len());
        let merges = pairs
            .iter()
            .filter(|pair| forest.union(pair.a, pair.b))
            .count();

        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for index in 0..words.len() {
            groups.entry(forest.find(index)).or_default().push(index);
        }

        let mut clusters: Vec<KeywordCluster> = groups
            .into_values()
            .filter(|members| members.len() >= self.min_cluster_size)
            .map(|members| make_cluster(&words, &members))
            .collect();
        clusters.sort_by(|x, y| {
            y.frequency
                .cmp(&x.frequency)
                .then_with(|| x.name.cmp(&y.name))
        });

        let assignments = self.expand(&clusters);

        debug!(
            keywords = words.len(),
            candidate_pairs = pairs.len(),
            merges,
            clusters = clusters.len(),
            "clustered keywords"
        );
        crate::trace_time!(start, "cluster_keywords", pairs = pairs_considered);

        Clustering {
            clusters,
            assignments,
            pairs_considered,
            merges,
        }
    }

    /// Pairs passing the merge gate, best first; equal scores keep
    /// lexicographic pair order
    fn candidate_pairs(&self, words: &[&KeywordStats]) -> Vec<ScoredPair> {
        let mut pairs = Vec::new();
        for a in 0..words.len() {
            for b in (a + 1)..words.len() {
                let score = self.scorer.score(&words[a].text, &words[b].text);
                if self.scorer.passes_gate(&score) {
                    pairs.push(ScoredPair { a, b, score });
                }
            }
        }
        pairs.sort_by(|x, y| {
            y.score
                .composite
                .total_cmp(&x.score.composite)
                .then_with(|| (x.a, x.b).cmp(&(y.a, y.b)))
        });
        pairs
    }

    /// Attach base categories, then spread them across each document's keywords
    fn expand(&self, clusters: &[KeywordCluster]) -> BTreeMap<String, BTreeSet<String>> {
        let mut labels: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for cluster in clusters {
            for member in &cluster.members {
                labels
                    .entry(member.clone())
                    .or_default()
                    .insert(cluster.name.clone());
            }
        }

        let documents = self.scorer.corpus().documents();
        loop {
            let mut changed = false;
            for document in documents {
                let keywords: BTreeSet<&String> = document.keywords.iter().collect();
                let union: BTreeSet<String> = keywords
                    .iter()
                    .filter_map(|k| labels.get(*k))
                    .flatten()
                    .cloned()
                    .collect();
                if union.is_empty() {
                    continue;
                }
                for keyword in keywords {
                    let entry = labels.entry(keyword.clone()).or_default();
                    for label in &union {
                        changed |= entry.insert(label.clone());
                    }
                }
            }
            if self.expansion == ExpansionMode::SinglePass || !changed {
                break;
            }
        }

        labels
    }
}

/// Representative is the longest member, then the most frequent, then the
/// lexicographically smallest
fn make_cluster(words: &[&KeywordStats], members: &[usize]) -> KeywordCluster {
    let name = members
        .iter()
        .map(|&i| words[i])
        .max_by(|x, y| {
            x.text
                .chars()
                .count()
                .cmp(&y.text.chars().count())
                .then_with(|| x.frequency.cmp(&y.frequency))
                .then_with(|| y.text.cmp(&x.text))
        })
        .map(|w| w.text.clone())
        .unwrap_or_default();

    let mut names: Vec<String> = members.iter().map(|&i| words[i].text.clone()).collect();
    names.sort();

    KeywordCluster {
        name,
        members: names,
        frequency: members.iter().map(|&i| words[i].frequency).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::corpus::{Corpus, Document};

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

    fn cluster(corpus: &Corpus, config: &KeywordConfig) -> Clustering {
        let scorer = SimilarityScorer::new(corpus, config);
        ClusterBuilder::new(&scorer, config).build()
    }

    /// Two string-similar clusters linked through "basin"; "lstm" only
    /// reaches a category when expansion iterates
    fn bridged_corpus() -> Corpus {
        corpus(&[
            &["lstm", "basin"],
            &["basin", "streamflow"],
            &["basin", "evaporation"],
            &["streamflows"],
            &["evaporative"],
        ])
    }

    fn labels(clustering: &Clustering, keyword: &str) -> Vec<String> {
        clustering
            .assignments
            .get(keyword)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_union_find() {
        let mut forest = UnionFind::new(4);
        assert!(forest.union(0, 1));
        assert!(forest.union(2, 3));
        assert!(forest.union(1, 3));
        assert!(!forest.union(0, 2));
        assert_eq!(forest.find(0), forest.find(3));
    }

    #[test]
    fn test_similar_keywords_merge_and_dissimilar_do_not() {
        let pair: &[&str] = &["evapotranspiration", "transpiration"];
        let c = corpus(&[
            pair,
            pair,
            pair,
            pair,
            pair,
            &["flood"],
            &["flood"],
            &["drought"],
            &["drought"],
            &["groundwater"],
        ]);
        let result = cluster(&c, &KeywordConfig::default());

        assert_eq!(result.clusters.len(), 1);
        let merged = &result.clusters[0];
        assert_eq!(merged.name, "evapotranspiration");
        assert_eq!(merged.members, vec!["evapotranspiration", "transpiration"]);
        assert_eq!(merged.frequency, 10);
        assert_eq!(result.representative("flood"), None);
        assert_eq!(result.representative("drought"), None);
        assert_eq!(result.pairs_considered, 10);
    }

    #[test]
    fn test_representative_tie_breaks() {
        // Equal length: higher frequency wins
        let c = corpus(&[&["evaporative"], &["evaporative"], &["evaporation"], &["groundwater"]]);
        let result = cluster(&c, &KeywordConfig::default());
        assert_eq!(result.clusters[0].name, "evaporative");

        // Equal length and frequency: lexicographically smallest
        let result = cluster(&bridged_corpus(), &KeywordConfig::default());
        assert_eq!(result.representative("evaporative"), Some("evaporation"));
        assert_eq!(result.representative("streamflow"), Some("streamflows"));
    }

    #[test]
    fn test_single_pass_expansion() {
        let result = cluster(&bridged_corpus(), &KeywordConfig::default());

        assert_eq!(result.clusters.len(), 2);
        assert_eq!(labels(&result, "basin"), vec!["evaporation", "streamflows"]);
        assert_eq!(labels(&result, "evaporation"), vec!["evaporation", "streamflows"]);
        assert_eq!(labels(&result, "streamflow"), vec!["streamflows"]);
        assert!(labels(&result, "lstm").is_empty());
        assert_eq!(result.multi_category_keywords(), 2);
    }

    #[test]
    fn test_fixed_point_expansion_propagates_further() {
        let config = KeywordConfig {
            expansion: ExpansionMode::FixedPoint,
            ..KeywordConfig::default()
        };
        let result = cluster(&bridged_corpus(), &config);

        assert_eq!(labels(&result, "lstm"), vec!["evaporation", "streamflows"]);
        assert_eq!(labels(&result, "streamflow"), vec!["evaporation", "streamflows"]);
    }

    #[test]
    fn test_min_cluster_size_drops_small_clusters() {
        let config = KeywordConfig {
            min_cluster_size: 3,
            ..KeywordConfig::default()
        };
        let result = cluster(&bridged_corpus(), &config);
        assert!(result.clusters.is_empty());
        assert!(result.assignments.is_empty());
        assert_eq!(result.merges, 2);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let c = bridged_corpus();
        let first = cluster(&c, &KeywordConfig::default());
        let second = cluster(&c, &KeywordConfig::default());
        assert_eq!(first.clusters, second.clusters);
        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn test_raising_threshold_never_adds_merges() {
        let c = corpus(&[
            &["flash drought", "drought", "soil moisture"],
            &["flash droughts", "soil moisture", "evapotranspiration"],
            &["drought", "heatwave", "soil moisture"],
            &["flood", "flash flood", "early warning"],
            &["flash flood", "flood", "lstm"],
            &["evapotranspiration", "transpiration", "gpp"],
            &["transpiration", "gpp", "vegetation"],
        ]);

        let mut previous = usize::MAX;
        for step in 0..=10 {
            let config = KeywordConfig {
                merge_threshold: step as f64 / 10.0,
                ..KeywordConfig::default()
            };
            let merges = cluster(&c, &config).merges;
            assert!(merges <= previous, "threshold {} gave {} merges", step, merges);
            previous = merges;
        }
    }
}
