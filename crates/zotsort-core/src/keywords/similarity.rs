//! Pairwise keyword similarity
//!
//! Three signals, each in `[0, 1]`:
//! - string similarity from the Levenshtein distance,
//! - semantic similarity from TF-IDF vectors of the documents the keywords
//!   appear in,
//! - co-occurrence strength, log-scaled and saturating at nine shared
//!   documents.

use std::collections::HashMap;

use super::corpus::Corpus;
use crate::config::KeywordConfig;

/// Edit distance over Unicode scalar values
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// `1 - distance / longer length`; 0.0 when either side is empty
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// `min(1, ln(count + 1) / ln 10)`
pub fn cooccurrence_similarity(count: usize) -> f64 {
    ((count as f64 + 1.0).ln() / 10f64.ln()).min(1.0)
}

/// TF-IDF vector per document
#[derive(Debug, Clone)]
pub struct TfIdf {
    vectors: Vec<HashMap<String, f64>>,
    norms: Vec<f64>,
}

impl TfIdf {
    /// tf = count / max count in the document; idf = ln(N / (df + 1))
    pub fn build(corpus: &Corpus) -> Self {
        let total = corpus.len() as f64;
        let mut vectors = Vec::with_capacity(corpus.len());
        let mut norms = Vec::with_capacity(corpus.len());

        for document in corpus.documents() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for keyword in &document.keywords {
                *counts.entry(keyword.as_str()).or_insert(0) += 1;
            }
            let max_count = counts.values().copied().max().unwrap_or(1) as f64;

            let vector: HashMap<String, f64> = counts
                .into_iter()
                .map(|(term, count)| {
                    let df = corpus.stats(term).map_or(0, |s| s.documents.len()) as f64;
                    let idf = (total / (df + 1.0)).ln();
                    (term.to_string(), (count as f64 / max_count) * idf)
                })
                .collect();

            norms.push(vector.values().map(|w| w * w).sum::<f64>().sqrt());
            vectors.push(vector);
        }

        Self { vectors, norms }
    }

    /// Cosine similarity of two documents; 0.0 if either vector is zero
    pub fn cosine(&self, i: usize, j: usize) -> f64 {
        let (norm_i, norm_j) = (self.norms[i], self.norms[j]);
        if norm_i == 0.0 || norm_j == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.vectors[i].len() <= self.vectors[j].len() {
            (&self.vectors[i], &self.vectors[j])
        } else {
            (&self.vectors[j], &self.vectors[i])
        };
        let dot: f64 = small
            .iter()
            .filter_map(|(term, w)| large.get(term).map(|v| w * v))
            .sum();
        dot / (norm_i * norm_j)
    }
}

/// Weights of the three signals in the composite score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub string: f64,
    pub semantic: f64,
    pub cooccurrence: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            string: 0.5,
            semantic: 0.3,
            cooccurrence: 0.3,
        }
    }
}

/// All scores for one keyword pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    pub string: f64,
    pub semantic: f64,
    pub cooccurrence: f64,
    pub composite: f64,
}

pub struct SimilarityScorer<'a> {
    corpus: &'a Corpus,
    tfidf: TfIdf,
    weights: Weights,
    merge_threshold: f64,
    string_threshold: f64,
}

impl<'a> SimilarityScorer<'a> {
    pub fn new(corpus: &'a Corpus, config: &KeywordConfig) -> Self {
        Self {
            corpus,
            tfidf: TfIdf::build(corpus),
            weights: Weights {
                string: config.string_weight,
                semantic: config.semantic_weight,
                cooccurrence: config.cooccurrence_weight,
            },
            merge_threshold: config.merge_threshold,
            string_threshold: config.string_threshold,
        }
    }

    pub fn corpus(&self) -> &'a Corpus {
        self.corpus
    }

    pub fn merge_threshold(&self) -> f64 {
        self.merge_threshold
    }

    /// Average cosine over every (document with a, document with b) pair
    pub fn semantic(&self, a: &str, b: &str) -> f64 {
        let (Some(stats_a), Some(stats_b)) = (self.corpus.stats(a), self.corpus.stats(b)) else {
            return 0.0;
        };

        let mut total = 0.0;
        let mut pairs = 0usize;
        for &i in &stats_a.documents {
            for &j in &stats_b.documents {
                total += self.tfidf.cosine(i, j);
                pairs += 1;
            }
        }

        if pairs == 0 {
            return 0.0;
        }
        // idf is negative for terms present in every document
        (total / pairs as f64).clamp(0.0, 1.0)
    }

    pub fn cooccurrence(&self, a: &str, b: &str) -> f64 {
        cooccurrence_similarity(self.corpus.cooccurrence(a, b))
    }

    pub fn score(&self, a: &str, b: &str) -> PairScore {
        let string = string_similarity(a, b);
        let semantic = self.semantic(a, b);
        let cooccurrence = self.cooccurrence(a, b);
        let composite = (self.weights.string * string
            + self.weights.semantic * semantic
            + self.weights.cooccurrence * cooccurrence)
            .clamp(0.0, 1.0);

        PairScore {
            string,
            semantic,
            cooccurrence,
            composite,
        }
    }

    /// Whether a pair is a merge candidate
    pub fn passes_gate(&self, score: &PairScore) -> bool {
        score.composite >= self.merge_threshold || score.string >= self.string_threshold
    }

    pub fn with_merge_threshold(mut self, threshold: f64) -> Self {
        self.merge_threshold = threshold;
        self
    }
}
