//! Keyword extraction and clustering into research categories

pub mod cluster;
pub mod corpus;
pub mod extract;
pub mod normalize;
pub mod report;
pub mod similarity;

pub use cluster::{ClusterBuilder, Clustering, KeywordCluster};
pub use corpus::{fetch_documents, keywords_from_children, load_documents, Corpus, Document};
pub use extract::extract_keyword_section;
pub use normalize::{normalize, KeywordNormalizer};
pub use report::{top_keywords, CategoryReport, RankedKeyword};
pub use similarity::SimilarityScorer;

use tracing::info;

use crate::config::KeywordConfig;

/// A corpus together with its clustering
#[derive(Debug, Clone)]
pub struct KeywordAnalysis {
    pub corpus: Corpus,
    pub clustering: Clustering,
}

impl KeywordAnalysis {
    pub fn report(&self) -> CategoryReport {
        CategoryReport::new(&self.corpus, &self.clustering)
    }

    pub fn top(&self, n: usize) -> Vec<RankedKeyword> {
        top_keywords(&self.corpus, &self.clustering, n)
    }
}

/// Score and cluster the keywords of `documents`
pub fn analyze(documents: Vec<Document>, config: &KeywordConfig) -> KeywordAnalysis {
    let corpus = Corpus::new(documents);
    let clustering = {
        let scorer = SimilarityScorer::new(&corpus, config);
        ClusterBuilder::new(&scorer, config).build()
    };

    info!(
        documents = corpus.len(),
        keywords = corpus.vocabulary_size(),
        categories = clustering.clusters.len(),
        "keyword analysis complete"
    );

    KeywordAnalysis { corpus, clustering }
}
