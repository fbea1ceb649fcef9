//! Keyword normalization and splitting

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::config::KeywordConfig;

/// Characters that separate keywords in a raw keyword section
pub const DEFAULT_DELIMITERS: &[char] = &[',', ';', '|', '，', '；', '、', '\n', '\r'];

static MARKUP_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Tags and character entities
fn markup_re() -> Option<&'static Regex> {
    MARKUP_RE
        .get_or_init(|| match Regex::new(r"<[^>]*>|&#?[0-9A-Za-z]+;") {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, "failed to compile markup regex");
                None
            }
        })
        .as_ref()
}

/// Canonical form of one keyword.
///
/// Markup is removed, text is lowercased, every character that is not a
/// letter or digit becomes a space, and runs of whitespace collapse to one.
/// Applying it twice gives the same result as applying it once.
pub fn normalize(raw: &str) -> String {
    let stripped = match markup_re() {
        Some(re) => re.replace_all(raw, " "),
        None => raw.into(),
    };

    let mapped: String = stripped
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits raw keyword sections into normalized keywords
#[derive(Debug, Clone)]
pub struct KeywordNormalizer {
    delimiters: Vec<char>,
    min_len: usize,
    stopwords: HashSet<String>,
}

impl Default for KeywordNormalizer {
    fn default() -> Self {
        Self::from_config(&KeywordConfig::default())
    }
}

impl KeywordNormalizer {
    pub fn new(min_len: usize, stopwords: &[String]) -> Self {
        Self {
            delimiters: DEFAULT_DELIMITERS.to_vec(),
            min_len,
            stopwords: stopwords.iter().map(|s| normalize(s)).collect(),
        }
    }

    pub fn from_config(config: &KeywordConfig) -> Self {
        Self::new(config.min_keyword_len, &config.stopwords)
    }

    pub fn with_delimiters(mut self, delimiters: &[char]) -> Self {
        self.delimiters = delimiters.to_vec();
        self
    }

    /// Split a delimited keyword string, keeping order and duplicates
    pub fn split(&self, raw: &str) -> Vec<String> {
        raw.split(|c: char| self.delimiters.contains(&c))
            .map(normalize)
            .filter(|kw| self.accepts(kw))
            .collect()
    }

    /// Split every entry of an already separated list
    pub fn split_all<S: AsRef<str>>(&self, raw: &[S]) -> Vec<String> {
        raw.iter().flat_map(|s| self.split(s.as_ref())).collect()
    }

    fn accepts(&self, keyword: &str) -> bool {
        !keyword.is_empty()
            && keyword.chars().count() >= self.min_len
            && !self.stopwords.contains(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  Flash-Drought  "), "flash drought");
        assert_eq!(normalize("Soil/Moisture"), "soil moisture");
        assert_eq!(normalize("<b>GRACE</b>&nbsp;TWS"), "grace tws");
        assert_eq!(normalize("ET  (evapotranspiration)"), "et evapotranspiration");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_keeps_cjk() {
        assert_eq!(normalize("骤旱，监测"), "骤旱 监测");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "",
            " ",
            "Flash Drought",
            "<p>Land–Atmosphere&amp;Coupling</p>",
            "İstanbul ΣΊΣΥΦΟΣ",
            "a--b__c  d\t\te",
            "VOD × Plant Hydraulics",
            "!!!",
            "水文 / 极端事件",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input {:?}", s);
        }
    }

    #[test]
    fn test_split_delimiters_and_filters() {
        let normalizer = KeywordNormalizer::default();
        let keywords = normalizer.split("Flash drought; ET | GRACE，骤旱、a\nthe\r\nSoil moisture");
        assert_eq!(
            keywords,
            vec!["flash drought", "et", "grace", "骤旱", "soil moisture"]
        );
    }

    #[test]
    fn test_split_stopwords_case_insensitive() {
        let normalizer = KeywordNormalizer::new(2, &["Tags".to_string()]);
        assert_eq!(normalizer.split("TAGS, hydrology"), vec!["hydrology"]);
    }

    #[test]
    fn test_split_min_length_counts_chars() {
        let normalizer = KeywordNormalizer::new(3, &[]);
        assert_eq!(normalizer.split("et, gpp, 水文"), vec!["gpp"]);
    }

    #[test]
    fn test_custom_delimiters() {
        let normalizer = KeywordNormalizer::new(2, &[]).with_delimiters(&['/']);
        assert_eq!(normalizer.split("drought/flood, storm"), vec!["drought", "flood storm"]);
    }
}
