//! Pairwise closeness between content items.
//!
//! Three signals feed the composite:
//! - normalized URL equality (binary, short-circuits the composite to 1.0),
//! - title token-set Jaccard,
//! - embedding cosine, only when both items carry an embedding.
//!
//! A missing embedding removes its term from the weighted combination instead
//! of counting as zero. Embeddings are compared only for pairs whose title
//! similarity reaches `embedding_prefilter`; pairs at or above the pre-filter
//! are never false negatives, pairs below it are judged on text alone.

pub mod embedding;
pub mod text;
pub mod link;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SimilarityConfig;
use crate::item::ContentItem;

pub use self::embedding::cosine;
pub use self::text::{jaccard, title_tokens};
pub use self::link::normalize_url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimilarityError {
    #[error("embedding dimensions differ ({left} vs {right})")]
    DimensionMismatch { left: usize, right: usize },
    #[error("embedding contains NaN or infinite values")]
    NonFiniteEmbedding,
}

/// The signals behind one pair's composite similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairSimilarity {
    pub url_match: bool,
    pub title: f64,
    /// `None` when either side lacks an embedding or the pair was pre-filtered.
    pub embedding: Option<f64>,
    pub composite: f64,
}

#[derive(Debug, Clone)]
struct Profile {
    url: String,
    tokens: BTreeSet<String>,
}

/// Precomputed per-item text features over one run's items.
#[derive(Debug)]
pub struct SimilarityIndex<'a> {
    items: &'a [ContentItem],
    profiles: Vec<Profile>,
    config: SimilarityConfig,
}

impl<'a> SimilarityIndex<'a> {
    pub fn build(items: &'a [ContentItem], config: &SimilarityConfig) -> Self {
        let profiles = items
            .iter()
            .map(|item| Profile {
                url: normalize_url(item.match_url()),
                tokens: title_tokens(&item.title),
            })
            .collect();

        Self {
            items,
            profiles,
            config: config.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, idx: usize) -> &'a ContentItem {
        &self.items[idx]
    }

    pub fn normalized_url(&self, idx: usize) -> &str {
        &self.profiles[idx].url
    }

    /// Symmetric similarity of items `i` and `j`.
    pub fn pair(&self, i: usize, j: usize) -> Result<PairSimilarity, SimilarityError> {
        let (pa, pb) = (&self.profiles[i], &self.profiles[j]);
        let title = jaccard(&pa.tokens, &pb.tokens);

        if pa.url == pb.url {
            return Ok(PairSimilarity {
                url_match: true,
                title,
                embedding: None,
                composite: 1.0,
            });
        }

        let text_judgeable = !pa.tokens.is_empty() && !pb.tokens.is_empty();
        let passes_prefilter = !text_judgeable || title >= self.config.embedding_prefilter;

        let embedding = match (&self.items[i].embedding, &self.items[j].embedding) {
            (Some(a), Some(b)) if passes_prefilter && !a.is_empty() && !b.is_empty() => {
                Some(cosine(a, b)?)
            }
            _ => None,
        };

        Ok(PairSimilarity {
            url_match: false,
            title,
            embedding,
            composite: self.combine(title, embedding),
        })
    }

    fn combine(&self, title: f64, embedding: Option<f64>) -> f64 {
        let tw = self.config.title_weight;
        let (weighted, total) = match embedding {
            Some(e) => {
                let ew = self.config.embedding_weight;
                (tw * title + ew * e, tw + ew)
            }
            None => (tw * title, tw),
        };
        if total <= 0.0 {
            return 0.0;
        }
        (weighted / total).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, url: &str, title: &str) -> ContentItem {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        ContentItem::new(id, url, title, "src", 0.5, at)
    }

    #[test]
    fn url_match_short_circuits() {
        let items = vec![
            item("a", "https://x.com/p?utm=1", "Completely different")
                .with_embedding(vec![1.0, 0.0]),
            item("b", "https://x.com/p", "Nothing alike").with_embedding(vec![0.0, 1.0]),
        ];
        let index = SimilarityIndex::build(&items, &SimilarityConfig::default());
        let sim = index.pair(0, 1).unwrap();
        assert!(sim.url_match);
        assert_eq!(sim.composite, 1.0);
    }

    #[test]
    fn missing_embedding_is_excluded_not_zeroed() {
        let items = vec![
            item("a", "https://a.com/1", "Rust async runtime benchmarks"),
            item("b", "https://b.com/2", "Rust async runtime benchmarks")
                .with_embedding(vec![1.0, 0.0]),
        ];
        let index = SimilarityIndex::build(&items, &SimilarityConfig::default());
        let sim = index.pair(0, 1).unwrap();
        assert_eq!(sim.embedding, None);
        assert_eq!(sim.composite, 1.0);
    }

    #[test]
    fn prefilter_skips_embeddings_for_unrelated_titles() {
        let config = SimilarityConfig {
            embedding_prefilter: 0.5,
            ..SimilarityConfig::default()
        };
        let items = vec![
            item("a", "https://a.com/1", "Kernel scheduler patch").with_embedding(vec![1.0, 0.0]),
            item("b", "https://b.com/2", "Quarterly earnings call").with_embedding(vec![1.0, 0.0]),
        ];
        let index = SimilarityIndex::build(&items, &config);
        let sim = index.pair(0, 1).unwrap();
        assert_eq!(sim.embedding, None);
        assert_eq!(sim.composite, 0.0);
    }

    #[test]
    fn pairs_are_symmetric() {
        let items = vec![
            item("a", "https://a.com/1", "Open model weights released")
                .with_embedding(vec![0.3, 0.9, 0.1]),
            item("b", "https://b.com/2", "Model weights released openly")
                .with_embedding(vec![0.2, 0.8, 0.4]),
        ];
        let index = SimilarityIndex::build(&items, &SimilarityConfig::default());
        assert_eq!(index.pair(0, 1).unwrap(), index.pair(1, 0).unwrap());
    }
}
