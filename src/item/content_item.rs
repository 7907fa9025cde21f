use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lane::{Lane, LaneScores};
use crate::types::identifiers::{ItemId, SourceId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("Duplicate item id in batch: {0}")]
    DuplicateId(ItemId),
}

/// Why an embedding was dropped from an otherwise valid item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmbeddingDefect {
    #[error("embedding is empty")]
    Empty,
    #[error("embedding has {found} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("embedding contains NaN or infinite values")]
    NonFinite,
    #[error("embedding has zero norm")]
    ZeroNorm,
}

/// A normalized, enriched content item. Read-only for the whole engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(default)]
    pub id: ItemId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub source_id: SourceId,
    #[serde(default)]
    pub source_trust_weight: f64,
    #[serde(default)]
    pub lane_scores: LaneScores,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub popularity_signal: Option<f64>,
}

impl ContentItem {
    pub fn new(
        id: impl Into<ItemId>,
        url: impl Into<String>,
        title: impl Into<String>,
        source_id: impl Into<SourceId>,
        source_trust_weight: f64,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            canonical_url: None,
            title: title.into(),
            raw_text: String::new(),
            published_at: None,
            fetched_at,
            source_id: source_id.into(),
            source_trust_weight,
            lane_scores: LaneScores::new(),
            embedding: None,
            popularity_signal: None,
        }
    }

    pub fn with_canonical_url(mut self, url: impl Into<String>) -> Self {
        self.canonical_url = Some(url.into());
        self
    }

    pub fn with_raw_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = text.into();
        self
    }

    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_lane_score(mut self, lane: Lane, score: f64) -> Self {
        self.lane_scores.insert(lane, score);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_popularity(mut self, signal: f64) -> Self {
        self.popularity_signal = Some(signal);
        self
    }

    /// The link used for duplicate detection: the resolved canonical URL when
    /// enrichment provided one, the original URL otherwise.
    pub fn match_url(&self) -> &str {
        match self.canonical_url.as_deref() {
            Some(u) if !u.trim().is_empty() => u,
            _ => &self.url,
        }
    }

    /// Publication time used for ordering and recency.
    ///
    /// Never later than `fetched_at`: an item cannot be newer than its discovery.
    pub fn effective_published_at(&self) -> DateTime<Utc> {
        match self.published_at {
            Some(published) => published.min(self.fetched_at),
            None => self.fetched_at,
        }
    }

    pub fn lane_score(&self, lane: Lane) -> f64 {
        self.lane_scores.get(lane)
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Check the fields without which the item cannot be deduplicated or clustered.
    pub fn check_required(&self) -> Result<(), ItemError> {
        if self.id.is_blank() {
            return Err(ItemError::MissingRequiredField("id"));
        }
        if self.url.trim().is_empty() {
            return Err(ItemError::MissingRequiredField("url"));
        }
        Ok(())
    }
}

/// Precedence between items: higher trust first, then earlier publication,
/// then smaller id. Total, so any sort using it is fully deterministic.
pub fn precedence(a: &ContentItem, b: &ContentItem) -> Ordering {
    b.source_trust_weight
        .total_cmp(&a.source_trust_weight)
        .then_with(|| a.effective_published_at().cmp(&b.effective_published_at()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Validate one embedding against the dimension expected for this run.
pub fn inspect_embedding(embedding: &[f32], expected_dim: Option<usize>) -> Result<(), EmbeddingDefect> {
    if embedding.is_empty() {
        return Err(EmbeddingDefect::Empty);
    }
    if let Some(expected) = expected_dim {
        if embedding.len() != expected {
            return Err(EmbeddingDefect::DimensionMismatch {
                expected,
                found: embedding.len(),
            });
        }
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingDefect::NonFinite);
    }
    if embedding.iter().all(|v| *v == 0.0) {
        return Err(EmbeddingDefect::ZeroNorm);
    }
    Ok(())
}
