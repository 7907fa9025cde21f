use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::content_item::{inspect_embedding, ContentItem, EmbeddingDefect, ItemError};
use crate::config::EngineConfig;
use crate::types::identifiers::{ItemId, SourceId};

/// An item refused at intake. It takes no further part in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedItem {
    pub item_id: ItemId,
    pub source_id: SourceId,
    pub url: String,
    pub reason: String,
}

/// An item whose embedding was dropped; the item itself continues text-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedEmbedding {
    pub item_id: ItemId,
    pub defect: EmbeddingDefect,
}

#[derive(Debug, Clone, Default)]
pub struct Intake {
    pub accepted: Vec<ContentItem>,
    pub rejected: Vec<RejectedItem>,
    pub malformed_embeddings: Vec<MalformedEmbedding>,
    /// Embedding length enforced for this run, if any embedding was present.
    pub embedding_dimension: Option<usize>,
}

/// Validate raw enrichment output for one run.
///
/// Per-item problems never fail the batch: items missing `id` or `url`
/// (or repeating an id already seen) are rejected, malformed embeddings are
/// stripped, trust and popularity values are sanitised.
pub fn admit(items: Vec<ContentItem>, config: &EngineConfig) -> Intake {
    let mut intake = Intake {
        embedding_dimension: config
            .similarity
            .embedding_dimension
            .or_else(|| dominant_dimension(&items)),
        ..Intake::default()
    };
    let mut seen: BTreeSet<ItemId> = BTreeSet::new();

    for mut item in items {
        let check = item.check_required().and_then(|()| {
            if seen.contains(&item.id) {
                Err(ItemError::DuplicateId(item.id.clone()))
            } else {
                Ok(())
            }
        });
        if let Err(e) = check {
            warn!(item_id = %item.id, source = %item.source_id, url = %item.url, error = %e, "rejecting item");
            intake.rejected.push(RejectedItem {
                item_id: item.id,
                source_id: item.source_id,
                url: item.url,
                reason: e.to_string(),
            });
            continue;
        }
        seen.insert(item.id.clone());

        item.source_trust_weight = resolve_trust(&item, &config.source_trust);
        item.popularity_signal = item
            .popularity_signal
            .filter(|p| p.is_finite() && *p >= 0.0);

        if let Some(embedding) = item.embedding.as_deref() {
            if let Err(defect) = inspect_embedding(embedding, intake.embedding_dimension) {
                warn!(item_id = %item.id, %defect, "dropping malformed embedding");
                intake.malformed_embeddings.push(MalformedEmbedding {
                    item_id: item.id.clone(),
                    defect,
                });
                item.embedding = None;
            }
        }

        intake.accepted.push(item);
    }

    debug!(
        accepted = intake.accepted.len(),
        rejected = intake.rejected.len(),
        malformed = intake.malformed_embeddings.len(),
        "intake complete"
    );
    intake
}

fn resolve_trust(item: &ContentItem, overrides: &BTreeMap<String, f64>) -> f64 {
    let raw = overrides
        .get(item.source_id.as_str())
        .copied()
        .unwrap_or(item.source_trust_weight);
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Most common non-empty embedding length; ties go to the shorter length.
fn dominant_dimension(items: &[ContentItem]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for len in items
        .iter()
        .filter_map(|i| i.embedding.as_ref().map(Vec::len))
        .filter(|len| *len > 0)
    {
        *counts.entry(len).or_default() += 1;
    }
    // max_by_key keeps the last maximum, so walk lengths from longest to shortest.
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(len, _)| len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, embedding: Option<Vec<f32>>) -> ContentItem {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let mut it = ContentItem::new(id, format!("https://example.com/{id}"), id, "src", 0.5, at);
        it.embedding = embedding;
        it
    }

    #[test]
    fn dominant_dimension_prefers_majority_then_shorter() {
        let items = vec![
            item("a", Some(vec![1.0, 0.0])),
            item("b", Some(vec![1.0, 0.0, 0.0])),
            item("c", Some(vec![0.0, 1.0, 0.0])),
        ];
        assert_eq!(dominant_dimension(&items), Some(3));

        let tied = vec![item("a", Some(vec![1.0, 0.0])), item("b", Some(vec![1.0, 0.0, 0.0]))];
        assert_eq!(dominant_dimension(&tied), Some(2));
        assert_eq!(dominant_dimension(&[item("x", None)]), None);
    }

    #[test]
    fn trust_override_is_clamped() {
        let mut overrides = BTreeMap::new();
        overrides.insert("src".to_string(), 1.4);
        assert_eq!(resolve_trust(&item("a", None), &overrides), 1.0);

        let mut nan = item("b", None);
        nan.source_trust_weight = f64::NAN;
        assert_eq!(resolve_trust(&nan, &BTreeMap::new()), 0.0);
    }
}
