use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::signals::{normalized_popularity, novelty_signal, recency_decay};
use crate::cluster::ClusterSnapshot;
use crate::config::{ScoringConfig, ScoringWeights};
use crate::dedup::CanonicalItem;
use crate::item::{ContentItem, Lane};
use crate::types::digest::ScoreBreakdown;
use crate::types::identifiers::ItemId;

/// Run-wide inputs every per-item score depends on.
///
/// `now` is passed in explicitly; nothing here reads the clock.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub now: DateTime<Utc>,
    pub recency_half_life_hours: f64,
    pub popularity_max: f64,
    novelty: BTreeMap<ItemId, f64>,
}

impl ScoringContext {
    pub fn build(
        canonical: &[CanonicalItem],
        clusters: &ClusterSnapshot,
        config: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let popularity_max = canonical
            .iter()
            .filter_map(|c| c.item.popularity_signal)
            .filter(|p| p.is_finite())
            .fold(0.0_f64, f64::max);

        let mut novelty = BTreeMap::new();
        for cluster in clusters.iter() {
            let signal = novelty_signal(cluster.first_seen_at, now, config.novelty_half_life_hours);
            for member in &cluster.member_item_ids {
                novelty.insert(member.clone(), signal);
            }
        }

        Self {
            now,
            recency_half_life_hours: config.recency_half_life_hours,
            popularity_max,
            novelty,
        }
    }

    /// Novelty of the storyline `item` belongs to; unclustered items count as new.
    pub fn novelty_of(&self, item: &ItemId) -> f64 {
        self.novelty.get(item).copied().unwrap_or(1.0)
    }
}

pub trait Scorer {
    fn score(&self, item: &ContentItem, lane: Lane, ctx: &ScoringContext) -> ScoreBreakdown;

    fn score_value(&self, details: &ScoreBreakdown, weights: &ScoringWeights) -> f64 {
        let score = weights.recency * details.recency
            + weights.trust * details.trust
            + weights.lane * details.lane
            + weights.popularity * details.popularity
            + weights.novelty * details.novelty;
        debug_assert!(score.is_finite(), "score {score} is not finite");
        score
    }
}

/// Recency, trust, lane affinity, popularity and novelty, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeScorer;

impl Scorer for CompositeScorer {
    fn score(&self, item: &ContentItem, lane: Lane, ctx: &ScoringContext) -> ScoreBreakdown {
        ScoreBreakdown {
            recency: recency_decay(
                item.effective_published_at(),
                ctx.now,
                ctx.recency_half_life_hours,
            ),
            trust: item.source_trust_weight.clamp(0.0, 1.0),
            lane: item.lane_score(lane),
            popularity: normalized_popularity(item.popularity_signal, ctx.popularity_max),
            novelty: ctx.novelty_of(&item.id),
        }
    }
}
