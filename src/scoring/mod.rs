pub mod ranking;
pub mod signals;

use tracing::debug;

use crate::config::{ScoringConfig, ScoringWeights};
use crate::dedup::CanonicalItem;
use crate::item::Lane;
use crate::types::digest::ScoredAssignment;

pub use ranking::{CompositeScorer, Scorer, ScoringContext};

/// Score every (canonical item, lane) pair whose lane affinity clears the floor.
///
/// Output is ordered by lane, then item id.
pub fn score_items<S: Scorer>(
    scorer: &S,
    canonical: &[CanonicalItem],
    ctx: &ScoringContext,
    weights: &ScoringWeights,
    config: &ScoringConfig,
) -> Vec<ScoredAssignment> {
    let mut assignments = Vec::new();
    for lane in Lane::ALL {
        let mut skipped = 0usize;
        for canonical_item in canonical {
            let item = &canonical_item.item;
            if item.lane_score(lane) <= config.min_lane_score {
                skipped += 1;
                continue;
            }
            let details = scorer.score(item, lane, ctx);
            let score = scorer.score_value(&details, weights);
            assignments.push(ScoredAssignment {
                item_id: item.id.clone(),
                lane,
                score,
                is_novelty_slot: false,
                why: details,
            });
        }
        debug!(%lane, skipped, "lane scored");
    }
    assignments.sort_by(|a, b| a.lane.cmp(&b.lane).then_with(|| a.item_id.cmp(&b.item_id)));
    assignments
}
