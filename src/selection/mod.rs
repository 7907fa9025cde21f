pub mod budgeting;
pub mod novelty;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::cluster::ClusterSnapshot;
use crate::config::SelectionConfig;
use crate::dedup::CanonicalItem;
use crate::item::Lane;
use crate::types::digest::{DigestEntry, ScoredAssignment};
use crate::types::identifiers::{ClusterId, ItemId};
pub use budgeting::{apply_budget, BudgetResult, Candidate};
pub use novelty::{capped_novelty_count, draw, novelty_slots};

/// Entries chosen for one digest, already in presentation order.
#[derive(Debug, Clone)]
pub struct Selection {
    pub entries: Vec<DigestEntry>,
    pub novelty_slots_available: usize,
    pub novelty_slots_used: usize,
    pub underfilled: bool,
}

pub struct Selector {
    config: SelectionConfig,
}

impl Selector {
    pub fn new(config: &SelectionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Choose the digest from scored assignments.
    ///
    /// Assignments picked through an exploratory slot get `is_novelty_slot`
    /// set in place.
    pub fn select(
        &self,
        assignments: &mut [ScoredAssignment],
        canonical: &[CanonicalItem],
        clusters: &ClusterSnapshot,
    ) -> Selection {
        let cfg = &self.config;

        // 0. Locate each assignment's item and cluster
        let items: BTreeMap<&ItemId, &CanonicalItem> = canonical.iter().map(|c| (c.id(), c)).collect();
        let membership = clusters.membership();
        let mut groups: BTreeMap<(Lane, ClusterId), Vec<Candidate<'_>>> = BTreeMap::new();
        for (index, assignment) in assignments.iter().enumerate() {
            let item = items.get(&assignment.item_id).copied();
            let cluster = membership.get(&assignment.item_id).and_then(|id| clusters.get(id));
            let (Some(item), Some(cluster)) = (item, cluster) else {
                warn!(item_id = %assignment.item_id, "assignment without canonical item or cluster; ignored");
                continue;
            };
            groups
                .entry((assignment.lane, cluster.id.clone()))
                .or_default()
                .push(Candidate {
                    index,
                    item,
                    cluster,
                    lane: assignment.lane,
                    score: assignment.score,
                    novelty: assignment.why.novelty,
                });
        }

        // 1. Rank within each (lane, cluster), then rank the groups by their best entry
        let mut ordered: Vec<Vec<Candidate<'_>>> = groups.into_values().collect();
        for group in &mut ordered {
            group.sort_by(candidate_order);
        }
        ordered.sort_by(|a, b| {
            let (a, b) = (&a[0], &b[0]);
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.lane.cmp(&b.lane))
                .then_with(|| a.cluster.id.cmp(&b.cluster.id))
        });

        // Each group's top N is drawn from items no higher-ranked group claimed
        let mut primary = Vec::new();
        let mut extras = Vec::new();
        let mut claimed: BTreeSet<&ItemId> = BTreeSet::new();
        for group in ordered {
            let mut placed = 0;
            for candidate in group {
                if placed < cfg.per_group_limit && claimed.insert(candidate.item.id()) {
                    placed += 1;
                    primary.push(candidate);
                } else {
                    extras.push(candidate);
                }
            }
        }

        // 2. Primary picks up to the non-exploratory share of the digest
        let slots = novelty_slots(cfg.max_digest_size, cfg.novelty_fraction);
        let mut taken: BTreeSet<ItemId> = BTreeSet::new();
        let BudgetResult {
            selected: mut chosen,
            skipped,
        } = apply_budget(primary, cfg.max_digest_size.saturating_sub(slots), &mut taken);

        // 3. Seeded exploratory picks from below the per-group cut
        let mut pool: Vec<Candidate<'_>> = extras
            .into_iter()
            .filter(|c| {
                !taken.contains(c.item.id())
                    && !c.cluster.degraded
                    && c.score >= cfg.novelty_min_score
                    && c.novelty >= cfg.novelty_min_signal
            })
            .collect();
        pool.sort_by(|a, b| {
            a.item
                .id()
                .cmp(b.item.id())
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.lane.cmp(&b.lane))
        });
        pool.dedup_by(|later, kept| later.item.id() == kept.item.id());

        let count = capped_novelty_count(slots.min(pool.len()), chosen.len(), cfg.novelty_fraction);
        let picks = draw(&pool, count, cfg.seed);
        for pick in &picks {
            taken.insert(pick.item.id().clone());
            assignments[pick.index].is_novelty_slot = true;
        }
        debug!(pool = pool.len(), slots, used = picks.len(), seed = cfg.seed, "novelty draw");

        // 4. Back-fill leftover room from primary candidates the budget cut
        let remaining = cfg.max_digest_size.saturating_sub(chosen.len() + picks.len());
        let backfill = apply_budget(skipped, remaining, &mut taken);
        chosen.extend(backfill.selected);

        let novelty_slots_used = picks.len();
        let mut placed: Vec<(Candidate<'_>, bool)> = chosen
            .into_iter()
            .map(|c| (c, false))
            .chain(picks.into_iter().map(|c| (c, true)))
            .collect();

        // 5. Presentation order
        let mut best: BTreeMap<(Lane, &ClusterId), f64> = BTreeMap::new();
        for (c, _) in &placed {
            let entry = best.entry((c.lane, &c.cluster.id)).or_insert(f64::NEG_INFINITY);
            *entry = entry.max(c.score);
        }
        placed.sort_by(|(a, _), (b, _)| {
            let a_best = best.get(&(a.lane, &a.cluster.id)).copied().unwrap_or(a.score);
            let b_best = best.get(&(b.lane, &b.cluster.id)).copied().unwrap_or(b.score);
            a.lane
                .cmp(&b.lane)
                .then_with(|| b_best.total_cmp(&a_best))
                .then_with(|| b.cluster.last_updated_at.cmp(&a.cluster.last_updated_at))
                .then_with(|| a.cluster.id.cmp(&b.cluster.id))
                .then_with(|| candidate_order(a, b))
        });

        let entries: Vec<DigestEntry> = placed
            .into_iter()
            .map(|(c, is_novelty_slot)| DigestEntry {
                item: c.item.clone(),
                lane: c.lane,
                cluster_id: c.cluster.id.clone(),
                score: c.score,
                is_novelty_slot,
                degraded: c.cluster.degraded,
            })
            .collect();

        let underfilled = entries.len() < cfg.min_digest_size;
        if underfilled {
            warn!(
                selected = entries.len(),
                min = cfg.min_digest_size,
                "digest underfilled; thresholds left unchanged"
            );
        }

        Selection {
            entries,
            novelty_slots_available: slots,
            novelty_slots_used,
            underfilled,
        }
    }
}

/// Score desc, then earliest effective publication, then id.
fn candidate_order(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            a.item
                .item
                .effective_published_at()
                .cmp(&b.item.item.effective_published_at())
        })
        .then_with(|| a.item.id().cmp(b.item.id()))
}
