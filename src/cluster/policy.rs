use chrono::{DateTime, Utc};
use tracing::debug;

use super::{Cluster, ClusterSnapshot};
use crate::dedup::CanonicalItem;
use crate::similarity::cosine;
use crate::similarity::embedding::mean;
use crate::types::identifiers::{ClusterId, ItemId};

/// Inputs shared by every assignment policy for one run.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentContext<'a> {
    pub prior: &'a ClusterSnapshot,
    pub now: DateTime<Utc>,
    pub continuity_threshold: f64,
}

/// A grouping proposed by a policy, before ids and centroids are settled.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftCluster {
    /// Anchor first, then members in the order they joined.
    pub members: Vec<ItemId>,
    /// Prior-run cluster this group continues, if any member's similarity to
    /// its centroid exceeded the continuity threshold.
    pub continues: Option<ClusterId>,
}

/// Strategy that partitions embedded canonical items into storylines.
///
/// `items` arrive in precedence order and all carry an embedding. The
/// returned drafts must cover every item exactly once.
pub trait AssignmentPolicy {
    fn assign(&self, items: &[&CanonicalItem], ctx: &AssignmentContext<'_>) -> Vec<DraftCluster>;
}

/// Greedy nearest-centroid assignment.
///
/// Each item joins the most similar cluster (unclaimed prior-run centroids
/// and clusters formed so far this run) when the similarity reaches the
/// continuity threshold, and seeds a new cluster otherwise. Order-sensitive:
/// earlier items anchor clusters.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyCentroidPolicy;

struct Candidate<'p> {
    prior: Option<&'p Cluster>,
    /// Some member scored strictly above the threshold against `prior`.
    prior_matched: bool,
    members: Vec<ItemId>,
    vectors: Vec<Vec<f32>>,
    running: Vec<f32>,
}

impl<'p> Candidate<'p> {
    fn from_prior(prior: &'p Cluster) -> Self {
        Self {
            prior: Some(prior),
            prior_matched: false,
            members: Vec::new(),
            vectors: Vec::new(),
            running: Vec::new(),
        }
    }

    fn seeded(id: ItemId, embedding: &[f32]) -> Self {
        let mut c = Self {
            prior: None,
            prior_matched: false,
            members: Vec::new(),
            vectors: Vec::new(),
            running: Vec::new(),
        };
        c.push(id, embedding);
        c
    }

    fn push(&mut self, id: ItemId, embedding: &[f32]) {
        self.members.push(id);
        self.vectors.push(embedding.to_vec());
        self.running = mean(self.vectors.iter().map(Vec::as_slice));
    }

    fn prior_similarity(&self, embedding: &[f32]) -> Option<f64> {
        self.prior.and_then(|p| cosine(&p.centroid, embedding).ok())
    }

    /// Best similarity of `embedding` to this candidate, `None` if it cannot be compared.
    fn similarity(&self, embedding: &[f32]) -> Option<f64> {
        let to_prior = self.prior_similarity(embedding);
        let to_running = if self.members.is_empty() {
            None
        } else {
            cosine(&self.running, embedding).ok()
        };
        match (to_prior, to_running) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

impl AssignmentPolicy for GreedyCentroidPolicy {
    fn assign(&self, items: &[&CanonicalItem], ctx: &AssignmentContext<'_>) -> Vec<DraftCluster> {
        let mut candidates: Vec<Candidate<'_>> = ctx
            .prior
            .iter()
            .filter(|c| !c.degraded && !c.centroid.is_empty())
            .map(Candidate::from_prior)
            .collect();

        for canonical in items {
            let Some(embedding) = canonical.item.embedding.as_deref() else {
                continue;
            };

            let mut best: Option<(usize, f64)> = None;
            for (idx, candidate) in candidates.iter().enumerate() {
                let Some(sim) = candidate.similarity(embedding) else {
                    continue;
                };
                let better = match best {
                    Some((_, b)) => sim > b,
                    None => true,
                };
                if sim >= ctx.continuity_threshold && better {
                    best = Some((idx, sim));
                }
            }

            match best {
                Some((idx, sim)) => {
                    debug!(item_id = %canonical.id(), similarity = sim, "joining cluster");
                    let candidate = &mut candidates[idx];
                    if candidate
                        .prior_similarity(embedding)
                        .is_some_and(|p| p > ctx.continuity_threshold)
                    {
                        candidate.prior_matched = true;
                    }
                    candidate.push(canonical.id().clone(), embedding);
                }
                None => candidates.push(Candidate::seeded(canonical.id().clone(), embedding)),
            }
        }

        candidates
            .into_iter()
            .filter(|c| !c.members.is_empty())
            .map(|c| DraftCluster {
                continues: c.prior.filter(|_| c.prior_matched).map(|p| p.id.clone()),
                members: c.members,
            })
            .collect()
    }
}
