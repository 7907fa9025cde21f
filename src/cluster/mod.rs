//! Storyline clusters and their continuity across runs.
//!
//! Cross-run identity is a pure function of the prior run's snapshot and the
//! current canonical items: nothing is mutated in place, a new snapshot is
//! produced for storage to persist and hand back next run.

pub mod policy;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClusteringConfig;
use crate::dedup::CanonicalItem;
use crate::item::precedence;
use crate::similarity::embedding::mean;
use crate::types::identifiers::{ClusterId, ItemId};

pub use policy::{AssignmentContext, AssignmentPolicy, DraftCluster, GreedyCentroidPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub member_item_ids: BTreeSet<ItemId>,
    /// Mean of member embeddings. Empty for degraded clusters.
    pub centroid: Vec<f32>,
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    /// Singleton built for an item without a usable embedding.
    #[serde(default)]
    pub degraded: bool,
}

impl Cluster {
    /// True when the storyline first appeared at `now`, i.e. in this run.
    pub fn is_new_at(&self, now: DateTime<Utc>) -> bool {
        self.first_seen_at >= now
    }
}

/// All clusters of one run, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Cluster>", into = "Vec<Cluster>")]
pub struct ClusterSnapshot {
    clusters: Vec<Cluster>,
}

impl ClusterSnapshot {
    pub fn new(mut clusters: Vec<Cluster>) -> Self {
        clusters.sort_by(|a, b| a.id.cmp(&b.id));
        Self { clusters }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn get(&self, id: &ClusterId) -> Option<&Cluster> {
        self.clusters
            .binary_search_by(|c| c.id.cmp(id))
            .ok()
            .map(|idx| &self.clusters[idx])
    }

    /// Item → cluster lookup for the partition.
    pub fn membership(&self) -> BTreeMap<ItemId, ClusterId> {
        let mut out = BTreeMap::new();
        for cluster in &self.clusters {
            for member in &cluster.member_item_ids {
                out.insert(member.clone(), cluster.id.clone());
            }
        }
        out
    }

    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters
    }
}

impl From<Vec<Cluster>> for ClusterSnapshot {
    fn from(clusters: Vec<Cluster>) -> Self {
        ClusterSnapshot::new(clusters)
    }
}

impl From<ClusterSnapshot> for Vec<Cluster> {
    fn from(snapshot: ClusterSnapshot) -> Self {
        snapshot.clusters
    }
}

/// Cluster count outside the advisory band. Reported, never corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCountAnomaly {
    pub count: usize,
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    pub snapshot: ClusterSnapshot,
    /// Clusters whose id was carried over from the prior snapshot.
    pub continued: usize,
    /// Clusters that received a freshly minted id.
    pub minted: usize,
    /// Items placed in degraded singleton clusters.
    pub degraded: Vec<ItemId>,
    pub anomaly: Option<ClusterCountAnomaly>,
}

pub struct ClusterAssigner<P = GreedyCentroidPolicy> {
    policy: P,
    config: ClusteringConfig,
}

impl ClusterAssigner<GreedyCentroidPolicy> {
    pub fn new(config: &ClusteringConfig) -> Self {
        Self::with_policy(GreedyCentroidPolicy, config)
    }
}

impl<P> ClusterAssigner<P>
where
    P: AssignmentPolicy,
{
    pub fn with_policy(policy: P, config: &ClusteringConfig) -> Self {
        Self {
            policy,
            config: config.clone(),
        }
    }

    pub fn assign(
        &self,
        canonical: &[CanonicalItem],
        prior: &ClusterSnapshot,
        now: DateTime<Utc>,
    ) -> ClusterOutcome {
        // 1. Split embedded items from the ones that can only be singletons
        let mut embedded: Vec<&CanonicalItem> = Vec::new();
        let mut degraded_items: Vec<&CanonicalItem> = Vec::new();
        for item in canonical {
            if item.item.has_embedding() {
                embedded.push(item);
            } else {
                degraded_items.push(item);
            }
        }
        embedded.sort_by(|a, b| precedence(&a.item, &b.item));

        // 2. Policy proposes the grouping
        let ctx = AssignmentContext {
            prior,
            now,
            continuity_threshold: self.config.continuity_threshold,
        };
        let drafts = self.policy.assign(&embedded, &ctx);

        // 3. Settle identity: continued ids first, then mint the rest
        let by_id: BTreeMap<&ItemId, &CanonicalItem> =
            embedded.iter().map(|&c| (c.id(), c)).collect();
        let mut used: BTreeSet<ClusterId> = prior.iter().map(|c| c.id.clone()).collect();
        let mut claimed: BTreeSet<ClusterId> = BTreeSet::new();
        let mut placed: BTreeSet<ItemId> = BTreeSet::new();
        let mut clusters = Vec::with_capacity(drafts.len() + degraded_items.len());
        let (mut continued, mut minted) = (0, 0);

        let mut pending = Vec::new();
        for draft in drafts {
            let members: Vec<&CanonicalItem> = draft
                .members
                .iter()
                .filter_map(|id| by_id.get(id).copied())
                .filter(|c| placed.insert(c.id().clone()))
                .collect();
            if members.is_empty() {
                continue;
            }
            let carried = draft
                .continues
                .and_then(|id| prior.get(&id))
                .filter(|p| claimed.insert(p.id.clone()));
            match carried {
                Some(p) => {
                    continued += 1;
                    clusters.push(build(p.id.clone(), &members, p.first_seen_at, now));
                }
                None => pending.push(members),
            }
        }
        used.extend(claimed);

        for members in pending {
            let id = mint_unique(members[0].id(), &used);
            used.insert(id.clone());
            minted += 1;
            clusters.push(build(id, &members, now, now));
        }

        // Items a policy failed to place still get a storyline of their own.
        for item in embedded.iter().filter(|c| !placed.contains(c.id())) {
            warn!(item_id = %item.id(), "assignment policy left item unplaced; seeding its own cluster");
            let id = mint_unique(item.id(), &used);
            used.insert(id.clone());
            minted += 1;
            clusters.push(build(id, &[*item], now, now));
        }

        // 4. Degraded singletons
        let mut degraded = Vec::with_capacity(degraded_items.len());
        for item in degraded_items {
            let id = ClusterId::degraded(item.id());
            let first_seen_at = prior.get(&id).map_or(now, |p| p.first_seen_at);
            debug!(item_id = %item.id(), "no embedding; degraded singleton cluster");
            degraded.push(item.id().clone());
            clusters.push(Cluster {
                id,
                member_item_ids: BTreeSet::from([item.id().clone()]),
                centroid: Vec::new(),
                first_seen_at,
                last_updated_at: now,
                degraded: true,
            });
        }

        // 5. Advisory count check
        let count = clusters.len();
        let anomaly = if count < self.config.min_clusters || count > self.config.max_clusters {
            warn!(
                count,
                min = self.config.min_clusters,
                max = self.config.max_clusters,
                "cluster count outside advisory band"
            );
            Some(ClusterCountAnomaly {
                count,
                min: self.config.min_clusters,
                max: self.config.max_clusters,
            })
        } else {
            None
        };

        debug!(clusters = count, continued, minted, degraded = degraded.len(), "clustering complete");

        ClusterOutcome {
            snapshot: ClusterSnapshot::new(clusters),
            continued,
            minted,
            degraded,
            anomaly,
        }
    }
}

fn build(
    id: ClusterId,
    members: &[&CanonicalItem],
    first_seen_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Cluster {
    let centroid = mean(members.iter().filter_map(|c| c.item.embedding.as_deref()));
    Cluster {
        id,
        member_item_ids: members.iter().map(|c| c.id().clone()).collect(),
        centroid,
        first_seen_at,
        last_updated_at: now,
        degraded: false,
    }
}

fn mint_unique(anchor: &ItemId, used: &BTreeSet<ClusterId>) -> ClusterId {
    let mut attempt = 0;
    loop {
        let id = ClusterId::mint(anchor, attempt);
        if !used.contains(&id) {
            return id;
        }
        attempt += 1;
    }
}
