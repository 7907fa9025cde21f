use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::{ClusterCountAnomaly, ClusterSnapshot};
use crate::config::ConfigError;
use crate::dedup::{CanonicalItem, PairFailure};
use crate::item::{Lane, MalformedEmbedding, RejectedItem};
use crate::types::identifiers::{ClusterId, ItemId};

/// The five signals behind a composite score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub recency: f64,
    pub trust: f64,
    pub lane: f64,
    pub popularity: f64,
    pub novelty: f64,
}

/// Score of one canonical item within one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAssignment {
    pub item_id: ItemId,
    pub lane: Lane,
    pub score: f64,
    /// Set once the selector places this pair through an exploratory slot.
    pub is_novelty_slot: bool,
    pub why: ScoreBreakdown,
}

/// One line of the digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEntry {
    pub item: CanonicalItem,
    pub lane: Lane,
    pub cluster_id: ClusterId,
    pub score: f64,
    pub is_novelty_slot: bool,
    /// The item's cluster is a degraded singleton.
    pub degraded: bool,
}

/// Metadata describing the outcome of the selection process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestMetadata {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,

    pub items_received: usize,
    pub items_rejected: usize,
    pub canonical_items: usize,
    pub clusters: usize,
    pub assignments_considered: usize,

    pub entries_selected: usize,
    pub novelty_slots_available: usize,
    pub novelty_slots_used: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub entries: Vec<DigestEntry>,
    pub metadata: DigestMetadata,
}

impl Digest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lane(&self, lane: Lane) -> impl Iterator<Item = &DigestEntry> {
        self.entries.iter().filter(move |e| e.lane == lane)
    }
}

/// Non-fatal conditions raised during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFlags {
    /// Fewer entries than the configured minimum digest size.
    pub underfilled: bool,
    pub cluster_count_anomaly: Option<ClusterCountAnomaly>,
    pub dedup_error_count: usize,
    pub dedup_failures: Vec<PairFailure>,
    pub malformed_embeddings: Vec<MalformedEmbedding>,
    /// Items placed in degraded singleton clusters.
    pub degraded_items: Vec<ItemId>,
}

/// The final result of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub digest: Digest,
    pub canonical_items: Vec<CanonicalItem>,
    /// Storyline partition to persist and pass back as the next run's prior.
    pub clusters: ClusterSnapshot,
    pub assignments: Vec<ScoredAssignment>,
    pub rejected: Vec<RejectedItem>,
    pub flags: RunFlags,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Empty input: no items supplied")]
    EmptyInput,

    #[error("No valid items after intake ({rejected} rejected)")]
    NoValidItems { rejected: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
