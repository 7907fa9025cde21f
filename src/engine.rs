use chrono::{DateTime, Utc};
use tracing::info;

use crate::cluster::{AssignmentPolicy, ClusterAssigner, ClusterSnapshot, GreedyCentroidPolicy};
use crate::config::{ConfigError, EngineConfig, ScoringWeights};
use crate::dedup::Deduplicator;
use crate::item::{admit, ContentItem};
use crate::scoring::{score_items, CompositeScorer, Scorer, ScoringContext};
use crate::selection::Selector;
use crate::types::digest::{Digest, DigestMetadata, EngineError, RunFlags, RunOutput};

/// One configured pipeline: intake, dedup, clustering, scoring, selection.
///
/// Holds no state between runs. Cross-run continuity flows only through the
/// `ClusterSnapshot` passed to [`DigestEngine::run`] and returned in
/// [`RunOutput::clusters`].
pub struct DigestEngine<P = GreedyCentroidPolicy, S = CompositeScorer> {
    config: EngineConfig,
    weights: ScoringWeights,
    deduplicator: Deduplicator,
    assigner: ClusterAssigner<P>,
    scorer: S,
    selector: Selector,
}

impl DigestEngine<GreedyCentroidPolicy, CompositeScorer> {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, GreedyCentroidPolicy, CompositeScorer)
    }
}

impl<P, S> DigestEngine<P, S>
where
    P: AssignmentPolicy,
    S: Scorer,
{
    /// Fails when weights are missing or any setting is out of range.
    pub fn with_parts(config: EngineConfig, policy: P, scorer: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let weights = config.weights()?;
        Ok(Self {
            weights,
            deduplicator: Deduplicator::new(&config.dedup, &config.similarity),
            assigner: ClusterAssigner::with_policy(policy, &config.clustering),
            scorer,
            selector: Selector::new(&config.selection),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Produce one digest.
    ///
    /// Deterministic for identical `(items, prior, now, config)`; `now` is the
    /// only notion of time the run uses.
    pub fn run(
        &self,
        items: Vec<ContentItem>,
        prior: &ClusterSnapshot,
        now: DateTime<Utc>,
    ) -> Result<RunOutput, EngineError> {
        if items.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        let items_received = items.len();
        info!(items = items_received, prior_clusters = prior.len(), %now, "digest run started");

        // 1. Intake
        let intake = admit(items, &self.config);
        if intake.accepted.is_empty() {
            return Err(EngineError::NoValidItems {
                rejected: intake.rejected.len(),
            });
        }

        // 2. Dedup
        let dedup = self.deduplicator.run(&intake.accepted);
        info!(
            canonical = dedup.canonical.len(),
            merged_groups = dedup.merged_groups,
            failed_pairs = dedup.failures.len(),
            "deduplication complete"
        );

        // 3. Clustering
        let clustering = self.assigner.assign(&dedup.canonical, prior, now);
        info!(
            clusters = clustering.snapshot.len(),
            continued = clustering.continued,
            minted = clustering.minted,
            degraded = clustering.degraded.len(),
            "clustering complete"
        );

        // 4. Scoring
        let ctx = ScoringContext::build(&dedup.canonical, &clustering.snapshot, &self.config.scoring, now);
        let mut assignments = score_items(
            &self.scorer,
            &dedup.canonical,
            &ctx,
            &self.weights,
            &self.config.scoring,
        );

        // 5. Selection
        let selection = self
            .selector
            .select(&mut assignments, &dedup.canonical, &clustering.snapshot);
        info!(
            selected = selection.entries.len(),
            novelty = selection.novelty_slots_used,
            underfilled = selection.underfilled,
            "selection complete"
        );

        let metadata = DigestMetadata {
            generated_at: now,
            seed: self.config.selection.seed,
            items_received,
            items_rejected: intake.rejected.len(),
            canonical_items: dedup.canonical.len(),
            clusters: clustering.snapshot.len(),
            assignments_considered: assignments.len(),
            entries_selected: selection.entries.len(),
            novelty_slots_available: selection.novelty_slots_available,
            novelty_slots_used: selection.novelty_slots_used,
        };

        let flags = RunFlags {
            underfilled: selection.underfilled,
            cluster_count_anomaly: clustering.anomaly,
            dedup_error_count: dedup.failures.len(),
            dedup_failures: dedup.failures,
            malformed_embeddings: intake.malformed_embeddings,
            degraded_items: clustering.degraded,
        };

        Ok(RunOutput {
            digest: Digest {
                entries: selection.entries,
                metadata,
            },
            canonical_items: dedup.canonical,
            clusters: clustering.snapshot,
            assignments,
            rejected: intake.rejected,
            flags,
        })
    }
}
