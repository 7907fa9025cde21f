//! Deduplication, clustering and ranking engine for a daily news digest.
//!
//! `brief-core` takes one batch of enriched content items and produces a
//! lane-organized digest: near-duplicates are collapsed to a canonical item,
//! canonical items are grouped into storylines whose ids persist across runs,
//! every item is scored per lane, and a bounded digest is selected with a
//! seeded share of exploratory picks. Runs are deterministic: identical
//! items, prior snapshot, `now` and configuration always produce identical
//! output.

pub mod cluster;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod item;
pub mod scoring;
pub mod selection;
pub mod similarity;
pub mod types;

pub use cluster::{Cluster, ClusterSnapshot};
pub use config::{ConfigError, EngineConfig, ScoringWeights};
pub use engine::DigestEngine;
pub use item::{ContentItem, Lane};
pub use types::digest::{Digest, DigestEntry, EngineError, RunFlags, RunOutput, ScoredAssignment};
pub use types::identifiers::{ClusterId, ItemId, SourceId};
