//! Engine configuration.
//!
//! Every threshold, weight and budget the engine uses lives here so that a
//! run can be repeated with different tuning without touching stage logic.
//! Thresholds carry illustrative defaults; scoring weights deliberately do
//! not, and a config without a `[weights]` table fails validation.
//!
//! Loaded from TOML or JSON:
//!
//! ```toml
//! [weights]
//! recency = 0.25
//! trust = 0.20
//! lane = 0.30
//! popularity = 0.10
//! novelty = 0.15
//!
//! [selection]
//! max_digest_size = 25
//! novelty_fraction = 0.25
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ENV_PATH: &str = "BRIEF_ENGINE_CONFIG";
const DEFAULT_TOML: &str = "config/engine.toml";
const DEFAULT_JSON: &str = "config/engine.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("BRIEF_ENGINE_CONFIG points to a non-existent path: {}", .0.display())]
    MissingEnvPath(PathBuf),
    #[error("No engine configuration found")]
    NotFound,
    #[error("Scoring weights are absent")]
    MissingWeights,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Composite score weights. No defaults: these are always supplied externally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub recency: f64,
    pub trust: f64,
    pub lane: f64,
    pub popularity: f64,
    pub novelty: f64,
}

impl ScoringWeights {
    fn as_array(&self) -> [(&'static str, f64); 5] {
        [
            ("recency", self.recency),
            ("trust", self.trust),
            ("lane", self.lane),
            ("popularity", self.popularity),
            ("novelty", self.novelty),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Weight of title token overlap in the composite.
    pub title_weight: f64,
    /// Weight of embedding cosine in the composite.
    pub embedding_weight: f64,
    /// Title similarity a pair needs before embeddings are compared.
    /// Pairs at or above this value are always fully evaluated.
    pub embedding_prefilter: f64,
    /// Expected embedding length. When unset the most common length in the
    /// batch is used.
    pub embedding_dimension: Option<usize>,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            title_weight: 0.4,
            embedding_weight: 0.6,
            embedding_prefilter: 0.1,
            embedding_dimension: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub duplicate_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub continuity_threshold: f64,
    /// Advisory cluster-count band; leaving it is reported, never corrected.
    pub min_clusters: usize,
    pub max_clusters: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            continuity_threshold: 0.75,
            min_clusters: 5,
            max_clusters: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Items at or below this lane score are never scored for the lane.
    pub min_lane_score: f64,
    pub recency_half_life_hours: f64,
    pub novelty_half_life_hours: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_lane_score: 0.1,
            recency_half_life_hours: 48.0,
            novelty_half_life_hours: 72.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Top-N per (lane, cluster).
    pub per_group_limit: usize,
    pub min_digest_size: usize,
    pub max_digest_size: usize,
    /// Share of the digest reserved for exploratory picks.
    pub novelty_fraction: f64,
    /// Acceptance floor on composite score for exploratory picks.
    pub novelty_min_score: f64,
    /// Minimum novelty signal for exploratory picks.
    pub novelty_min_signal: f64,
    pub seed: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            per_group_limit: 3,
            min_digest_size: 15,
            max_digest_size: 25,
            novelty_fraction: 0.25,
            novelty_min_score: 0.3,
            novelty_min_signal: 0.5,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub weights: Option<ScoringWeights>,
    /// Per-source trust weights that override the value carried on items.
    #[serde(default)]
    pub source_trust: BTreeMap<String, f64>,
}

impl EngineConfig {
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self {
            weights: Some(weights),
            ..Self::default()
        }
    }

    /// Parse from TOML or JSON, using the extension as a hint.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let config = if ext == "json" {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Resolve the config location:
    /// 1) `$BRIEF_ENGINE_CONFIG`
    /// 2) `config/engine.toml`
    /// 3) `config/engine.json`
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ConfigError::MissingEnvPath(pb));
            }
            return Self::load_from(&pb);
        }
        for candidate in [DEFAULT_TOML, DEFAULT_JSON] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Err(ConfigError::NotFound)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Weights, or the run-level failure when they were never supplied.
    pub fn weights(&self) -> Result<ScoringWeights, ConfigError> {
        self.weights.ok_or(ConfigError::MissingWeights)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.weights()?;
        for (name, value) in weights.as_array() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "weight `{name}` must be a finite non-negative number, got {value}"
                )));
            }
        }
        if weights.as_array().iter().all(|(_, v)| *v == 0.0) {
            return Err(ConfigError::Invalid("all scoring weights are zero".into()));
        }

        let unit = [
            ("dedup.duplicate_threshold", self.dedup.duplicate_threshold),
            ("clustering.continuity_threshold", self.clustering.continuity_threshold),
            ("similarity.embedding_prefilter", self.similarity.embedding_prefilter),
            ("scoring.min_lane_score", self.scoring.min_lane_score),
            ("selection.novelty_fraction", self.selection.novelty_fraction),
            ("selection.novelty_min_signal", self.selection.novelty_min_signal),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "`{name}` must lie in [0, 1], got {value}"
                )));
            }
        }

        let sim = &self.similarity;
        let finite = sim.title_weight.is_finite() && sim.embedding_weight.is_finite();
        if !(finite && sim.title_weight >= 0.0 && sim.embedding_weight >= 0.0)
            || sim.title_weight + sim.embedding_weight <= 0.0
        {
            return Err(ConfigError::Invalid(
                "similarity weights must be finite and non-negative with a positive sum".into(),
            ));
        }
        if sim.embedding_dimension == Some(0) {
            return Err(ConfigError::Invalid("embedding_dimension must be positive".into()));
        }

        for (name, value) in [
            ("scoring.recency_half_life_hours", self.scoring.recency_half_life_hours),
            ("scoring.novelty_half_life_hours", self.scoring.novelty_half_life_hours),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("`{name}` must be positive, got {value}")));
            }
        }
        if !self.selection.novelty_min_score.is_finite() {
            return Err(ConfigError::Invalid("selection.novelty_min_score must be finite".into()));
        }

        let sel = &self.selection;
        if sel.per_group_limit == 0 {
            return Err(ConfigError::Invalid("selection.per_group_limit must be at least 1".into()));
        }
        if sel.max_digest_size == 0 || sel.min_digest_size > sel.max_digest_size {
            return Err(ConfigError::Invalid(format!(
                "digest size range {}..={} is empty",
                sel.min_digest_size, sel.max_digest_size
            )));
        }
        let cl = &self.clustering;
        if cl.min_clusters > cl.max_clusters {
            return Err(ConfigError::Invalid(format!(
                "cluster count band {}..={} is empty",
                cl.min_clusters, cl.max_clusters
            )));
        }
        Ok(())
    }
}
