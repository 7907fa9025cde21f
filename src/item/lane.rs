use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The fixed content categories a digest is organised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Builders,
    Security,
    Business,
}

impl Lane {
    /// All lanes in rendering order.
    pub const ALL: [Lane; 3] = [Lane::Builders, Lane::Security, Lane::Business];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Builders => "builders",
            Lane::Security => "security",
            Lane::Business => "business",
        }
    }

    pub fn parse(s: &str) -> Option<Lane> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builders" => Some(Lane::Builders),
            "security" => Some(Lane::Security),
            "business" => Some(Lane::Business),
            _ => None,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lane affinity scores produced by enrichment.
///
/// Values come from a model and are not trusted: every insert is clamped to
/// `[0.0, 1.0]`, non-finite values are dropped, and keys outside the lane
/// taxonomy are ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct LaneScores {
    inner: BTreeMap<Lane, f64>,
}

impl LaneScores {
    pub fn new() -> Self {
        LaneScores {
            inner: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, lane: Lane, score: f64) {
        if score.is_finite() {
            self.inner.insert(lane, score.clamp(0.0, 1.0));
        } else {
            self.inner.remove(&lane);
        }
    }

    /// Score for `lane`; absent lanes score zero.
    pub fn get(&self, lane: Lane) -> f64 {
        self.inner.get(&lane).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Lane, f64)> + '_ {
        self.inner.iter().map(|(lane, score)| (*lane, *score))
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<BTreeMap<String, f64>> for LaneScores {
    fn from(raw: BTreeMap<String, f64>) -> Self {
        let mut scores = LaneScores::new();
        for (key, value) in raw {
            if let Some(lane) = Lane::parse(&key) {
                scores.insert(lane, value);
            }
        }
        scores
    }
}

impl From<LaneScores> for BTreeMap<String, f64> {
    fn from(scores: LaneScores) -> Self {
        scores
            .inner
            .into_iter()
            .map(|(lane, score)| (lane.as_str().to_string(), score))
            .collect()
    }
}
