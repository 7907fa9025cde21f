use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identifier of a content item, as assigned upstream by enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ids are compared verbatim; only whitespace-only ids are considered missing.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

/// Identifier of the source (feed, API, site) an item was fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        SourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        SourceId(s.to_string())
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        SourceId(s)
    }
}

const MINTED_PREFIX: &str = "cl-";
const DEGRADED_PREFIX: &str = "solo-";
const MINTED_HEX_LEN: usize = 16;

/// Storyline cluster identity, carried across runs through the cluster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(id: impl Into<String>) -> Self {
        ClusterId(id.into())
    }

    /// Mint a content-derived id for a storyline anchored by `anchor`.
    ///
    /// `attempt` is folded into the hash so that callers can re-mint on
    /// collision and still get the same answer on every run.
    pub fn mint(anchor: &ItemId, attempt: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(anchor.as_str().as_bytes());
        if attempt > 0 {
            hasher.update(b"#");
            hasher.update(attempt.to_be_bytes());
        }

        let hash = hasher.finalize();
        let hex = hex::encode(hash);

        ClusterId(format!("{MINTED_PREFIX}{}", &hex[..MINTED_HEX_LEN]))
    }

    /// Singleton cluster for an item that cannot be placed by embedding.
    pub fn degraded(item: &ItemId) -> Self {
        ClusterId(format!("{DEGRADED_PREFIX}{}", item.as_str()))
    }

    pub fn is_degraded(&self) -> bool {
        self.0.starts_with(DEGRADED_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
