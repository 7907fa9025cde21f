//! Duplicate collapsing.
//!
//! Items whose composite similarity reaches the duplicate threshold are joined
//! by an edge; connected components are duplicate groups. Each group is
//! represented by one canonical item chosen by [`precedence`]; the other
//! members survive only as alternates on it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{DedupConfig, SimilarityConfig};
use crate::item::{precedence, ContentItem};
use crate::similarity::{SimilarityError, SimilarityIndex};
use crate::types::identifiers::{ItemId, SourceId};

/// Representative of a duplicate group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalItem {
    pub item: ContentItem,
    /// Sources that covered the same story. Never contains `item.source_id`.
    pub alternate_source_ids: BTreeSet<SourceId>,
    pub alternate_item_ids: BTreeSet<ItemId>,
    /// Merged member records, kept for traceability, in precedence order.
    #[serde(default)]
    pub alternates: Vec<ContentItem>,
}

impl CanonicalItem {
    pub fn singleton(item: ContentItem) -> Self {
        Self {
            item,
            alternate_source_ids: BTreeSet::new(),
            alternate_item_ids: BTreeSet::new(),
            alternates: Vec::new(),
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.item.id
    }
}

/// A pair whose similarity could not be computed; it was treated as distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFailure {
    pub left: ItemId,
    pub right: ItemId,
    pub error: SimilarityError,
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// One entry per duplicate group, ordered by id.
    pub canonical: Vec<CanonicalItem>,
    pub failures: Vec<PairFailure>,
    /// Groups with more than one member.
    pub merged_groups: usize,
}

pub struct Deduplicator {
    threshold: f64,
    similarity: SimilarityConfig,
}

impl Deduplicator {
    pub fn new(dedup: &DedupConfig, similarity: &SimilarityConfig) -> Self {
        Self {
            threshold: dedup.duplicate_threshold,
            similarity: similarity.clone(),
        }
    }

    pub fn run(&self, items: &[ContentItem]) -> DedupOutcome {
        let index = SimilarityIndex::build(items, &self.similarity);
        let mut groups = DisjointSet::new(items.len());
        let mut failures = Vec::new();

        for i in 0..index.len() {
            for j in (i + 1)..index.len() {
                match index.pair(i, j) {
                    Ok(sim) if sim.composite >= self.threshold => groups.union(i, j),
                    Ok(_) => {}
                    Err(error) => {
                        warn!(left = %items[i].id, right = %items[j].id, %error, "similarity failed; treating pair as distinct");
                        let (left, right) = if items[i].id <= items[j].id {
                            (&items[i].id, &items[j].id)
                        } else {
                            (&items[j].id, &items[i].id)
                        };
                        failures.push(PairFailure {
                            left: left.clone(),
                            right: right.clone(),
                            error,
                        });
                    }
                }
            }
        }
        failures.sort_by(|a, b| a.left.cmp(&b.left).then_with(|| a.right.cmp(&b.right)));

        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for idx in 0..items.len() {
            members.entry(groups.find(idx)).or_default().push(idx);
        }

        let mut merged_groups = 0;
        let mut canonical: Vec<CanonicalItem> = members
            .into_values()
            .map(|mut group| {
                group.sort_by(|&a, &b| precedence(&items[a], &items[b]));
                if group.len() > 1 {
                    merged_groups += 1;
                }
                collapse(items, &group)
            })
            .collect();
        canonical.sort_by(|a, b| a.item.id.cmp(&b.item.id));

        debug!(
            input = items.len(),
            canonical = canonical.len(),
            merged_groups,
            failures = failures.len(),
            "dedup complete"
        );

        DedupOutcome {
            canonical,
            failures,
            merged_groups,
        }
    }
}

/// `group` is sorted by precedence; its head becomes the canonical item.
fn collapse(items: &[ContentItem], group: &[usize]) -> CanonicalItem {
    let head = &items[group[0]];
    let mut canonical = CanonicalItem::singleton(head.clone());
    for &idx in &group[1..] {
        let member = &items[idx];
        canonical.alternate_item_ids.insert(member.id.clone());
        if member.source_id != head.source_id {
            canonical.alternate_source_ids.insert(member.source_id.clone());
        }
        canonical.alternates.push(member.clone());
    }
    canonical
}

/// Union-find with path halving; roots are always the smallest index of the
/// component so grouping does not depend on union order.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_set_is_transitive() {
        let mut set = DisjointSet::new(5);
        set.union(3, 4);
        set.union(0, 3);
        assert_eq!(set.find(4), 0);
        assert_eq!(set.find(3), 0);
        assert_eq!(set.find(1), 1);
        assert_ne!(set.find(2), set.find(4));
    }
}
