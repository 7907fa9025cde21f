use std::collections::BTreeSet;

use crate::cluster::Cluster;
use crate::dedup::CanonicalItem;
use crate::item::Lane;
use crate::types::identifiers::ItemId;

/// A scored (item, lane) pair located in its cluster, ready to be placed.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Position of the originating assignment.
    pub index: usize,
    pub item: &'a CanonicalItem,
    pub cluster: &'a Cluster,
    pub lane: Lane,
    pub score: f64,
    pub novelty: f64,
}

pub struct BudgetResult<'a> {
    pub selected: Vec<Candidate<'a>>,
    /// Candidates left out because the budget ran out, in visit order.
    pub skipped: Vec<Candidate<'a>>,
}

/// Take candidates in order until `budget` are held.
///
/// Items already in `taken` are discarded rather than skipped, so an item
/// lands in the digest at most once; every selection is added to `taken`.
pub fn apply_budget<'a>(
    candidates: impl IntoIterator<Item = Candidate<'a>>,
    budget: usize,
    taken: &mut BTreeSet<ItemId>,
) -> BudgetResult<'a> {
    let mut selected = Vec::new();
    let mut skipped = Vec::new();

    for candidate in candidates {
        if taken.contains(candidate.item.id()) {
            continue;
        }
        if selected.len() < budget {
            taken.insert(candidate.item.id().clone());
            selected.push(candidate);
        } else {
            skipped.push(candidate);
        }
    }

    BudgetResult { selected, skipped }
}
