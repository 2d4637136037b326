//! Entry storage, result ordering and the best-first top-k walk shared by
//! both tree variants.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use smallvec::SmallVec;

use crate::arena::NodeId;
use crate::error::{AutocompleteError, Result};
use crate::policy::AggregationPolicy;

// =============================================================================
// Ranking
// =============================================================================

/// Result order position of an entry. Greater ranks come first: heavier
/// weight, then earlier insertion.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Rank {
    pub weight: f64,
    /// Tree-wide insertion counter value assigned when the entry was created.
    pub seq: u64,
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

// =============================================================================
// Entries
// =============================================================================

/// A value stored at the node whose prefix equals its full sequence.
#[derive(Clone, Debug)]
pub(crate) struct Entry<V> {
    pub value: V,
    pub weight: f64,
    pub seq: u64,
}

impl<V> Entry<V> {
    #[inline]
    pub fn rank(&self) -> Rank {
        Rank {
            weight: self.weight,
            seq: self.seq,
        }
    }
}

/// Adds `weight` to the entry already holding `value`, or appends a new entry
/// stamped with the next insertion number. Returns the entry's rank after the
/// update and whether it was appended.
pub(crate) fn accumulate<V: PartialEq>(
    entries: &mut Vec<Entry<V>>,
    value: V,
    weight: f64,
    next_seq: &mut u64,
) -> (Rank, bool) {
    if let Some(existing) = entries.iter_mut().find(|e| e.value == value) {
        existing.weight += weight;
        return (existing.rank(), false);
    }
    let entry = Entry {
        value,
        weight,
        seq: *next_seq,
    };
    let rank = entry.rank();
    entries.push(entry);
    *next_seq += 1;
    (rank, true)
}

// =============================================================================
// Subtree summaries
// =============================================================================

/// Aggregate over every entry in a subtree, cached on each node.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Summary {
    /// Sum of individual entry weights.
    pub total: f64,
    /// Number of entries.
    pub count: usize,
    /// Highest-ranked entry anywhere in the subtree.
    pub best: Option<Rank>,
}

impl Summary {
    /// Recomputes a node's summary from its own entries and its children's
    /// (already current) summaries.
    ///
    /// Children are folded in order of their best entry's insertion number,
    /// never in map iteration order, so equal trees produce bit-identical
    /// totals.
    pub fn of<'a, V>(
        entries: &[Entry<V>],
        children: impl IntoIterator<Item = &'a Summary>,
    ) -> Self {
        let mut s = Summary::default();
        for e in entries {
            s.total += e.weight;
            s.count += 1;
            s.best = s.best.max(Some(e.rank()));
        }
        let mut children: SmallVec<[&Summary; 8]> = children.into_iter().collect();
        children.sort_unstable_by_key(|c| c.best.map(|r| r.seq));
        for c in children {
            s.total += c.total;
            s.count += c.count;
            s.best = s.best.max(c.best);
        }
        s
    }

    /// Folds one accumulated insert into a summary on the inserted entry's
    /// path. `rank` is the entry's rank after the insert.
    #[inline]
    pub fn record_insert(&mut self, weight: f64, rank: Rank, appended: bool) {
        self.total += weight;
        self.count += usize::from(appended);
        self.best = self.best.max(Some(rank));
    }

    #[inline]
    pub fn weight(&self, policy: AggregationPolicy) -> f64 {
        policy.aggregate(self.total, self.count)
    }
}

// =============================================================================
// Precondition checks
// =============================================================================

pub(crate) fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(AutocompleteError::InvalidWeight(weight))
    }
}

/// `None` means unbounded.
pub(crate) fn check_limit(limit: Option<usize>) -> Result<usize> {
    match limit {
        Some(0) => Err(AutocompleteError::InvalidLimit),
        Some(n) => Ok(n),
        None => Ok(usize::MAX),
    }
}

// =============================================================================
// Best-first top-k
// =============================================================================

/// Read access the top-k walk needs from a tree's node storage.
pub(crate) trait RankedNodes<V> {
    fn summary(&self, id: NodeId) -> &Summary;
    fn entries(&self, id: NodeId) -> &[Entry<V>];
    fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_;
}

enum Candidate<'a, V> {
    Node(NodeId),
    Entry(&'a Entry<V>),
}

struct Frontier<'a, V> {
    rank: Rank,
    candidate: Candidate<'a, V>,
}

impl<V> Frontier<'_, V> {
    #[inline]
    fn is_entry(&self) -> bool {
        matches!(self.candidate, Candidate::Entry(_))
    }
}

impl<V> Ord for Frontier<'_, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.is_entry().cmp(&other.is_entry()))
    }
}

impl<V> PartialOrd for Frontier<'_, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> PartialEq for Frontier<'_, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V> Eq for Frontier<'_, V> {}

/// Returns up to `limit` entries of the subtree under `start`, best first.
///
/// A node's key in the frontier is the best rank anywhere beneath it, so an
/// entry popped from the heap outranks everything still unexplored. Only the
/// nodes on the way to the emitted entries (and their immediate children) are
/// visited.
pub(crate) fn top_k<'a, V, N>(nodes: &'a N, start: NodeId, limit: usize) -> Vec<&'a Entry<V>>
where
    N: RankedNodes<V>,
{
    let mut out = Vec::new();
    let mut frontier: BinaryHeap<Frontier<'a, V>> = BinaryHeap::new();
    if let Some(rank) = nodes.summary(start).best {
        frontier.push(Frontier {
            rank,
            candidate: Candidate::Node(start),
        });
    }

    while out.len() < limit {
        let Some(next) = frontier.pop() else {
            break;
        };
        match next.candidate {
            Candidate::Entry(entry) => out.push(entry),
            Candidate::Node(id) => {
                for entry in nodes.entries(id) {
                    frontier.push(Frontier {
                        rank: entry.rank(),
                        candidate: Candidate::Entry(entry),
                    });
                }
                for child in nodes.children(id) {
                    if let Some(rank) = nodes.summary(child).best {
                        frontier.push(Frontier {
                            rank,
                            candidate: Candidate::Node(child),
                        });
                    }
                }
            }
        }
    }
    out
}

/// Clones the top-k entries under `start` into `(value, weight)` pairs.
pub(crate) fn collect_ranked<V, N>(nodes: &N, start: NodeId, limit: usize) -> Vec<(V, f64)>
where
    V: Clone,
    N: RankedNodes<V>,
{
    top_k(nodes, start, limit)
        .into_iter()
        .map(|e| (e.value.clone(), e.weight))
        .collect()
}
