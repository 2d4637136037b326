//! Uncompressed weighted trie: one node per distinct prefix.
//!
//! This is the reference structure. [`CompressedPrefixTree`](crate::CompressedPrefixTree)
//! must return exactly the same results for every operation sequence.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::arena::{Arena, NodeId};
use crate::error::Result;
use crate::policy::AggregationPolicy;
use crate::rank::{
    accumulate, check_limit, check_weight, collect_ranked, Entry, RankedNodes, Summary,
};
use crate::Autocompleter;

#[derive(Clone, Debug)]
struct Node<V, T> {
    children: HashMap<T, NodeId>,
    /// Entries whose sequence ends exactly here.
    entries: Vec<Entry<V>>,
    summary: Summary,
}

impl<V, T> Default for Node<V, T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            entries: Vec::new(),
            summary: Summary::default(),
        }
    }
}

impl<V, T> Node<V, T> {
    #[inline]
    fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.children.is_empty()
    }

    fn child_ids(&self) -> Vec<NodeId> {
        self.children.values().copied().collect()
    }
}

impl<V, T> RankedNodes<V> for Arena<Node<V, T>> {
    fn summary(&self, id: NodeId) -> &Summary {
        &self[id].summary
    }

    fn entries(&self, id: NodeId) -> &[Entry<V>] {
        &self[id].entries
    }

    fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self[id].children.values().copied()
    }
}

// =============================================================================
// Public tree
// =============================================================================

/// A multiway trie with one node per prefix length per distinct prefix.
///
/// Nodes live in a slot arena and link to children by handle, so sequence
/// length never shows up as recursion depth: inserting, removing, querying
/// and dropping a 100k-token sequence all run in constant stack.
///
/// ```rust
/// use weighted_prefix_tree::{AggregationPolicy, Autocompleter, SimplePrefixTree};
///
/// let mut tree = SimplePrefixTree::new(AggregationPolicy::Sum);
/// tree.insert("cat", 1.0, &['c', 'a', 't'])?;
/// tree.insert("car", 2.0, &['c', 'a', 'r'])?;
///
/// assert_eq!(tree.autocomplete(&['c'], None)?, vec![("car", 2.0), ("cat", 1.0)]);
/// assert_eq!(tree.weight_of(&['c', 'a']), Some(3.0));
/// # Ok::<(), weighted_prefix_tree::AutocompleteError>(())
/// ```
#[derive(Clone, Debug)]
pub struct SimplePrefixTree<V, T> {
    nodes: Arena<Node<V, T>>,
    policy: AggregationPolicy,
    next_seq: u64,
}

impl<V, T> SimplePrefixTree<V, T> {
    /// Creates an empty tree aggregating with `policy`.
    pub fn new(policy: AggregationPolicy) -> Self {
        Self {
            nodes: Arena::with_root(Node::default()),
            policy,
            next_seq: 0,
        }
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn refresh(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        let children = node.children.values().map(|&c| &self.nodes[c].summary);
        let summary = Summary::of(&node.entries, children);
        self.nodes[id].summary = summary;
    }

    /// Frees `id` and all of its descendants.
    fn release_subtree(&mut self, id: NodeId) -> usize {
        self.nodes.release_subtree(id, Node::child_ids)
    }
}

impl<V, T: Eq + Hash + Clone> SimplePrefixTree<V, T> {
    fn locate(&self, prefix: &[T]) -> Option<NodeId> {
        let mut id = NodeId::ROOT;
        for token in prefix {
            id = *self.nodes[id].children.get(token)?;
        }
        Some(id)
    }
}

impl<V, T> Default for SimplePrefixTree<V, T> {
    fn default() -> Self {
        Self::new(AggregationPolicy::default())
    }
}

impl<V, T> Autocompleter<V, T> for SimplePrefixTree<V, T>
where
    V: Clone + PartialEq,
    T: Eq + Hash + Clone,
{
    fn insert(&mut self, value: V, weight: f64, prefix: &[T]) -> Result<()> {
        check_weight(weight)?;

        let mut path = Vec::with_capacity(prefix.len() + 1);
        let mut id = NodeId::ROOT;
        path.push(id);
        for token in prefix {
            let existing = self.nodes[id].children.get(token).copied();
            id = match existing {
                Some(child) => child,
                None => {
                    let child = self.nodes.alloc(Node::default());
                    self.nodes[id].children.insert(token.clone(), child);
                    child
                }
            };
            path.push(id);
        }

        let (rank, appended) =
            accumulate(&mut self.nodes[id].entries, value, weight, &mut self.next_seq);
        for id in path {
            self.nodes[id].summary.record_insert(weight, rank, appended);
        }
        Ok(())
    }

    fn autocomplete(&self, prefix: &[T], limit: Option<usize>) -> Result<Vec<(V, f64)>> {
        let limit = check_limit(limit)?;
        Ok(self
            .locate(prefix)
            .map(|id| collect_ranked(&self.nodes, id, limit))
            .unwrap_or_default())
    }

    fn remove(&mut self, prefix: &[T]) {
        // path[i] is the node for prefix[..i].
        let mut path = Vec::with_capacity(prefix.len() + 1);
        let mut id = NodeId::ROOT;
        path.push(id);
        for token in prefix {
            let Some(&child) = self.nodes[id].children.get(token) else {
                return;
            };
            id = child;
            path.push(id);
        }

        let removed = self.nodes[id].summary.count;
        if removed == 0 {
            return;
        }

        let depth = prefix.len();
        if depth == 0 {
            let root = &mut self.nodes[NodeId::ROOT];
            let children = root.child_ids();
            root.children.clear();
            root.entries.clear();
            for child in children {
                self.release_subtree(child);
            }
        } else {
            self.nodes[path[depth - 1]].children.remove(&prefix[depth - 1]);
            self.release_subtree(id);
        }

        for i in (0..depth).rev() {
            let id = path[i];
            if i > 0 && self.nodes[id].is_empty() {
                self.nodes[path[i - 1]].children.remove(&prefix[i - 1]);
                self.nodes.release(id);
                trace!(depth = i, "pruned empty node");
            } else {
                self.refresh(id);
            }
        }
        if depth == 0 {
            self.refresh(NodeId::ROOT);
        }
        debug!(prefix_len = prefix.len(), removed, "removed entries");
    }

    fn len(&self) -> usize {
        self.nodes[NodeId::ROOT].summary.count
    }

    fn weight_of(&self, prefix: &[T]) -> Option<f64> {
        self.locate(prefix)
            .map(|id| self.nodes[id].summary.weight(self.policy))
    }

    fn policy(&self) -> AggregationPolicy {
        self.policy
    }
}

// =============================================================================
// Structural checks (tests only)
// =============================================================================

#[cfg(test)]
impl<V: PartialEq, T> SimplePrefixTree<V, T> {
    /// Asserts that every cached summary matches a from-scratch recount, that
    /// no non-root node is empty, that values are unique per node, and that
    /// every live arena slot is reachable from the root.
    pub(crate) fn validate(&self) {
        let mut order = Vec::new();
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.values().copied());
        }
        assert_eq!(order.len(), self.nodes.len(), "unreachable nodes left allocated");

        // Children come after their parent in `order`, so walking it backwards
        // sees every subtree before its root.
        let mut totals: HashMap<NodeId, (f64, usize)> = HashMap::new();
        for &id in order.iter().rev() {
            let node = &self.nodes[id];
            if id != NodeId::ROOT {
                assert!(!node.is_empty(), "empty node left in the tree");
            }
            for (i, e) in node.entries.iter().enumerate() {
                assert!(
                    node.entries[..i].iter().all(|o| o.value != e.value),
                    "duplicate value stored twice at one node"
                );
            }
            let mut total: f64 = node.entries.iter().map(|e| e.weight).sum();
            let mut count = node.entries.len();
            for child in node.children.values() {
                let (t, c) = totals[child];
                total += t;
                count += c;
            }
            assert_eq!(node.summary.count, count, "stale entry count");
            assert!(
                (node.summary.total - total).abs() <= 1e-9 * total.abs().max(1.0),
                "stale total: cached {} vs actual {}",
                node.summary.total,
                total
            );
            assert_eq!(node.summary.best.is_some(), count > 0);
            totals.insert(id, (total, count));
        }
    }
}
