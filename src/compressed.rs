//! Path-compressed weighted trie.
//!
//! Each node owns the maximal run of tokens between two branch points, so the
//! depth of the tree is bounded by the number of branching points rather than
//! by sequence length. Outside the root, every node either stores entries or
//! has at least two children. Inserts restore that by splitting a run where a
//! new sequence diverges, removes by merging a node into its last child.

use std::collections::HashMap;
use std::hash::Hash;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::arena::{Arena, NodeId};
use crate::error::Result;
use crate::policy::AggregationPolicy;
use crate::rank::{
    accumulate, check_limit, check_weight, collect_ranked, Entry, RankedNodes, Summary,
};
use crate::Autocompleter;

/// Tokens owned by one node. Most runs in text corpora are short.
type Run<T> = SmallVec<[T; 8]>;

#[inline]
fn common_prefix_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[derive(Clone, Debug)]
struct Node<V, T> {
    /// Tokens from the parent's branch point to this node. Empty only at the root.
    run: Run<T>,
    /// Keyed by the first token of each child's run.
    children: HashMap<T, NodeId>,
    entries: Vec<Entry<V>>,
    summary: Summary,
}

impl<V, T> Default for Node<V, T> {
    fn default() -> Self {
        Self {
            run: Run::new(),
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

/// A prefix tree whose non-branching chains are collapsed into single nodes.
///
/// Results are identical to [`SimplePrefixTree`](crate::SimplePrefixTree) for
/// the same operations, down to the last bit of every aggregated weight; only
/// the node layout differs.
///
/// ```rust
/// use weighted_prefix_tree::{AggregationPolicy, Autocompleter, CompressedPrefixTree};
///
/// let mut tree = CompressedPrefixTree::new(AggregationPolicy::Average);
/// tree.insert("cat", 1.0, &['c', 'a', 't'])?;
/// tree.insert("car", 3.0, &['c', 'a', 'r'])?;
///
/// // root -> "ca" -> {"t", "r"}
/// assert_eq!(tree.node_count(), 4);
/// assert_eq!(tree.weight_of(&['c']), Some(2.0));
/// assert_eq!(tree.autocomplete(&['c'], Some(1))?, vec![("car", 3.0)]);
/// # Ok::<(), weighted_prefix_tree::AutocompleteError>(())
/// ```
#[derive(Clone, Debug)]
pub struct CompressedPrefixTree<V, T> {
    nodes: Arena<Node<V, T>>,
    policy: AggregationPolicy,
    next_seq: u64,
}

impl<V, T> CompressedPrefixTree<V, T> {
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

    fn release_subtree(&mut self, id: NodeId) -> usize {
        self.nodes.release_subtree(id, Node::child_ids)
    }

    /// Folds an entry-less node into its only child and returns the child,
    /// which takes over the node's place (and key) under its parent. The
    /// child's summary already covers the whole subtree.
    fn merge_single_child(&mut self, id: NodeId) -> NodeId {
        debug_assert!(self.nodes[id].entries.is_empty() && self.nodes[id].children.len() == 1);
        let Some(child) = self.nodes[id].children.values().next().copied() else {
            return id;
        };
        let mut run = self.nodes.release(id).run;
        let tail = &mut self.nodes[child].run;
        trace!(head_len = run.len(), tail_len = tail.len(), "merged node into child");
        run.extend(tail.drain(..));
        *tail = run;
        child
    }
}

impl<V, T: Eq + Hash + Clone> CompressedPrefixTree<V, T> {
    /// Splits the run of `id` at `at` and returns a new head node that owns
    /// `run[..at]` and has `id` (now owning `run[at..]`) as its only child.
    ///
    /// The head carries the original summary so ancestors stay correct until
    /// the caller finishes its insert below the head.
    fn split_at(&mut self, id: NodeId, at: usize) -> NodeId {
        let node = &mut self.nodes[id];
        debug_assert!(at > 0 && at < node.run.len());
        let tail: Run<T> = node.run.drain(at..).collect();
        let head = std::mem::replace(&mut node.run, tail);
        trace!(head_len = head.len(), tail_len = node.run.len(), "split node");

        let summary = node.summary;
        let mut children = HashMap::with_capacity(2);
        children.insert(node.run[0].clone(), id);
        self.nodes.alloc(Node {
            run: head,
            children,
            entries: Vec::new(),
            summary,
        })
    }

    /// Finds the node whose subtree holds exactly the sequences starting with
    /// `prefix`. The prefix may end part-way through that node's run.
    fn locate(&self, prefix: &[T]) -> Option<NodeId> {
        let mut id = NodeId::ROOT;
        let mut rest = prefix;
        while let Some(first) = rest.first() {
            let child = *self.nodes[id].children.get(first)?;
            let run = &self.nodes[child].run;
            let shared = common_prefix_len(run, rest);
            if shared == rest.len() {
                return Some(child);
            }
            if shared < run.len() {
                return None;
            }
            rest = &rest[shared..];
            id = child;
        }
        Some(id)
    }
}

impl<V, T> Default for CompressedPrefixTree<V, T> {
    fn default() -> Self {
        Self::new(AggregationPolicy::default())
    }
}

impl<V, T> Autocompleter<V, T> for CompressedPrefixTree<V, T>
where
    V: Clone + PartialEq,
    T: Eq + Hash + Clone,
{
    fn insert(&mut self, value: V, weight: f64, prefix: &[T]) -> Result<()> {
        check_weight(weight)?;

        let mut path = vec![NodeId::ROOT];
        let mut id = NodeId::ROOT;
        let mut rest = prefix;
        while let Some(first) = rest.first() {
            let Some(child) = self.nodes[id].children.get(first).copied() else {
                let leaf = self.nodes.alloc(Node {
                    run: rest.iter().cloned().collect(),
                    ..Node::default()
                });
                self.nodes[id].children.insert(first.clone(), leaf);
                id = leaf;
                path.push(id);
                break;
            };
            let shared = common_prefix_len(&self.nodes[child].run, rest);
            id = if shared < self.nodes[child].run.len() {
                // Same first token, so the head replaces the child under one key.
                let head = self.split_at(child, shared);
                self.nodes[id].children.insert(first.clone(), head);
                head
            } else {
                child
            };
            path.push(id);
            rest = &rest[shared..];
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
        let mut ancestors = Vec::new();
        let mut id = NodeId::ROOT;
        let mut rest = prefix;
        while let Some(first) = rest.first() {
            let Some(child) = self.nodes[id].children.get(first).copied() else {
                return;
            };
            let shared = common_prefix_len(&self.nodes[child].run, rest);
            // Stop unless the query ends inside this run or consumes all of it.
            if shared < rest.len() && shared < self.nodes[child].run.len() {
                return;
            }
            ancestors.push(id);
            id = child;
            rest = &rest[shared..];
        }

        let removed = self.nodes[id].summary.count;
        if removed == 0 {
            return;
        }

        match ancestors.last() {
            None => {
                let root = &mut self.nodes[NodeId::ROOT];
                let children = root.child_ids();
                root.children.clear();
                root.entries.clear();
                for child in children {
                    self.release_subtree(child);
                }
                self.refresh(NodeId::ROOT);
            }
            Some(&parent) => {
                let key = self.nodes[id].run[0].clone();
                self.nodes[parent].children.remove(&key);
                let freed = self.release_subtree(id);
                trace!(freed, "dropped matching subtree");
            }
        }

        for i in (0..ancestors.len()).rev() {
            let id = ancestors[i];
            if i == 0 {
                self.refresh(id);
                continue;
            }
            let parent = ancestors[i - 1];
            let node = &self.nodes[id];
            if node.is_empty() {
                let key = node.run[0].clone();
                self.nodes[parent].children.remove(&key);
                self.nodes.release(id);
                trace!("pruned empty node");
            } else if node.entries.is_empty() && node.children.len() == 1 {
                let key = node.run[0].clone();
                let merged = self.merge_single_child(id);
                self.nodes[parent].children.insert(key, merged);
            } else {
                self.refresh(id);
            }
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
impl<V: PartialEq, T: Eq + Hash> CompressedPrefixTree<V, T> {
    /// Asserts maximal compression, child keying, that every cached summary
    /// matches a from-scratch recount, and that every live arena slot is
    /// reachable from the root.
    pub(crate) fn validate(&self) {
        let mut order = Vec::new();
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.values().copied());
        }
        assert_eq!(order.len(), self.nodes.len(), "unreachable nodes left allocated");

        let mut totals: HashMap<NodeId, (f64, usize)> = HashMap::new();
        for &id in order.iter().rev() {
            let node = &self.nodes[id];
            if id == NodeId::ROOT {
                assert!(node.run.is_empty(), "root must not own tokens");
            } else {
                assert!(!node.run.is_empty(), "non-root node with an empty run");
                assert!(
                    !node.entries.is_empty() || node.children.len() >= 2,
                    "uncompressed node: {} entries, {} children",
                    node.entries.len(),
                    node.children.len()
                );
            }
            for (i, e) in node.entries.iter().enumerate() {
                assert!(
                    node.entries[..i].iter().all(|o| o.value != e.value),
                    "duplicate value stored twice at one node"
                );
            }
            let mut total: f64 = node.entries.iter().map(|e| e.weight).sum();
            let mut count = node.entries.len();
            for (key, child) in &node.children {
                assert!(
                    self.nodes[*child].run.first() == Some(key),
                    "child keyed by a token other than its first"
                );
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

    /// The node reached by following child keys from the root.
    fn node_at(&self, keys: &[T]) -> &Node<V, T> {
        let mut id = NodeId::ROOT;
        for key in keys {
            id = self.nodes[id].children[key];
        }
        &self.nodes[id]
    }
}
