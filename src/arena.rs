//! Slot arena holding every node of a tree.
//!
//! Nodes refer to each other by [`NodeId`] instead of owning their children,
//! so no operation (including drop) recurses with tree depth. Released slots
//! go on a free list and are reused by later allocations.

use std::ops::{Index, IndexMut};

/// Handle to a node slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    /// Slot allocated by [`Arena::with_root`]; never released.
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Clone, Debug)]
pub(crate) struct Arena<N> {
    slots: Vec<N>,
    free: Vec<NodeId>,
    live: usize,
}

impl<N: Default> Arena<N> {
    pub fn with_root(root: N) -> Self {
        Self {
            slots: vec![root],
            free: Vec::new(),
            live: 1,
        }
    }

    pub fn alloc(&mut self, node: N) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = node;
                id
            }
            None => {
                self.slots.push(node);
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Takes the node out of its slot and frees the slot.
    pub fn release(&mut self, id: NodeId) -> N {
        debug_assert_ne!(id, NodeId::ROOT, "root slot is never released");
        self.live -= 1;
        self.free.push(id);
        std::mem::take(&mut self.slots[id.0])
    }

    /// Releases `id` and everything reachable from it through `children`.
    /// Returns the number of slots freed.
    pub fn release_subtree<I>(&mut self, id: NodeId, children: impl Fn(&N) -> I) -> usize
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut stack = vec![id];
        let mut freed = 0;
        while let Some(id) = stack.pop() {
            let node = self.release(id);
            stack.extend(children(&node));
            freed += 1;
        }
        freed
    }

    /// Number of live nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }
}

impl<N> Index<NodeId> for Arena<N> {
    type Output = N;

    #[inline]
    fn index(&self, id: NodeId) -> &N {
        &self.slots[id.0]
    }
}

impl<N> IndexMut<NodeId> for Arena<N> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.slots[id.0]
    }
}
