//! Edge storage: dense down-edge arrays and pooled up-edge lists.
//!
//! Every edge joins a higher-id node to a lower-id node and is indexed from
//! both endpoints so the solver gets O(1) neighbour access in either
//! direction. The down side is a fixed-capacity array whose live prefix
//! shrinks by swap-with-last; the up side is a singly-linked chain of pool
//! cells, because up edges are created one at a time as check blocks arrive
//! and die one at a time as their down counterparts are eliminated.

use crate::graph::metrics::GraphMetrics;
use crate::graph::pool::{CellPool, CellRef, NIL};
use crate::graph::NodeId;

/// Down-edges of one auxiliary or check node.
///
/// Capacity is fixed at the node's initial degree; removal swaps the victim
/// with the last live entry and shortens the prefix.
#[derive(Debug)]
pub(crate) struct DownEdges {
    ids: Box<[NodeId]>,
    len: usize,
}

impl DownEdges {
    pub(crate) fn new(ids: Vec<NodeId>) -> Self {
        let len = ids.len();
        Self {
            ids: ids.into_boxed_slice(),
            len,
        }
    }

    pub(crate) fn as_slice(&self) -> &[NodeId] {
        &self.ids[..self.len]
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Removes and returns the entry at `index`, filling the hole with the
    /// last live entry.
    pub(crate) fn swap_remove(&mut self, index: usize) -> NodeId {
        assert!(index < self.len, "down-edge index {index} out of bounds");
        let value = self.ids[index];
        self.ids[index] = self.ids[self.len - 1];
        self.len -= 1;
        value
    }

    /// Consumes the live prefix.
    pub(crate) fn into_ids(self) -> Vec<NodeId> {
        let mut ids = self.ids.into_vec();
        ids.truncate(self.len);
        ids
    }
}

/// Up-edge lists for every composite node, heads into the shared cell pool.
#[derive(Debug)]
pub(crate) struct UpEdges {
    heads: Vec<CellRef>,
}

impl UpEdges {
    pub(crate) fn new(coblocks: usize) -> Self {
        Self {
            heads: vec![NIL; coblocks],
        }
    }

    /// Links `high` into `low`'s up-edge chain.
    pub(crate) fn add(&mut self, pool: &mut CellPool, low: NodeId, high: NodeId) {
        debug_assert!(high > low, "up edge must point to a higher id");
        let cell = pool.acquire(high);
        pool.set_next(cell, self.heads[low as usize]);
        self.heads[low as usize] = cell;
    }

    /// First cell of `low`'s chain, or `NIL`.
    pub(crate) fn head(&self, low: NodeId) -> CellRef {
        self.heads[low as usize]
    }

    /// Unlinks the edge `(high, low)` and returns its cell to the pool.
    ///
    /// Aborts if the edge does not exist: that means the two adjacency
    /// indices disagree, and the graph state is no longer trustworthy.
    pub(crate) fn remove(
        &mut self,
        pool: &mut CellPool,
        low: NodeId,
        high: NodeId,
        metrics: &mut GraphMetrics,
    ) {
        let mut hops = 0u64;
        let mut prev = NIL;
        let mut cur = self.heads[low as usize];
        while cur != NIL {
            if pool.value(cur) == high {
                let next = pool.next(cur);
                if prev == NIL {
                    self.heads[low as usize] = next;
                } else {
                    pool.set_next(prev, next);
                }
                pool.release(cur);
                metrics.record_edge_removal(hops);
                return;
            }
            prev = cur;
            cur = pool.next(cur);
            hops += 1;
        }
        unreachable!("up edge {low} -> {high} does not exist");
    }

    /// Whether `high` appears in `low`'s chain. Consistency checks only.
    pub(crate) fn contains(&self, pool: &CellPool, low: NodeId, high: NodeId) -> bool {
        let mut cur = self.heads[low as usize];
        while cur != NIL {
            if pool.value(cur) == high {
                return true;
            }
            cur = pool.next(cur);
        }
        false
    }

    /// Releases every remaining cell back to the pool.
    pub(crate) fn release_all(&mut self, pool: &mut CellPool) {
        for head in &mut self.heads {
            let mut cur = *head;
            while cur != NIL {
                let next = pool.next(cur);
                pool.release(cur);
                cur = next;
            }
            *head = NIL;
        }
    }
}
