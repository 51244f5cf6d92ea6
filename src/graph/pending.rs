//! FIFO of nodes awaiting a solving-rule check.
//!
//! Strict arrival order is load-bearing: it makes the sequence of solved
//! blocks deterministic for a fixed check-block arrival order, and it gives
//! the earliest-enqueued candidate priority when more than one rule could
//! fire. Duplicate entries are expected; the resolver discards a stale entry
//! when it observes the node no longer qualifies.

use crate::graph::metrics::GraphMetrics;
use crate::graph::pool::{CellPool, CellRef, NIL};
use crate::graph::NodeId;

/// Queue links live in the shared cell pool, so an enqueue costs one cell
/// acquire and a dequeue returns it.
#[derive(Debug)]
pub(crate) struct PendingQueue {
    head: CellRef,
    tail: CellRef,
    len: usize,
}

impl PendingQueue {
    pub(crate) const fn new() -> Self {
        Self {
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn push(&mut self, pool: &mut CellPool, node: NodeId, metrics: &mut GraphMetrics) {
        let cell = pool.acquire(node);
        if self.tail == NIL {
            self.head = cell;
        } else {
            pool.set_next(self.tail, cell);
        }
        self.tail = cell;
        self.len += 1;
        metrics.record_pending_push(self.len);
    }

    pub(crate) fn pop(&mut self, pool: &mut CellPool) -> Option<NodeId> {
        if self.head == NIL {
            return None;
        }
        let cell = self.head;
        let node = pool.value(cell);
        self.head = pool.next(cell);
        if self.head == NIL {
            self.tail = NIL;
        }
        self.len -= 1;
        pool.release(cell);
        Some(node)
    }

    pub(crate) fn flush(&mut self, pool: &mut CellPool) {
        while self.pop(pool).is_some() {}
    }
}
