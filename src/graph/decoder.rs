//! The incremental solver: ingestion, the two solving rules, and cascade.
//!
//! # Solving rules
//!
//! For a dequeued node `from` with `u` unsolved down-neighbours:
//!
//! - **Propagation** (`u == 1`, `from` solved): the single unsolved
//!   down-neighbour `to` becomes solved; its XOR list is `from`'s list plus
//!   `from`'s remaining (all solved) down-neighbours, and `from` is
//!   decommissioned.
//! - **Aux rule** (`u == 0`, `from` an unsolved auxiliary): `from` becomes
//!   solved; its XOR list is its down-neighbour list verbatim, recorded by
//!   indirection rather than expanded, which keeps list growth linear.
//!
//! Every solve cascades: each up-neighbour's unsolved count drops by one, and
//! any that falls below 2 re-enters the pending FIFO. Up edges are removed
//! lazily when their owning node is dispatched, not during cascade.

use smallvec::SmallVec;
use std::collections::TryReserveError;

use crate::config::{AuxMapping, ConfigError, DecoderConfig};
use crate::graph::edges::{DownEdges, UpEdges};
use crate::graph::metrics::GraphMetrics;
use crate::graph::pending::PendingQueue;
use crate::graph::pool::{PoolHandle, NIL};
use crate::graph::xor_list::{ExpandedXor, XorStore};
use crate::graph::NodeId;

/// Errors produced while feeding check blocks into the graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// More check blocks arrived than the pre-sized node space admits.
    #[error("check node {node} exceeds the pre-sized node space {node_space}")]
    CheckSpaceExhausted {
        /// Id the rejected check block would have taken.
        node: usize,
        /// Total node capacity fixed at construction.
        node_space: usize,
    },
    /// The cell pool could not grow to hold the new node's edges.
    #[error("graph allocation failed")]
    Alloc(#[from] TryReserveError),
}

/// Outcome of a resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// True once every message block is solved. Latches.
    pub done: bool,
    /// Composite blocks solved by this call, in solving order.
    pub newly_solved: Vec<NodeId>,
}

/// Incremental bipartite-graph decoder for an Online Codes stream.
///
/// Construction fixes the block counts and the auxiliary mapping. Check
/// blocks are then fed one at a time with
/// [`ingest_check_block`](Self::ingest_check_block); each
/// [`resolve`](Self::resolve) call reports the composite blocks that became
/// recoverable, and [`xor_list`](Self::xor_list) /
/// [`expanded_xor_list`](Self::expanded_xor_list) name the received check
/// blocks whose payload XOR reproduces each of them.
#[derive(Debug)]
pub struct GraphDecoder {
    mblocks: usize,
    ablocks: usize,
    coblocks: usize,
    node_space: usize,
    /// Next node id to assign; starts at `coblocks`.
    nodes: usize,
    unsolved_count: usize,
    done: bool,
    /// Solved flags for composite nodes; check nodes are implicitly solved.
    solved: Vec<bool>,
    /// Unsolved down-edge counts, indexed by `node - mblocks`.
    edge_count: Vec<u32>,
    /// Down-edge arrays, indexed by `node - mblocks`; `None` once
    /// decommissioned.
    down: Vec<Option<DownEdges>>,
    up: UpEdges,
    xor: XorStore,
    pending: PendingQueue,
    pool: PoolHandle,
    metrics: GraphMetrics,
}

impl GraphDecoder {
    /// Creates a decoder using the thread's shared cell pool.
    pub fn new(config: &DecoderConfig, mapping: &AuxMapping) -> Result<Self, ConfigError> {
        Self::with_pool(config, mapping, PoolHandle::shared())
    }

    /// Creates a decoder drawing cells from `pool`.
    pub fn with_pool(
        config: &DecoderConfig,
        mapping: &AuxMapping,
        pool: PoolHandle,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        mapping.validate(config.mblocks, config.ablocks)?;

        let mblocks = config.mblocks;
        let ablocks = config.ablocks;
        let coblocks = config.coblocks();
        let check_space = config.check_space();
        let node_space = coblocks + check_space;

        let mut decoder = Self {
            mblocks,
            ablocks,
            coblocks,
            node_space,
            nodes: coblocks,
            unsolved_count: mblocks,
            done: false,
            solved: vec![false; coblocks],
            edge_count: vec![0; ablocks + check_space],
            down: (0..ablocks + check_space).map(|_| None).collect(),
            up: UpEdges::new(coblocks),
            xor: XorStore::new(coblocks as NodeId, node_space),
            pending: PendingQueue::new(),
            pool,
            metrics: GraphMetrics::default(),
        };

        let aux_lists = mapping.aux_lists();
        let edge_total: usize = aux_lists.iter().map(Vec::len).sum();
        {
            let mut pool = decoder.pool.borrow_mut();
            pool.grow(edge_total);
            for (slot, msgs) in aux_lists.iter().enumerate() {
                let aux = (mblocks + slot) as NodeId;
                for &msg in msgs {
                    decoder.up.add(&mut pool, msg, aux);
                }
                decoder.edge_count[slot] = msgs.len() as u32;
                decoder.down[slot] = Some(DownEdges::new(msgs.clone()));
            }
        }

        tracing::debug!(
            mblocks,
            ablocks,
            check_space,
            aux_edges = edge_total,
            "graph decoder initialised"
        );
        Ok(decoder)
    }

    /// Number of message blocks.
    #[must_use]
    pub const fn mblocks(&self) -> usize {
        self.mblocks
    }

    /// Number of auxiliary blocks.
    #[must_use]
    pub const fn ablocks(&self) -> usize {
        self.ablocks
    }

    /// Number of composite blocks (`mblocks + ablocks`).
    #[must_use]
    pub const fn coblocks(&self) -> usize {
        self.coblocks
    }

    /// Total ids in use: composite blocks plus ingested check blocks.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.nodes
    }

    /// Capacity fixed at construction.
    #[must_use]
    pub const fn node_space(&self) -> usize {
        self.node_space
    }

    /// Message blocks still unsolved.
    #[must_use]
    pub const fn unsolved_message_count(&self) -> usize {
        self.unsolved_count
    }

    /// True once every message block is solved.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Whether `node` is solved. Check nodes are solved by definition.
    #[must_use]
    pub fn is_solved(&self, node: NodeId) -> bool {
        assert!((node as usize) < self.nodes, "node {node} does not exist");
        (node as usize) >= self.coblocks || self.solved[node as usize]
    }

    /// Instrumentation counters.
    #[must_use]
    pub const fn metrics(&self) -> &GraphMetrics {
        &self.metrics
    }

    /// The pool this decoder draws cells from.
    #[must_use]
    pub const fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    /// A solved node's frozen XOR list: check-node ids mixed with solved
    /// composite ids recorded by indirection. `None` if the node is unsolved
    /// or is a check node already decommissioned.
    #[must_use]
    pub fn xor_list(&self, node: NodeId) -> Option<&[NodeId]> {
        assert!((node as usize) < self.nodes, "node {node} does not exist");
        self.xor.raw(node)
    }

    /// Like [`xor_list`](Self::xor_list), with composite references expanded
    /// transitively so only check-node ids are yielded.
    #[must_use]
    pub fn expanded_xor_list(&self, node: NodeId) -> Option<ExpandedXor<'_>> {
        assert!((node as usize) < self.nodes, "node {node} does not exist");
        self.xor.expand(node)
    }

    /// Installs a new check block defined as the XOR of the composite nodes
    /// in `neighbours`, and queues it for resolution.
    ///
    /// Always admits the block, even when every neighbour is already solved
    /// (the resolver will discard it as redundant); this keeps the caller's
    /// array-indexed bookkeeping simple. Returns the check node's id,
    /// monotonically increasing from `coblocks`. On error the graph is
    /// unchanged.
    pub fn ingest_check_block(&mut self, neighbours: &[NodeId]) -> Result<NodeId, GraphError> {
        if self.nodes >= self.node_space {
            return Err(GraphError::CheckSpaceExhausted {
                node: self.nodes,
                node_space: self.node_space,
            });
        }
        let node = self.nodes as NodeId;

        // Partition neighbours: solved ones fold straight into the XOR list,
        // unsolved ones become live edges.
        let mut xor: Vec<NodeId> = Vec::with_capacity(neighbours.len() + 1);
        xor.push(node);
        let mut unsolved: SmallVec<[NodeId; 8]> = SmallVec::new();
        for &v in neighbours {
            assert!(
                (v as usize) < self.coblocks,
                "check neighbour {v} is not a composite node"
            );
            if self.is_solved(v) {
                xor.push(v);
            } else {
                unsolved.push(v);
            }
        }

        {
            let mut pool = self.pool.borrow_mut();
            // One cell per up edge plus the pending entry; reserving first
            // keeps the whole ingest a no-op if memory is unavailable.
            pool.reserve(unsolved.len() + 1)?;
            for &low in &unsolved {
                self.up.add(&mut pool, low, node);
            }
            self.pending.push(&mut pool, node, &mut self.metrics);
        }

        let slot = self.nodes - self.mblocks;
        self.edge_count[slot] = unsolved.len() as u32;
        tracing::debug!(
            node,
            degree = neighbours.len(),
            unsolved = unsolved.len(),
            "ingested check block"
        );
        self.down[slot] = Some(DownEdges::new(unsolved.into_vec()));
        self.xor.set(node, xor);
        self.nodes += 1;

        Ok(node)
    }

    /// Drains the pending queue, reporting every composite block solved.
    #[must_use]
    pub fn resolve(&mut self) -> Resolution {
        self.resolve_bounded(usize::MAX)
    }

    /// Resolves at most one newly-solved block, for cooperative stepping.
    #[must_use]
    pub fn resolve_step(&mut self) -> Resolution {
        self.resolve_bounded(1)
    }

    /// Drains the pending queue until it is empty or `max_solved` blocks have
    /// been solved. The queue persists across calls, so a bounded call picks
    /// up exactly where the previous one stopped.
    ///
    /// `done` latches to true the moment the last message block is solved;
    /// remaining pending work (auxiliary blocks that become recoverable in
    /// the tail of the cascade) is still processed and reported.
    #[must_use]
    pub fn resolve_bounded(&mut self, max_solved: usize) -> Resolution {
        let mut newly_solved = Vec::new();

        while newly_solved.len() < max_solved {
            let dequeued = {
                let mut pool = self.pool.borrow_mut();
                self.pending.pop(&mut pool)
            };
            let Some(from) = dequeued else { break };
            assert!(
                (from as usize) >= self.mblocks,
                "resolver dispatched message node {from}"
            );

            let count_unsolved = self.edge_count[from as usize - self.mblocks];

            if count_unsolved > 1 {
                continue;
            }

            if count_unsolved == 0 {
                if (from as usize) >= self.coblocks || self.solved[from as usize] {
                    // A check block, or an auxiliary solved earlier: no
                    // unsolved edges left means no new information.
                    self.decommission(from);
                    continue;
                }
                self.solve_aux(from);
                newly_solved.push(from);
                self.cascade(from);
            } else {
                if (from as usize) < self.coblocks && !self.solved[from as usize] {
                    // An unsolved auxiliary needs the aux rule; one more
                    // neighbour must be solved first.
                    continue;
                }
                let to = self.propagate(from);
                newly_solved.push(to);
                if (to as usize) < self.mblocks {
                    self.unsolved_count -= 1;
                    if self.unsolved_count == 0 {
                        self.done = true;
                        tracing::debug!(
                            checks = self.nodes - self.coblocks,
                            metrics = ?self.metrics,
                            "all message blocks solved"
                        );
                    }
                } else {
                    // A solved auxiliary may now satisfy the propagation rule
                    // on its own down edges.
                    let mut pool = self.pool.borrow_mut();
                    self.pending.push(&mut pool, to, &mut self.metrics);
                }
                self.cascade(to);
            }
        }

        Resolution {
            done: self.done,
            newly_solved,
        }
    }

    /// Aux rule: an unsolved auxiliary with zero unsolved down-neighbours is
    /// the XOR of all of them.
    fn solve_aux(&mut self, aux: NodeId) {
        let slot = aux as usize - self.mblocks;
        debug_assert!((aux as usize) < self.coblocks);
        assert!(
            !self.solved[aux as usize],
            "aux rule on already-solved node {aux}"
        );
        self.solved[aux as usize] = true;

        let down = self.down[slot]
            .take()
            .expect("aux rule on decommissioned node");
        {
            let mut pool = self.pool.borrow_mut();
            for &low in down.as_slice() {
                self.up.remove(&mut pool, low, aux, &mut self.metrics);
            }
        }
        tracing::debug!(node = aux, "aux rule solved auxiliary block");
        // The down list, recorded by indirection, becomes the XOR list.
        self.xor.set(aux, down.into_ids());
    }

    /// Propagation rule: `from` is solved and has exactly one unsolved
    /// down-neighbour, which is therefore the XOR of `from` and the rest.
    fn propagate(&mut self, from: NodeId) -> NodeId {
        let slot = from as usize - self.mblocks;

        let to = {
            let solved = &self.solved;
            let down = self.down[slot]
                .as_mut()
                .expect("propagation from decommissioned node");
            let index = down
                .as_slice()
                .iter()
                .position(|&n| !solved[n as usize])
                .expect("no unsolved down-neighbour under propagation rule");
            down.swap_remove(index)
        };

        {
            let mut pool = self.pool.borrow_mut();
            self.up.remove(&mut pool, to, from, &mut self.metrics);
        }
        debug_assert_eq!(self.edge_count[slot], 1);
        self.edge_count[slot] = 0;

        let remaining = self.down[slot]
            .as_ref()
            .expect("down edges present during propagation")
            .as_slice();
        let from_list = self.xor.raw(from).expect("solved node lacks an xor list");
        let mut list = Vec::with_capacity(from_list.len() + remaining.len());
        list.extend_from_slice(from_list);
        list.extend_from_slice(remaining);

        assert!(
            !self.solved[to as usize],
            "propagation re-solving node {to}"
        );
        self.solved[to as usize] = true;
        self.xor.set(to, list);
        tracing::debug!(from, to, "propagation rule solved block");

        self.decommission(from);
        to
    }

    /// Walks `node`'s up edges, decrementing each neighbour's unsolved count
    /// and enqueueing any that may now satisfy a rule. Edges themselves are
    /// removed lazily when the owning node is dispatched.
    fn cascade(&mut self, node: NodeId) {
        let mut pool = self.pool.borrow_mut();
        let mut cur = self.up.head(node);
        while cur != NIL {
            let to = pool.value(cur);
            let next = pool.next(cur);
            debug_assert_ne!(to, node);
            let count = &mut self.edge_count[to as usize - self.mblocks];
            assert!(*count > 0, "cascade underflow on node {to}");
            *count -= 1;
            if *count < 2 {
                self.pending.push(&mut pool, to, &mut self.metrics);
            }
            cur = next;
        }
    }

    /// Structural cleanup once a node's information is fully propagated:
    /// remaining down edges are unlinked from both sides, and a check node's
    /// XOR list is dropped. Safe to call twice.
    fn decommission(&mut self, node: NodeId) {
        let slot = node as usize - self.mblocks;
        let Some(down) = self.down[slot].take() else {
            return;
        };
        debug_assert_eq!(self.edge_count[slot], 0);
        {
            let mut pool = self.pool.borrow_mut();
            for &low in down.as_slice() {
                self.up.remove(&mut pool, low, node, &mut self.metrics);
            }
        }
        if (node as usize) >= self.coblocks {
            self.xor.drop_check_list(node);
        }
        tracing::trace!(node, "decommissioned node");
    }

    /// Verifies the structural invariants the solver maintains between
    /// operations; panics on any violation. A debugging and test aid.
    ///
    /// - every non-message node's unsolved count equals the number of
    ///   unsolved entries in its down array;
    /// - down and up adjacency agree edge for edge;
    /// - the unsolved-message counter matches the solved flags;
    /// - `done` holds exactly when no message block remains unsolved.
    pub fn assert_invariants(&self) {
        let unsolved = self.solved[..self.mblocks].iter().filter(|&&s| !s).count();
        assert_eq!(
            unsolved, self.unsolved_count,
            "unsolved-message counter out of sync"
        );
        assert_eq!(
            self.done,
            self.unsolved_count == 0,
            "done flag out of sync"
        );

        let pool = self.pool.borrow();
        for node in self.mblocks..self.nodes {
            let slot = node - self.mblocks;
            match &self.down[slot] {
                Some(down) => {
                    let unsolved_edges = down
                        .as_slice()
                        .iter()
                        .filter(|&&m| !((m as usize) >= self.coblocks || self.solved[m as usize]))
                        .count();
                    assert_eq!(
                        self.edge_count[slot] as usize, unsolved_edges,
                        "unsolved-edge count wrong at node {node}"
                    );
                    for &low in down.as_slice() {
                        assert!(
                            self.up.contains(&pool, low, node as NodeId),
                            "down edge ({node}, {low}) lacks its up counterpart"
                        );
                    }
                }
                None => assert_eq!(
                    self.edge_count[slot], 0,
                    "decommissioned node {node} keeps a nonzero edge count"
                ),
            }
        }
        for low in 0..self.coblocks {
            let mut cur = self.up.head(low as NodeId);
            while cur != NIL {
                let high = pool.value(cur);
                let down = self.down[high as usize - self.mblocks]
                    .as_ref()
                    .unwrap_or_else(|| {
                        unreachable!("up edge ({high}, {low}) targets a decommissioned node")
                    });
                assert!(
                    down.as_slice().contains(&(low as NodeId)),
                    "up edge ({high}, {low}) lacks its down counterpart"
                );
                cur = pool.next(cur);
            }
        }
    }
}

impl Drop for GraphDecoder {
    fn drop(&mut self) {
        // Hand every cell this decoder still owns back to the shared pool.
        let mut pool = self.pool.borrow_mut();
        self.pending.flush(&mut pool);
        self.up.release_all(&mut pool);
    }
}
