//! Bipartite-graph solver for Online Codes check blocks.
//!
//! # Architecture
//!
//! ```text
//! caller (codec + payload store)
//!     │  aux mapping          neighbour lists          xor lists
//!     ▼                          │                        ▲
//! GraphDecoder::new ──► ingest_check_block ──► resolve ───┘
//!            │                  │                 │
//!            ▼                  ▼                 ▼
//!     edge stores          pending FIFO      solving rules
//!     (down arrays,        (pool cells)      (propagation,
//!      up lists)                              aux rule, cascade)
//! ```
//!
//! Node ids occupy three ordered ranges: message blocks `0..mblocks`,
//! auxiliary blocks `mblocks..coblocks`, then one id per received check
//! block. "Down" always means a strictly lower id, "up" strictly higher.
//! Check nodes arrive solved; a message or auxiliary node becomes solved
//! when one of the two rules fires, and its frozen XOR list then names the
//! received check blocks (possibly via auxiliary indirection) whose payload
//! XOR reproduces it.

mod decoder;
mod edges;
mod metrics;
mod pending;
mod pool;
mod xor_list;

pub use decoder::{GraphDecoder, GraphError, Resolution};
pub use metrics::GraphMetrics;
pub use pool::PoolHandle;
pub use xor_list::ExpandedXor;

/// Identifier of a graph node (message, auxiliary, or check block).
pub type NodeId = u32;
