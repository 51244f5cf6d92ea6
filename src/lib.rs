//! Oncode: incremental graph decoder for Online Codes rateless erasure coding.
//!
//! # Overview
//!
//! An Online Codes sender splits a message into `mblocks` source blocks,
//! derives `ablocks` auxiliary blocks as fixed parity combinations of random
//! message subsets, and transmits an unbounded stream of check blocks, each
//! the XOR of a small random subset of message-plus-auxiliary ("composite")
//! blocks. This crate implements the receiver's bipartite-graph solver: as
//! check blocks arrive one by one it determines which composite blocks become
//! algebraically recoverable and records, for each, the exact set of received
//! check blocks whose XOR equals it.
//!
//! The decoder tracks *which* blocks XOR together, never the block bytes
//! themselves. The caller owns payload storage and performs the physical XOR
//! using the id lists the decoder reports.
//!
//! # Core guarantees
//!
//! - **Deterministic**: a fixed auxiliary mapping and a fixed arrival order
//!   of check blocks produce an identical sequence of solved blocks and
//!   identical XOR lists on every run.
//! - **Incremental**: work is driven by a FIFO of pending nodes that persists
//!   across calls; `resolve_bounded` caps the number of blocks solved per
//!   call so an event loop can interleave packet reception with decoding.
//! - **Allocation-steady**: edge-list links and queue entries live in a
//!   cell pool whose free-list is shared by every decoder on the thread, so
//!   the steady-state burst of check-block arrivals allocates almost nothing.
//!
//! # Module structure
//!
//! - [`config`]: decoder parameters and the auxiliary block mapping
//! - [`graph`]: the bipartite-graph solver ([`GraphDecoder`])
//! - [`test_utils`]: logging setup, deterministic RNG, and input generators
//!   shared by unit, integration, and bench code

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod graph;
pub mod test_utils;

pub use config::{AuxMapping, ConfigError, DecoderConfig};
pub use graph::{
    ExpandedXor, GraphDecoder, GraphError, GraphMetrics, NodeId, PoolHandle, Resolution,
};
