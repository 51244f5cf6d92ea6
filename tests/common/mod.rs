#![allow(dead_code)]
//! Shared integration-test helpers.
//!
//! The decoder tracks block identities only; these helpers mirror the payload
//! algebra byte-for-byte so tests can confirm that XOR-folding the check
//! blocks a node's expanded list names really reproduces the node's payload.

use oncode::test_utils::DetRng;
use oncode::{AuxMapping, GraphDecoder, NodeId};

/// Payload size used by the reference store.
pub const BLOCK_SIZE: usize = 32;

/// Reference payload store: message blocks are random bytes, auxiliary blocks
/// the XOR of their mapped messages, and every check block pushed in arrival
/// order (matching the decoder's id assignment).
pub struct ByteStore {
    blocks: Vec<Vec<u8>>,
}

impl ByteStore {
    /// Creates the store: random message payloads, derived auxiliaries.
    pub fn new(rng: &mut DetRng, mblocks: usize, mapping: &AuxMapping) -> Self {
        let mut blocks: Vec<Vec<u8>> = (0..mblocks)
            .map(|_| (0..BLOCK_SIZE).map(|_| rng.next_u64() as u8).collect())
            .collect();
        for msgs in mapping.aux_lists() {
            let mut payload = vec![0u8; BLOCK_SIZE];
            for &m in msgs {
                xor_into(&mut payload, &blocks[m as usize]);
            }
            blocks.push(payload);
        }
        Self { blocks }
    }

    /// Computes and records the payload of the next check block.
    pub fn push_check(&mut self, neighbours: &[NodeId]) -> Vec<u8> {
        let mut payload = vec![0u8; BLOCK_SIZE];
        for &n in neighbours {
            xor_into(&mut payload, &self.blocks[n as usize]);
        }
        self.blocks.push(payload.clone());
        payload
    }

    /// The stored payload of any node.
    pub fn block(&self, node: NodeId) -> &[u8] {
        &self.blocks[node as usize]
    }

    /// Rebuilds a solved node's payload by XOR-folding the check blocks its
    /// expanded list names. Duplicate ids cancel pairwise, as XOR demands.
    pub fn reconstruct(&self, decoder: &GraphDecoder, node: NodeId) -> Vec<u8> {
        let mut payload = vec![0u8; BLOCK_SIZE];
        for check in decoder
            .expanded_xor_list(node)
            .unwrap_or_else(|| panic!("node {node} has no xor list"))
        {
            xor_into(&mut payload, &self.blocks[check as usize]);
        }
        payload
    }

    /// Asserts that every solved message block round-trips exactly.
    pub fn verify_solved_messages(&self, decoder: &GraphDecoder) {
        for msg in 0..decoder.mblocks() as NodeId {
            if decoder.is_solved(msg) {
                assert_eq!(
                    self.reconstruct(decoder, msg),
                    self.block(msg),
                    "message block {msg} failed to round-trip"
                );
            }
        }
    }
}

pub fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= *s;
    }
}

/// Ingests `neighbours` into both the decoder and the store, then resolves.
pub fn feed(
    decoder: &mut GraphDecoder,
    store: &mut ByteStore,
    neighbours: &[NodeId],
) -> oncode::Resolution {
    store.push_check(neighbours);
    decoder
        .ingest_check_block(neighbours)
        .expect("check space should suffice");
    decoder.resolve()
}
