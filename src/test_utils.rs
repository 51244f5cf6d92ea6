//! Test utilities for Oncode.
//!
//! Shared helpers for unit, integration, and bench code:
//! - consistent tracing-based logging initialization
//! - phase/assert macros for readable test output
//! - a deterministic, dependency-free PRNG
//! - generators for auxiliary mappings and check-block neighbour lists
//!
//! The codec that produces mappings and neighbour lists in production is out
//! of this crate's scope, so the generators here stand in for it wherever a
//! test or bench needs a reproducible input stream.

use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::AuxMapping;
use crate::graph::NodeId;

static INIT_LOGGING: Once = Once::new();

/// Default seed used by test helpers.
pub const DEFAULT_TEST_SEED: u64 = 0xDEAD_BEEF;

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// A deterministic pseudo-random number generator using splitmix64.
///
/// Given the same seed, the generated sequence is always identical. Fast,
/// dependency-free, and NOT cryptographically secure.
#[derive(Debug, Clone)]
pub struct DetRng {
    state: u64,
}

impl DetRng {
    /// Creates a new PRNG with the given seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generates the next pseudo-random u64 value.
    pub fn next_u64(&mut self) -> u64 {
        // splitmix64
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Generates a pseudo-random usize in `[0, bound)`.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn next_usize(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "bound must be non-zero");
        (self.next_u64() % bound as u64) as usize
    }

    /// Picks `count` distinct values from `[0, bound)` by partial
    /// Fisher-Yates, in selection order.
    pub fn distinct(&mut self, bound: usize, count: usize) -> Vec<usize> {
        let count = count.min(bound);
        let mut values: Vec<usize> = (0..bound).collect();
        for k in 0..count {
            let j = k + self.next_usize(bound - k);
            values.swap(k, j);
        }
        values.truncate(count);
        values
    }
}

/// Builds a random auxiliary mapping: each message block feeds `q` distinct
/// auxiliary blocks, and every auxiliary covers at least one message.
#[must_use]
pub fn random_aux_mapping(
    rng: &mut DetRng,
    mblocks: usize,
    ablocks: usize,
    q: usize,
) -> AuxMapping {
    let mut per_aux: Vec<Vec<NodeId>> = vec![Vec::new(); ablocks];
    for msg in 0..mblocks {
        for aux in rng.distinct(ablocks, q) {
            per_aux[aux].push(msg as NodeId);
        }
    }
    for (aux, msgs) in per_aux.iter_mut().enumerate() {
        if msgs.is_empty() {
            msgs.push((aux % mblocks) as NodeId);
        }
    }
    AuxMapping::from_aux_lists(per_aux)
}

/// Samples a check-block neighbour list: a distinct composite subset of size
/// `1..=max_degree`.
#[must_use]
pub fn random_check_neighbours(
    rng: &mut DetRng,
    coblocks: usize,
    max_degree: usize,
) -> Vec<NodeId> {
    let degree = 1 + rng.next_usize(max_degree.min(coblocks));
    rng.distinct(coblocks, degree)
        .into_iter()
        .map(|id| id as NodeId)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_sequence() {
        let mut rng1 = DetRng::new(42);
        let mut rng2 = DetRng::new(42);
        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut rng1 = DetRng::new(42);
        let mut rng2 = DetRng::new(43);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn distinct_yields_unique_values_in_range() {
        let mut rng = DetRng::new(7);
        let picks = rng.distinct(10, 4);
        assert_eq!(picks.len(), 4);
        for &v in &picks {
            assert!(v < 10);
        }
        let mut sorted = picks.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4, "picks must be distinct");
    }

    #[test]
    fn mappings_cover_every_auxiliary() {
        let mut rng = DetRng::new(DEFAULT_TEST_SEED);
        let mapping = random_aux_mapping(&mut rng, 20, 5, 3);
        assert_eq!(mapping.ablocks(), 5);
        for msgs in mapping.aux_lists() {
            assert!(!msgs.is_empty());
        }
        assert!(mapping.validate(20, 5).is_ok());
    }

    #[test]
    fn check_neighbours_stay_in_range() {
        let mut rng = DetRng::new(3);
        for _ in 0..50 {
            let neighbours = random_check_neighbours(&mut rng, 12, 4);
            assert!(!neighbours.is_empty());
            assert!(neighbours.len() <= 4);
            for &n in &neighbours {
                assert!((n as usize) < 12);
            }
        }
    }
}
