//! Decoder configuration and the auxiliary block mapping.
//!
//! The codec that drives a sender and receiver agrees on three code
//! parameters (`q`, `epsilon`, and the block counts) plus a receiver-side
//! `fudge` factor that over-provisions the space reserved for incoming check
//! blocks. The decoder consumes those parameters here, together with the
//! auxiliary mapping the codec derived from its seeded generator.

use crate::graph::NodeId;

/// Errors produced while validating decoder construction arguments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Message block count must be at least 1.
    #[error("message block count {0} is invalid (need at least 1)")]
    InvalidMessageBlocks(usize),
    /// Auxiliary block count must be at least 1.
    #[error("auxiliary block count {0} is invalid (need at least 1)")]
    InvalidAuxBlocks(usize),
    /// Auxiliary degree used for check-space sizing must be at least 1.
    #[error("auxiliary degree {0} is invalid (need at least 1)")]
    InvalidAuxDegree(usize),
    /// Epsilon must be a positive finite number.
    #[error("epsilon {0} is invalid (need a positive finite value)")]
    InvalidEpsilon(f64),
    /// The fudge factor must exceed 1.0 so the check space is over-provisioned.
    #[error("fudge factor {0} is invalid (need a finite value above 1.0)")]
    InvalidFudge(f32),
    /// The mapping covers a different number of blocks than the configuration.
    #[error("auxiliary mapping lists {got} blocks, expected {expected}")]
    MappingLengthMismatch {
        /// Number of entries the configuration requires.
        expected: usize,
        /// Number of entries the mapping supplied.
        got: usize,
    },
    /// The mapping references a node id outside the valid range.
    #[error("auxiliary mapping references node {id} outside {lo}..{hi}")]
    MappingOutOfRange {
        /// The offending node id.
        id: NodeId,
        /// Inclusive lower bound of the valid range.
        lo: NodeId,
        /// Exclusive upper bound of the valid range.
        hi: NodeId,
    },
    /// An auxiliary block maps no message blocks and could never be used.
    #[error("auxiliary block {0} maps no message blocks")]
    EmptyAuxList(NodeId),
}

/// Parameters for a [`GraphDecoder`](crate::GraphDecoder).
///
/// `q` and `epsilon` come from the codec and only affect how much check-block
/// space is reserved up front; they do not change decode semantics. `fudge`
/// scales that reservation and must exceed 1.0.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Number of message (source) blocks.
    pub mblocks: usize,
    /// Number of auxiliary (parity) blocks.
    pub ablocks: usize,
    /// Auxiliary degree: how many auxiliary blocks each message feeds.
    pub q: usize,
    /// Codec epsilon: expected reception overhead fraction.
    pub epsilon: f64,
    /// Over-provisioning factor applied to the expected check-block count.
    pub fudge: f32,
}

impl DecoderConfig {
    /// Creates a configuration with the codec-standard `q`, `epsilon`, and a
    /// conservative fudge factor.
    #[must_use]
    pub const fn new(mblocks: usize, ablocks: usize) -> Self {
        Self {
            mblocks,
            ablocks,
            q: 3,
            epsilon: 0.01,
            fudge: 1.5,
        }
    }

    /// Total number of composite (message + auxiliary) blocks.
    #[must_use]
    pub const fn coblocks(&self) -> usize {
        self.mblocks + self.ablocks
    }

    /// Space reserved for incoming check blocks:
    /// `ceil(fudge * (1 + q * epsilon) * mblocks)`.
    #[must_use]
    pub fn check_space(&self) -> usize {
        let expected = (1.0 + self.q as f64 * self.epsilon) * self.mblocks as f64;
        (f64::from(self.fudge) * expected).ceil() as usize
    }

    /// Validates the parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mblocks < 1 {
            return Err(ConfigError::InvalidMessageBlocks(self.mblocks));
        }
        if self.ablocks < 1 {
            return Err(ConfigError::InvalidAuxBlocks(self.ablocks));
        }
        if self.q < 1 {
            return Err(ConfigError::InvalidAuxDegree(self.q));
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        if !self.fudge.is_finite() || self.fudge <= 1.0 {
            return Err(ConfigError::InvalidFudge(self.fudge));
        }
        Ok(())
    }
}

/// The auxiliary block mapping: which message blocks feed each auxiliary.
///
/// Canonical storage is auxiliary-keyed: one list of message node ids per
/// auxiliary block. The message-keyed form the codec produces (each message
/// names the `q` auxiliaries that include it) converts via
/// [`AuxMapping::from_message_lists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxMapping {
    per_aux: Vec<Vec<NodeId>>,
}

impl AuxMapping {
    /// Builds a mapping from auxiliary-keyed lists of message node ids.
    #[must_use]
    pub const fn from_aux_lists(per_aux: Vec<Vec<NodeId>>) -> Self {
        Self { per_aux }
    }

    /// Builds a mapping from message-keyed lists of auxiliary node ids.
    ///
    /// `per_message[m]` names the auxiliary nodes (absolute ids in
    /// `mblocks..mblocks + ablocks`) whose parity includes message `m`.
    pub fn from_message_lists(
        mblocks: usize,
        ablocks: usize,
        per_message: &[Vec<NodeId>],
    ) -> Result<Self, ConfigError> {
        if per_message.len() != mblocks {
            return Err(ConfigError::MappingLengthMismatch {
                expected: mblocks,
                got: per_message.len(),
            });
        }
        let lo = mblocks as NodeId;
        let hi = (mblocks + ablocks) as NodeId;
        let mut per_aux = vec![Vec::new(); ablocks];
        for (msg, auxes) in per_message.iter().enumerate() {
            for &aux in auxes {
                if aux < lo || aux >= hi {
                    return Err(ConfigError::MappingOutOfRange { id: aux, lo, hi });
                }
                per_aux[aux as usize - mblocks].push(msg as NodeId);
            }
        }
        Ok(Self { per_aux })
    }

    /// Number of auxiliary blocks this mapping covers.
    #[must_use]
    pub fn ablocks(&self) -> usize {
        self.per_aux.len()
    }

    /// Auxiliary-keyed message lists, indexed by `aux_id - mblocks`.
    #[must_use]
    pub fn aux_lists(&self) -> &[Vec<NodeId>] {
        &self.per_aux
    }

    pub(crate) fn validate(&self, mblocks: usize, ablocks: usize) -> Result<(), ConfigError> {
        if self.per_aux.len() != ablocks {
            return Err(ConfigError::MappingLengthMismatch {
                expected: ablocks,
                got: self.per_aux.len(),
            });
        }
        for (i, msgs) in self.per_aux.iter().enumerate() {
            let aux = (mblocks + i) as NodeId;
            if msgs.is_empty() {
                return Err(ConfigError::EmptyAuxList(aux));
            }
            for &msg in msgs {
                if msg as usize >= mblocks {
                    return Err(ConfigError::MappingOutOfRange {
                        id: msg,
                        lo: 0,
                        hi: mblocks as NodeId,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_validate() {
        let config = DecoderConfig::new(16, 4);
        assert!(config.validate().is_ok());
        assert_eq!(config.coblocks(), 20);
    }

    #[test]
    fn check_space_rounds_up() {
        let config = DecoderConfig {
            mblocks: 10,
            ablocks: 2,
            q: 3,
            epsilon: 0.01,
            fudge: 1.5,
        };
        // 1.5 * (1 + 0.03) * 10 = 15.45 -> 16
        assert_eq!(config.check_space(), 16);
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut config = DecoderConfig::new(0, 1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidMessageBlocks(0))
        );
        config.mblocks = 4;
        config.ablocks = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidAuxBlocks(0)));
        config.ablocks = 1;
        config.fudge = 1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidFudge(1.0)));
        config.fudge = 1.5;
        config.epsilon = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidEpsilon(0.0)));
    }

    #[test]
    fn message_keyed_mapping_inverts() {
        // Two messages, two auxiliaries: m0 -> {a2, a3}, m1 -> {a3}.
        let mapping =
            AuxMapping::from_message_lists(2, 2, &[vec![2, 3], vec![3]]).expect("valid mapping");
        assert_eq!(mapping.aux_lists(), &[vec![0], vec![0, 1]]);
        assert!(mapping.validate(2, 2).is_ok());
    }

    #[test]
    fn message_keyed_mapping_rejects_out_of_range() {
        let err = AuxMapping::from_message_lists(2, 1, &[vec![3], vec![2]]).unwrap_err();
        assert_eq!(err, ConfigError::MappingOutOfRange { id: 3, lo: 2, hi: 3 });
    }

    #[test]
    fn validate_rejects_empty_aux_list() {
        let mapping = AuxMapping::from_aux_lists(vec![vec![0], vec![]]);
        assert_eq!(mapping.validate(2, 2), Err(ConfigError::EmptyAuxList(3)));
    }

    #[test]
    fn validate_rejects_non_message_entry() {
        let mapping = AuxMapping::from_aux_lists(vec![vec![0, 2]]);
        assert_eq!(
            mapping.validate(2, 1),
            Err(ConfigError::MappingOutOfRange { id: 2, lo: 0, hi: 2 })
        );
    }
}
