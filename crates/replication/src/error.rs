//! Error types for data-loss estimation.

use thiserror::Error;

/// Result type for data-loss estimation.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors that can occur while estimating the probability of data loss.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplicationError {
    /// Configuration or call arguments are outside of the supported range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A replication scheme does not provide one of the estimation paths.
    #[error("{scheme} does not implement {operation}")]
    NotImplemented {
        /// Name of the scheme.
        scheme: String,
        /// Missing operation.
        operation: &'static str,
    },

    /// No valid placement exists for the next chunk.
    #[error("capacity exhausted after placing {placed} copysets ({nodes_with_room} nodes with room left)")]
    CapacityExhausted {
        /// Number of copysets placed before the failure.
        placed: usize,
        /// Number of nodes which still had capacity.
        nodes_with_room: usize,
    },

    /// A placement tried to use a node without remaining capacity.
    #[error("invalid placement: {0}")]
    InvalidPlacement(String),

    /// A formula produced a value which is not a probability.
    #[error("computation error: {0}")]
    Computation(String),

    /// Estimation was abandoned through the cancellation handle.
    #[error("estimation cancelled")]
    Cancelled,
}
