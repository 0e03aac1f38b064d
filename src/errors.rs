//! Errors specific to tree construction
use crate::common::LeafIndex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Errors reported by a sponge instance.
pub enum SpongeError {
    /// Absorbed input must be a non-empty multiple of the hash length.
    #[error("cannot absorb {0} trits: length must be a positive multiple of the hash size")]
    InvalidInputLength(usize),
    /// Requested output must be a positive multiple of the hash length.
    #[error("cannot squeeze {0} trits: length must be a positive multiple of the hash size")]
    InvalidOutputLength(usize),
    /// Input contained a value outside of `{-1, 0, 1}`.
    #[error("invalid trit value {0}")]
    InvalidTrit(i8),
    /// The sponge already produced its output and cannot be used again.
    #[error("sponge has already been squeezed")]
    AlreadySqueezed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Errors reported by an address derivation function.
pub enum DerivationError {
    /// A sponge used during derivation failed.
    #[error("sponge failure during derivation: {0}")]
    Sponge(#[from] SpongeError),
    /// Failure specific to a derivation implementation.
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Enum of errors associated with Merkle tree construction
pub enum Error {
    /// Address derivation failed for the leaf at `index`. The whole build is aborted.
    #[error("address derivation failed for leaf {index}: {source}")]
    DerivationFailure {
        /// Index of the lowest failing leaf.
        index: LeafIndex,
        /// Underlying derivation error.
        #[source]
        source: DerivationError,
    },
    /// A layer with an odd number of nodes was handed to the reducer.
    #[error("layer of size {size} cannot be reduced pairwise")]
    UnbalancedLayer {
        /// Size of the offending layer.
        size: usize,
    },
    /// The generator was asked for zero leaves, or the reducer got an empty layer.
    #[error("layer is empty")]
    EmptyLayer,
    /// The sponge reported an error while combining two nodes.
    #[error("sponge failure: {0}")]
    SpongeFailure(#[from] SpongeError),
    /// The depth would overflow the leaf count computation or exceeds `MAX_DEPTH`.
    #[error("invalid tree depth {0}")]
    InvalidDepth(usize),
    /// The security level is not one of 1, 2 or 3.
    #[error("invalid security level {0}")]
    InvalidSecurityLevel(u8),
    /// A trit slice does not have the size of a hash.
    #[error("invalid hash size {0}")]
    InvalidHashSize(usize),
    /// A trit value is outside of `{-1, 0, 1}`.
    #[error("invalid trit value {0}")]
    InvalidTrit(i8),
    /// A tryte string does not have the length of a hash or seed.
    #[error("invalid tryte count {0}")]
    InvalidTryteCount(usize),
    /// A character is not part of the tryte alphabet.
    #[error("invalid tryte {0:?}")]
    InvalidTryte(char),
    /// The requested leaf does not exist in the tree.
    #[error("leaf index {index} out of range for {leaf_count} leaves")]
    LeafIndexOutOfRange {
        /// Requested index.
        index: LeafIndex,
        /// Number of leaves in the tree.
        leaf_count: usize,
    },
    /// A set of layers does not have the shape of a complete binary tree.
    #[error("malformed tree: {0}")]
    MalformedTree(&'static str),
    /// The worker pool could not be created.
    #[error("worker pool: {0}")]
    WorkerPool(String),
}
