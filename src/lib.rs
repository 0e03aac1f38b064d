//! Merkle commitment over the addresses of Winternitz one-time-signature keys.
//!
//! An issuing authority derives `2^depth` one-time-signature addresses from a single
//! seed and commits to all of them in the root of a binary Merkle tree. Leaves are
//! derived in parallel, every internal layer is reduced in parallel, and the result
//! depends only on the seed, the security level and the depth.
//!
//! # Example
//! ```
//! use ots_merkle::common::{SecurityLevel, Seed};
//! use ots_merkle::tree::build_tree;
//!
//! let seed = Seed::from_trytes(&"SEED9".repeat(17)[..81]).unwrap();
//! let tree = build_tree(&seed, SecurityLevel::Low, 2).unwrap();
//!
//! assert_eq!(tree.layers().len(), 3);
//! assert_eq!(tree.leaf_count(), 4);
//! assert_eq!(tree.root(), &tree.layers()[0][0]);
//! ```
#![warn(missing_docs, rust_2018_idioms)]

pub mod address;
pub mod common;
pub mod errors;
pub mod pool;
pub mod sponge;
pub mod traits;
pub mod tree;
