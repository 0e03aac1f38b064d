//! Merkle tree over the addresses of all one-time-signature keys of a seed.
//!
//! The tree is built leaves first: the leaf layer holds `derive(seed, i, level)` at
//! position `i`, and every layer above it is obtained by combining adjacent pairs of
//! the layer below. Both phases run on a [`WorkerPool`]; a layer is fully computed
//! before the next one is started, and the output never depends on the number of
//! workers or on the order in which they finish.
use crate::address::WotsAddress;
use crate::common::{Depth, Hash, LeafIndex, SecurityLevel, Seed, MAX_DEPTH};
use crate::errors::Error;
use crate::pool::{BuildConfig, WorkerPool};
use crate::sponge::{combine, ShakeSponge};
use crate::traits::{AddressDerivation, Sponge};
use std::convert::TryFrom;
use std::marker::PhantomData;
use tracing::{debug, info};

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// Ordered sequence of hashes forming one level of the tree.
pub type Layer = Vec<Hash>;

/// Builds trees with the derivation function `D` and the node sponge `S`.
#[derive(Debug)]
pub struct TreeBuilder<D, S = ShakeSponge> {
    derivation: D,
    pool: WorkerPool,
    sponge: PhantomData<fn() -> S>,
}

impl<D: AddressDerivation, S: Sponge> TreeBuilder<D, S> {
    /// Create a builder running on the workers described by `config`.
    pub fn new(derivation: D, config: &BuildConfig) -> Result<Self, Error> {
        Ok(TreeBuilder {
            derivation,
            pool: WorkerPool::new(config)?,
            sponge: PhantomData,
        })
    }

    /// Derive the addresses of the keys `0..leaf_count`, in index order.
    ///
    /// # Errors
    /// * `EmptyLayer` if `leaf_count` is zero
    /// * `DerivationFailure` with the lowest failing index if any derivation fails
    pub fn generate_leaves(
        &self,
        seed: &Seed,
        level: SecurityLevel,
        leaf_count: usize,
    ) -> Result<Layer, Error> {
        if leaf_count == 0 {
            return Err(Error::EmptyLayer);
        }
        debug!(leaf_count, ?level, "generating leaves");

        self.pool.try_fill(leaf_count, |i| {
            let index = i as LeafIndex;
            self.derivation
                .derive(seed, index, level)
                .map_err(|source| Error::DerivationFailure { index, source })
        })
    }

    /// Compute the layer above `layer`: `out[j] = combine(layer[2j], layer[2j + 1])`.
    ///
    /// # Errors
    /// * `EmptyLayer` if `layer` is empty
    /// * `UnbalancedLayer` if `layer` has an odd length; the last node is never dropped
    /// * `SpongeFailure` if combining a pair fails
    pub fn reduce_layer(&self, layer: &[Hash]) -> Result<Layer, Error> {
        if layer.is_empty() {
            return Err(Error::EmptyLayer);
        }
        if layer.len() % 2 != 0 {
            return Err(Error::UnbalancedLayer { size: layer.len() });
        }
        debug!(size = layer.len(), "reducing layer");

        self.pool.try_fill(layer.len() / 2, |j| {
            combine::<S>(&layer[2 * j], &layer[2 * j + 1]).map_err(Error::from)
        })
    }

    /// Build the full tree of the given depth. The result holds `depth + 1` layers,
    /// the root layer first and the `2^depth` leaves last.
    ///
    /// # Errors
    /// Fails with `InvalidDepth` before any work is started if `2^depth` cannot be
    /// computed, and otherwise with the first error of the failing phase. No partial
    /// tree is ever returned.
    pub fn build_tree(
        &self,
        seed: &Seed,
        level: SecurityLevel,
        depth: usize,
    ) -> Result<MerkleTree, Error> {
        let leaf_count = Depth(depth).leaf_count()?;

        let mut layers = Vec::with_capacity(depth + 1);
        layers.push(self.generate_leaves(seed, level, leaf_count)?);
        for _ in 0..depth {
            let next = self.reduce_layer(&layers[layers.len() - 1])?;
            layers.push(next);
        }
        layers.reverse();

        let tree = MerkleTree::from_shaped_layers(depth, layers)?;
        info!(depth, leaf_count, root = %tree.root(), "merkle tree built");
        Ok(tree)
    }
}

/// Build a tree with the default address derivation and sponge, using one worker per
/// available processing unit.
pub fn build_tree(seed: &Seed, level: SecurityLevel, depth: usize) -> Result<MerkleTree, Error> {
    TreeBuilder::<_, ShakeSponge>::new(WotsAddress::<ShakeSponge>::new(), &BuildConfig::default())?
        .build_tree(seed, level, depth)
}

/// Complete Merkle tree, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde_enabled", serde(try_from = "TreeRepr", into = "TreeRepr"))]
pub struct MerkleTree {
    depth: usize,
    root: Hash,
    layers: Vec<Layer>,
}

impl MerkleTree {
    /// Assemble a tree from its layers, root layer first, checking every internal
    /// node against `combine::<S>` of its two children.
    ///
    /// # Errors
    /// Returns `MalformedTree` unless there are `depth + 1` layers, layer `k`
    /// holds `2^k` hashes and every parent commits to its children.
    pub fn from_layers<S: Sponge>(depth: usize, layers: Vec<Layer>) -> Result<Self, Error> {
        let tree = Self::from_shaped_layers(depth, layers)?;
        for k in 0..depth {
            let children = &tree.layers[k + 1];
            for (j, parent) in tree.layers[k].iter().enumerate() {
                if combine::<S>(&children[2 * j], &children[2 * j + 1])? != *parent {
                    return Err(Error::MalformedTree("node does not match its children"));
                }
            }
        }
        Ok(tree)
    }

    fn from_shaped_layers(depth: usize, layers: Vec<Layer>) -> Result<Self, Error> {
        Depth(depth).leaf_count()?;
        if layers.len() != depth + 1 {
            return Err(Error::MalformedTree("layer count does not match depth"));
        }
        for (k, layer) in layers.iter().enumerate() {
            if layer.len() != 1 << k {
                return Err(Error::MalformedTree("layer size is not a power of two"));
            }
        }
        let root = layers[0][0];

        Ok(MerkleTree {
            depth,
            root,
            layers,
        })
    }

    /// Number of reductions between the leaves and the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Root hash, committing to every leaf.
    pub fn root(&self) -> &Hash {
        &self.root
    }

    /// All layers, root layer first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer at `level`, where level 0 is the root and level `depth` the leaves.
    pub fn layer(&self, level: usize) -> Option<&Layer> {
        self.layers.get(level)
    }

    /// Number of leaves, `2^depth`.
    pub fn leaf_count(&self) -> usize {
        self.layers[self.depth].len()
    }

    /// Address at `index` in the leaf layer.
    pub fn leaf(&self, index: LeafIndex) -> Option<&Hash> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.layers[self.depth].get(i))
    }

    /// Sibling hashes needed to recompute the root from the leaf at `index`.
    pub fn auth_path(&self, index: LeafIndex) -> Result<AuthPath, Error> {
        let leaf_count = self.leaf_count();
        let position = usize::try_from(index)
            .ok()
            .filter(|&i| i < leaf_count)
            .ok_or(Error::LeafIndexOutOfRange { index, leaf_count })?;

        let siblings = (1..=self.depth)
            .rev()
            .map(|level| self.layers[level][(position >> (self.depth - level)) ^ 1])
            .collect();

        Ok(AuthPath { index, siblings })
    }
}

/// Authentication path of one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPath {
    /// Index of the leaf.
    pub index: LeafIndex,
    /// Sibling of the node on the path at every level, leaf level first.
    pub siblings: Vec<Hash>,
}

impl AuthPath {
    /// Recompute the root from `leaf` and the siblings on the path.
    ///
    /// # Errors
    /// * `MalformedTree` if the path is longer than `MAX_DEPTH`
    /// * `LeafIndexOutOfRange` if `index` does not fit a tree of that depth
    pub fn recompute_root<S: Sponge>(&self, leaf: &Hash) -> Result<Hash, Error> {
        let depth = self.siblings.len();
        if depth > MAX_DEPTH {
            return Err(Error::MalformedTree("authentication path is too long"));
        }
        if self.index >> depth != 0 {
            return Err(Error::LeafIndexOutOfRange {
                index: self.index,
                leaf_count: 1 << depth,
            });
        }

        let mut node = *leaf;
        for (height, sibling) in self.siblings.iter().enumerate() {
            node = if (self.index >> height) & 1 == 0 {
                combine::<S>(&node, sibling)?
            } else {
                combine::<S>(sibling, &node)?
            };
        }
        Ok(node)
    }
}

// Hashes are written as trytes; shape and node hashes are checked again on the way in.
#[cfg(feature = "serde_enabled")]
#[derive(Serialize, Deserialize)]
struct TreeRepr {
    depth: usize,
    layers: Vec<Layer>,
}

#[cfg(feature = "serde_enabled")]
impl TryFrom<TreeRepr> for MerkleTree {
    type Error = Error;

    fn try_from(repr: TreeRepr) -> Result<Self, Self::Error> {
        MerkleTree::from_layers::<ShakeSponge>(repr.depth, repr.layers)
    }
}

#[cfg(feature = "serde_enabled")]
impl From<MerkleTree> for TreeRepr {
    fn from(tree: MerkleTree) -> Self {
        TreeRepr {
            depth: tree.depth,
            layers: tree.layers,
        }
    }
}
