//! End-to-end checks of tree construction: shape, leaf/derivation agreement, layer
//! relations, determinism across worker counts and atomic failure.
use ots_merkle::address::WotsAddress;
use ots_merkle::common::{Hash, LeafIndex, SecurityLevel, Seed, Trit, HASH_TRINARY_SIZE};
use ots_merkle::errors::{DerivationError, Error, SpongeError};
use ots_merkle::pool::BuildConfig;
use ots_merkle::sponge::{combine, ShakeSponge};
use ots_merkle::traits::{AddressDerivation, Sponge};
use ots_merkle::tree::{build_tree, MerkleTree, TreeBuilder};
use proptest::prelude::*;

fn test_seed() -> Seed {
    Seed::from_trytes(&format!("{:9<81}", "COORDINATOR9TEST9SEED")).unwrap()
}

fn wots_builder(threads: usize) -> TreeBuilder<WotsAddress> {
    TreeBuilder::new(WotsAddress::new(), &BuildConfig::with_threads(threads)).unwrap()
}

fn check_layer_relations(tree: &MerkleTree) {
    for k in 0..tree.depth() {
        let parent = &tree.layers()[k];
        let children = &tree.layers()[k + 1];
        assert_eq!(children.len(), 2 * parent.len());
        for (j, node) in parent.iter().enumerate() {
            let expected = combine::<ShakeSponge>(&children[2 * j], &children[2 * j + 1]).unwrap();
            assert_eq!(node, &expected, "layer {} node {}", k, j);
        }
    }
}

#[test]
fn shape_for_small_depths() {
    let builder = wots_builder(2);
    for depth in 0..=3 {
        let tree = builder
            .build_tree(&test_seed(), SecurityLevel::Low, depth)
            .unwrap();
        assert_eq!(tree.depth(), depth);
        assert_eq!(tree.layers().len(), depth + 1);
        assert_eq!(tree.leaf_count(), 1 << depth);
        assert_eq!(tree.root(), &tree.layers()[0][0]);
        check_layer_relations(&tree);
    }
}

#[test]
fn leaves_are_derived_addresses() {
    let wots = WotsAddress::<ShakeSponge>::new();
    let tree = wots_builder(3)
        .build_tree(&test_seed(), SecurityLevel::Medium, 2)
        .unwrap();
    for index in 0..4 {
        let expected = wots
            .derive(&test_seed(), index, SecurityLevel::Medium)
            .unwrap();
        assert_eq!(tree.leaf(index), Some(&expected));
    }
}

#[test]
fn depth_zero_root_is_the_only_leaf() {
    let tree = wots_builder(1)
        .build_tree(&test_seed(), SecurityLevel::High, 0)
        .unwrap();
    let leaf = WotsAddress::<ShakeSponge>::new()
        .derive(&test_seed(), 0, SecurityLevel::High)
        .unwrap();
    assert_eq!(tree.layers(), &[vec![leaf]][..]);
    assert_eq!(tree.root(), &leaf);
}

#[test]
fn identical_roots_for_any_worker_count() {
    let single = wots_builder(1)
        .build_tree(&test_seed(), SecurityLevel::Low, 3)
        .unwrap();
    let many = wots_builder(8)
        .build_tree(&test_seed(), SecurityLevel::Low, 3)
        .unwrap();
    let default = build_tree(&test_seed(), SecurityLevel::Low, 3).unwrap();

    assert_eq!(single, many);
    assert_eq!(single, default);
}

#[test]
fn parameters_change_the_root() {
    let builder = wots_builder(4);
    let low = builder
        .build_tree(&test_seed(), SecurityLevel::Low, 1)
        .unwrap();
    let medium = builder
        .build_tree(&test_seed(), SecurityLevel::Medium, 1)
        .unwrap();
    let other_seed = Seed::from_trytes(&"A".repeat(81)).unwrap();
    let other = builder
        .build_tree(&other_seed, SecurityLevel::Low, 1)
        .unwrap();

    assert_ne!(low.root(), medium.root());
    assert_ne!(low.root(), other.root());
}

#[test]
fn derivation_failure_at_index_two_of_eight() {
    let failing = |seed: &Seed, index: LeafIndex, level: SecurityLevel| {
        if index == 2 {
            Err(DerivationError::Other("hardware token unavailable".into()))
        } else {
            WotsAddress::<ShakeSponge>::new().derive(seed, index, level)
        }
    };
    for &threads in &[1, 4] {
        let builder: TreeBuilder<_> =
            TreeBuilder::new(failing, &BuildConfig::with_threads(threads)).unwrap();
        match builder.build_tree(&test_seed(), SecurityLevel::Low, 3) {
            Err(Error::DerivationFailure { index, .. }) => assert_eq!(index, 2),
            other => panic!("unexpected result {:?}", other),
        }
    }
}

/// Sponge that refuses to produce output, to exercise the reducer's error path.
#[derive(Default)]
struct BrokenSponge;

impl Sponge for BrokenSponge {
    fn absorb(&mut self, _: &[Trit]) -> Result<(), SpongeError> {
        Ok(())
    }

    fn squeeze(&mut self, _: usize) -> Result<Vec<Trit>, SpongeError> {
        Err(SpongeError::AlreadySqueezed)
    }
}

#[test]
fn sponge_failure_aborts_reduction() {
    let stub = |_: &Seed, _: LeafIndex, _: SecurityLevel| -> Result<Hash, DerivationError> {
        Ok(Hash::NULL)
    };
    let builder: TreeBuilder<_, BrokenSponge> =
        TreeBuilder::new(stub, &BuildConfig::with_threads(2)).unwrap();

    assert_eq!(
        builder.build_tree(&test_seed(), SecurityLevel::Low, 2),
        Err(Error::SpongeFailure(SpongeError::AlreadySqueezed))
    );
    // a depth 0 tree never combines anything
    assert!(builder
        .build_tree(&test_seed(), SecurityLevel::Low, 0)
        .is_ok());
}

/// Sponge whose output is not made of trits.
#[derive(Default)]
struct OutOfRangeSponge;

impl Sponge for OutOfRangeSponge {
    fn absorb(&mut self, _: &[Trit]) -> Result<(), SpongeError> {
        Ok(())
    }

    fn squeeze(&mut self, len: usize) -> Result<Vec<Trit>, SpongeError> {
        Ok(vec![7; len])
    }
}

#[test]
fn sponge_output_outside_trit_range_is_rejected() {
    assert_eq!(
        combine::<OutOfRangeSponge>(&Hash::NULL, &Hash::NULL),
        Err(SpongeError::InvalidTrit(7))
    );

    let stub = |_: &Seed, _: LeafIndex, _: SecurityLevel| -> Result<Hash, DerivationError> {
        Ok(Hash::NULL)
    };
    let builder: TreeBuilder<_, OutOfRangeSponge> =
        TreeBuilder::new(stub, &BuildConfig::with_threads(2)).unwrap();
    assert_eq!(
        builder.build_tree(&test_seed(), SecurityLevel::Low, 1),
        Err(Error::SpongeFailure(SpongeError::InvalidTrit(7)))
    );
}

fn numbered_hash(tag: u64, index: LeafIndex) -> Hash {
    let mut trits = [0 as Trit; HASH_TRINARY_SIZE];
    for (i, t) in trits.iter_mut().enumerate() {
        let v = tag
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(index.wrapping_mul(1_442_695_040_888_963_407))
            .rotate_left((i % 64) as u32);
        *t = (v % 3) as Trit - 1;
    }
    Hash::from_trits(&trits).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn layers_are_pairwise_reductions(tag in any::<u64>(), depth in 0usize..6, threads in 1usize..5) {
        let derive = move |_: &Seed, index: LeafIndex, _: SecurityLevel| -> Result<Hash, DerivationError> {
            Ok(numbered_hash(tag, index))
        };
        let builder: TreeBuilder<_> = TreeBuilder::new(derive, &BuildConfig::with_threads(threads)).unwrap();
        let tree = builder.build_tree(&test_seed(), SecurityLevel::Low, depth).unwrap();

        prop_assert_eq!(tree.layers().len(), depth + 1);
        prop_assert_eq!(tree.leaf_count(), 1usize << depth);
        for index in 0..tree.leaf_count() as LeafIndex {
            let expected = numbered_hash(tag, index);
            prop_assert_eq!(tree.leaf(index), Some(&expected));
        }
        check_layer_relations(&tree);
    }

    #[test]
    fn auth_paths_lead_to_the_root(tag in any::<u64>(), depth in 1usize..6, pick in any::<u64>()) {
        let derive = move |_: &Seed, index: LeafIndex, _: SecurityLevel| -> Result<Hash, DerivationError> {
            Ok(numbered_hash(tag, index))
        };
        let builder: TreeBuilder<_> = TreeBuilder::new(derive, &BuildConfig::with_threads(2)).unwrap();
        let tree = builder.build_tree(&test_seed(), SecurityLevel::Low, depth).unwrap();

        let index = pick % tree.leaf_count() as LeafIndex;
        let path = tree.auth_path(index).unwrap();
        let leaf = tree.leaf(index).unwrap();
        prop_assert_eq!(&path.recompute_root::<ShakeSponge>(leaf).unwrap(), tree.root());
    }
}

#[cfg(feature = "serde_enabled")]
#[test]
fn serde_tree() {
    let tree = wots_builder(2)
        .build_tree(&test_seed(), SecurityLevel::Low, 2)
        .unwrap();

    let json = serde_json::to_string(&tree).unwrap();
    assert!(json.contains(&tree.root().to_trytes()));
    let deser: MerkleTree = serde_json::from_str(&json).unwrap();
    assert_eq!(tree, deser);

    let truncated = serde_json::json!({ "depth": 2, "layers": [[tree.root().to_trytes()]] });
    assert!(serde_json::from_value::<MerkleTree>(truncated).is_err());

    // same shape, but the leaves no longer hash to their parent
    let mut layers: Vec<Vec<String>> = tree
        .layers()
        .iter()
        .map(|layer| layer.iter().map(Hash::to_trytes).collect())
        .collect();
    layers[2].swap(0, 1);
    let forged = serde_json::json!({ "depth": 2, "layers": layers });
    assert!(serde_json::from_value::<MerkleTree>(forged).is_err());

    let config: BuildConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, BuildConfig::default());
}
