//! Integration tests for tree building, proofs and verification.

use super::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

/// Guaranteed-stage addresses from the original sale.
const GUARANTEED: [&str; 8] = [
    "0x185b3F6618A50122C70FD100C7Aac729621B8a25",
    "0xFD2b3c9DF1c8e3493540dfd05EA951d584aB34c4",
    "0xfc6054808531e90B5D7EE7b288BCbe1236737986",
    "0xCE9d85110a662b2bd7bE0A08165Dd60C8A7B93a7",
    "0xd8EEBcC727dEc057c0bF7831086A1615859c1B98",
    "0x30D2CA7476cBbA5D4b6e7f8EB64A5047BE443706",
    "0xde888435d018aAfDb1b47027DC0f766821CC8122",
    "0x4E6e15D3F408985e3F90798CE30a756FeFa82963",
];

fn node(hex: &str) -> B256 {
    proof::parse_node(hex).unwrap()
}

fn guaranteed() -> Vec<Address> {
    GUARANTEED.iter().map(|a| parse_address(a).unwrap()).collect()
}

fn random_addresses(rng: &mut StdRng, n: usize) -> Vec<Address> {
    (0..n).map(|_| Address::from(rng.gen::<[u8; 20]>())).collect()
}

#[test]
fn test_known_root_address_uint_pair() {
    // Reference values published with OpenZeppelin's merkle-tree library.
    let schema = LeafSchema::parse(&["address", "uint256"]).unwrap();
    let leaves = vec![
        schema
            .leaf_from_json(&[
                json!("0x1111111111111111111111111111111111111111"),
                json!("5000000000000000000"),
            ])
            .unwrap(),
        schema
            .leaf_from_json(&[
                json!("0x2222222222222222222222222222222222222222"),
                json!("2500000000000000000"),
            ])
            .unwrap(),
    ];

    let tree = StandardMerkleTree::build(schema, leaves).unwrap();

    assert_eq!(
        tree.root(),
        node("0xd4dee0beab2d53f2cc83e567171bd2820e49898130a22622b10ead383e90bd77")
    );
}

#[test]
fn test_known_root_guaranteed_list() {
    let tree = StandardMerkleTree::from_addresses(guaranteed()).unwrap();

    assert_eq!(
        tree.root(),
        node("0xe51c07e5fdb6bbea03e90f0d7d055492c376c4fdfb6691eedc048e8f9202aeab")
    );

    let expected_indices = [7, 13, 14, 11, 12, 10, 9, 8];
    let indices: Vec<usize> = tree.values().iter().map(|v| v.tree_index).collect();
    assert_eq!(indices, expected_indices);

    let proof = tree.prove_by_value(&Leaf::address(guaranteed()[0])).unwrap();
    assert_eq!(
        proof.path(),
        &[
            node("0xed24e2e660a5d49683f756971b93e5bda07493eeaa638f399d8873399a2741d5"),
            node("0xef7cf416f0cb11ba67abfef190b0d7ebfef0bf14c06551dda63e80a9e3b7ced6"),
            node("0xe18176cf721ca6e7c5cf09103673d62cd045eee35e486546baefa85437a28de3"),
        ]
    );
}

#[test]
fn test_known_root_odd_count() {
    let tree = StandardMerkleTree::from_addresses(guaranteed().into_iter().take(3)).unwrap();

    assert_eq!(
        tree.root(),
        node("0x11dbd6a96cc6015bc3a5c7faeaf089fb1b7d89bbd4d5791cee7b8f36bf0c6a61")
    );
}

#[test]
fn test_known_single_leaf_root() {
    let tree = StandardMerkleTree::from_addresses(guaranteed().into_iter().take(1)).unwrap();

    assert_eq!(
        tree.root(),
        node("0xfe75941ece33397e4c280e2558c5a702301e47f04bf98c6b53ab7654b66d82e9")
    );
}

#[test]
fn test_root_independent_of_input_order() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut addresses = random_addresses(&mut rng, 37);
    let root = StandardMerkleTree::from_addresses(addresses.clone())
        .unwrap()
        .root();

    for _ in 0..5 {
        addresses.shuffle(&mut rng);
        let shuffled = StandardMerkleTree::from_addresses(addresses.clone()).unwrap();
        assert_eq!(shuffled.root(), root);
    }
}

#[test]
fn test_every_leaf_verifies() {
    let mut rng = StdRng::seed_from_u64(42);

    for n in [1usize, 2, 3, 4, 5, 7, 8, 9, 16, 33] {
        let addresses = random_addresses(&mut rng, n);
        let tree = StandardMerkleTree::from_addresses(addresses.clone()).unwrap();

        for address in &addresses {
            let leaf = Leaf::address(*address);
            let proof = tree.prove_by_value(&leaf).unwrap();
            assert!(proof.len() <= tree.depth());
            assert!(verify(tree.schema(), &leaf, &proof, tree.root()).unwrap());
        }
    }
}

#[test]
fn test_mutated_proof_rejected() {
    let tree = StandardMerkleTree::from_addresses(guaranteed()).unwrap();
    let leaf = Leaf::address(guaranteed()[3]);
    let proof = tree.prove_by_value(&leaf).unwrap();

    for element in 0..proof.len() {
        for byte in [0usize, 15, 31] {
            let mut path = proof.path().to_vec();
            path[element].0[byte] ^= 0x01;
            let mutated = MerkleProof::new(path);
            assert!(!tree.verify(&leaf, &mutated).unwrap());
        }
    }

    let mut truncated = proof.path().to_vec();
    truncated.pop();
    assert!(!tree.verify(&leaf, &MerkleProof::new(truncated)).unwrap());
}

#[test]
fn test_other_leaf_rejected() {
    let tree = StandardMerkleTree::from_addresses(guaranteed()).unwrap();
    let proof = tree.prove_by_value(&Leaf::address(guaranteed()[0])).unwrap();

    for other in &guaranteed()[1..] {
        assert!(!tree.verify(&Leaf::address(*other), &proof).unwrap());
    }
}

#[test]
fn test_non_member() {
    let tree = StandardMerkleTree::from_addresses(guaranteed()).unwrap();
    let outsider = Leaf::address(Address::repeat_byte(0x99));

    assert!(matches!(
        tree.prove_by_value(&outsider),
        Err(TreeError::NotFound(_))
    ));

    // Borrowing a member's proof does not help an outsider.
    for value in tree.values() {
        let borrowed = tree.prove_by_index(value.tree_index).unwrap();
        assert!(!tree.verify(&outsider, &borrowed).unwrap());
    }
}

#[test]
fn test_internal_node_cannot_pose_as_leaf() {
    let tree = StandardMerkleTree::from_addresses(guaranteed()).unwrap();
    let nodes = tree.nodes();

    // Proof for internal node 1 as if it were a leaf: just its sibling.
    let forged = MerkleProof::new(vec![nodes[2]]);
    assert_eq!(forged.compute_root(nodes[1]), tree.root());

    // No bytes32 "leaf" equal to node 1 hashes to node 1.
    let schema = LeafSchema::parse(&["bytes32"]).unwrap();
    let fake = Leaf::new(vec![AbiValue::Bytes32(nodes[1])]);
    assert!(!verify(&schema, &fake, &forged, tree.root()).unwrap());
}

#[test]
fn test_scenario_four_addresses() {
    let [a, b, c, d] = [0xa1u8, 0xb2, 0xc3, 0xd4].map(Address::repeat_byte);
    let tree = StandardMerkleTree::from_addresses([a, b, c, d]).unwrap();
    let other = StandardMerkleTree::from_addresses([a, c, d]).unwrap();

    let leaf_b = Leaf::address(b);
    let proof = tree.prove_by_value(&leaf_b).unwrap();

    assert_eq!(proof.len(), 2);
    assert!(verify(tree.schema(), &leaf_b, &proof, tree.root()).unwrap());
    assert!(!verify(tree.schema(), &leaf_b, &proof, other.root()).unwrap());
}

#[test]
fn test_duplicate_policy_is_strict() {
    let [a, b] = [0x0au8, 0x0b].map(Address::repeat_byte);

    assert!(matches!(
        StandardMerkleTree::from_addresses([a, a, b]),
        Err(TreeError::DuplicateLeaf { first: 0, second: 1, .. })
    ));
}

#[test]
fn test_verify_rejects_schema_mismatch() {
    let tree = StandardMerkleTree::from_addresses(guaranteed()).unwrap();
    let wrong = Leaf::new(vec![AbiValue::Uint256(U256::from(1u64))]);

    assert!(matches!(
        tree.verify(&wrong, &MerkleProof::default()),
        Err(LeafError::TypeMismatch { .. })
    ));
}

#[test]
fn test_persisted_tree_serves_same_proofs() {
    let mut rng = StdRng::seed_from_u64(3);
    let addresses = random_addresses(&mut rng, 21);
    let tree = StandardMerkleTree::from_addresses(addresses.clone()).unwrap();

    let json = tree.dump().to_json().unwrap();
    let loaded = StandardMerkleTree::from_json(&json).unwrap();

    assert_eq!(loaded.root(), tree.root());
    for address in addresses {
        let leaf = Leaf::address(address);
        let proof = loaded.prove_by_value(&leaf).unwrap();
        assert!(verify(&LeafSchema::address(), &leaf, &proof, tree.root()).unwrap());
    }
}
