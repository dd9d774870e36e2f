// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Arithmetic on complete binary trees of buckets.
//!
//! Nodes are addressed by `(level, index)` with the root at level 0 and the
//! leaves at level `depth`; leaf labels range over `[0, 2^depth)`.

use crate::{Address, Leaf, OramError, TreeHeight, MAX_TREE_HEIGHT};
use rand::{CryptoRng, Rng, RngCore};
use static_assertions::const_assert;

// Leaf labels must leave headroom for a full shift at the maximum depth.
const_assert!(MAX_TREE_HEIGHT < Leaf::BITS);

/// Returns the depth of the smallest tree whose leaves can host `capacity`
/// blocks; a capacity that is not a power of two is rounded up.
pub fn depth_for_capacity(capacity: Address) -> Result<TreeHeight, OramError> {
    if capacity == 0 || capacity > (1 << MAX_TREE_HEIGHT) {
        return Err(OramError::InvalidConfigurationError);
    }
    Ok(capacity.next_power_of_two().ilog2())
}

/// Draws a leaf label uniformly from `[0, 2^depth)`.
pub fn random_leaf<R: RngCore + CryptoRng>(depth: TreeHeight, rng: &mut R) -> Leaf {
    rng.gen_range(0..(1u64 << depth))
}

/// Returns the `(level, index)` pairs of the nodes on the path from the root
/// to `leaf`, in root-to-leaf order.
pub fn path_nodes(leaf: Leaf, depth: TreeHeight) -> Vec<(TreeHeight, u64)> {
    (0..=depth)
        .map(|level| (level, leaf >> (depth - level)))
        .collect()
}

/// Returns whether the node `(level, index)` lies on the path from the root
/// to `leaf`.
pub fn on_path_to_leaf(level: TreeHeight, index: u64, leaf: Leaf, depth: TreeHeight) -> bool {
    index == leaf >> (depth - level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn depth_rounds_up_to_the_next_power_of_two() {
        assert_eq!(depth_for_capacity(1).unwrap(), 0);
        assert_eq!(depth_for_capacity(2).unwrap(), 1);
        assert_eq!(depth_for_capacity(3).unwrap(), 2);
        assert_eq!(depth_for_capacity(8).unwrap(), 3);
        assert_eq!(depth_for_capacity(9).unwrap(), 4);
        assert_eq!(depth_for_capacity(16).unwrap(), 4);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            depth_for_capacity(0),
            Err(OramError::InvalidConfigurationError)
        ));
    }

    #[test]
    fn path_nodes_walks_root_to_leaf() {
        assert_eq!(path_nodes(5, 3), vec![(0, 0), (1, 1), (2, 2), (3, 5)]);
        // The depth-0 tree has a single node which is both root and leaf.
        assert_eq!(path_nodes(0, 0), vec![(0, 0)]);
    }

    #[test]
    fn on_path_matches_path_nodes() {
        let depth = 4;
        for leaf in 0..(1u64 << depth) {
            for (level, index) in path_nodes(leaf, depth) {
                assert!(on_path_to_leaf(level, index, leaf, depth));
            }
            // A sibling index at the leaf level is never on the path.
            assert!(!on_path_to_leaf(depth, leaf ^ 1, leaf, depth));
        }
    }

    #[test]
    fn random_leaves_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(0);
        for depth in [0, 1, 5, 10] {
            for _ in 0..100 {
                assert!(random_leaf(depth, &mut rng) < (1 << depth));
            }
        }
    }
}
