// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Parameters splitting a `2^k` address space into `2^alpha` sub-trees.

use crate::{Address, OramError};

/// Derived partitioning parameters: `n = 2^k` logical blocks split into
/// `m = 2^alpha` sub-trees of `local_n = 2^(k - alpha)` blocks each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionParams {
    /// Total logical blocks; always a power of two.
    pub n: Address,
    /// The leakage parameter: address bits spent selecting a sub-tree.
    pub alpha: u32,
    /// The number of sub-trees, `2^alpha`.
    pub m: usize,
    /// The address width, `log2(n)`.
    pub k: u32,
    /// Address bits remaining within a sub-tree, `k - alpha`.
    pub local_k: u32,
    /// Blocks per sub-tree, `2^local_k`.
    pub local_n: Address,
}

impl PartitionParams {
    /// Validates `(n, alpha)` and derives the remaining parameters.
    pub fn new(n: Address, alpha: u32) -> Result<Self, OramError> {
        if n == 0 || !n.is_power_of_two() {
            return Err(OramError::InvalidCapacityError { capacity: n });
        }
        let k = n.trailing_zeros();
        if alpha > k {
            return Err(OramError::InvalidAlphaError { alpha, k });
        }

        let local_k = k - alpha;
        Ok(Self {
            n,
            alpha,
            m: 1usize << alpha,
            k,
            local_k,
            local_n: 1u64 << local_k,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_split_the_address_space() {
        let params = PartitionParams::new(1024, 3).unwrap();
        assert_eq!(params.k, 10);
        assert_eq!(params.m, 8);
        assert_eq!(params.local_k, 7);
        assert_eq!(params.local_n, 128);
    }

    #[test]
    fn alpha_zero_keeps_a_single_tree() {
        let params = PartitionParams::new(16, 0).unwrap();
        assert_eq!(params.m, 1);
        assert_eq!(params.local_n, 16);
    }

    #[test]
    fn alpha_equal_to_k_degenerates_to_one_block_per_tree() {
        let params = PartitionParams::new(16, 4).unwrap();
        assert_eq!(params.m, 16);
        assert_eq!(params.local_n, 1);
    }

    #[test]
    fn non_power_of_two_capacities_are_rejected() {
        for n in [0, 3, 12, 1000] {
            assert!(matches!(
                PartitionParams::new(n, 0),
                Err(OramError::InvalidCapacityError { capacity }) if capacity == n
            ));
        }
    }

    #[test]
    fn oversized_alpha_is_rejected() {
        assert!(matches!(
            PartitionParams::new(16, 5),
            Err(OramError::InvalidAlphaError { alpha: 5, k: 4 })
        ));
    }
}
