// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A keyed pseudorandom permutation over `k`-bit addresses.
//!
//! The construction is affine over `Z/2^k`: `pi(x) = (a*x + b) mod 2^k`
//! with `a` odd, both constants derived by hashing the key under distinct
//! domain-separation labels. This is not a cryptographic PRP; the routing
//! layer treats the permutation as idealised and relies only on
//! bijectivity and a cheap inverse.

use crate::{Address, OramError, MAX_TREE_HEIGHT};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

/// The length in bytes of a permutation key.
pub const KEY_LENGTH: usize = 16;

/// A keyed bijection on `[0, 2^k)` with an inverse.
#[derive(Clone, Debug)]
pub struct AffinePermutation {
    multiplier: u64,
    multiplier_inverse: u64,
    offset: u64,
    k: u32,
}

impl AffinePermutation {
    /// Derives the permutation for the `k`-bit domain from `key`.
    ///
    /// `k == 0` yields the identity on the single-point domain `{0}`.
    pub fn new(key: &[u8; KEY_LENGTH], k: u32) -> Result<Self, OramError> {
        if k > MAX_TREE_HEIGHT {
            return Err(OramError::InvalidConfigurationError);
        }

        // The multiplier must be odd to be invertible mod 2^k.
        let multiplier = derive_word(key, b"partitioned-oram.prp.multiplier") | 1;
        let offset = derive_word(key, b"partitioned-oram.prp.offset");
        let multiplier_inverse = invert_odd_mod_2_64(multiplier);

        Ok(Self {
            multiplier,
            multiplier_inverse,
            offset,
            k,
        })
    }

    /// Derives a permutation under a fresh 128-bit key drawn from `rng`.
    pub fn generate<R: RngCore + CryptoRng>(k: u32, rng: &mut R) -> Result<Self, OramError> {
        let mut key = [0u8; KEY_LENGTH];
        rng.fill_bytes(&mut key);
        Self::new(&key, k)
    }

    /// The width of the domain in bits.
    pub fn domain_bits(&self) -> u32 {
        self.k
    }

    fn mask(&self) -> u64 {
        (1u64 << self.k) - 1
    }

    fn check_domain(&self, x: Address) -> Result<(), OramError> {
        if x > self.mask() {
            return Err(OramError::PermutationDomainError { k: self.k });
        }
        Ok(())
    }

    /// Maps `x` through the permutation.
    pub fn permute(&self, x: Address) -> Result<Address, OramError> {
        self.check_domain(x)?;
        Ok(self
            .multiplier
            .wrapping_mul(x)
            .wrapping_add(self.offset)
            & self.mask())
    }

    /// Maps `y` back through the permutation: `inverse(permute(x)) == x`.
    pub fn inverse(&self, y: Address) -> Result<Address, OramError> {
        self.check_domain(y)?;
        Ok(self
            .multiplier_inverse
            .wrapping_mul(y.wrapping_sub(self.offset))
            & self.mask())
    }
}

fn derive_word(key: &[u8; KEY_LENGTH], label: &[u8]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(label);
    hasher.update(key);
    let digest = hasher.finalize();
    digest
        .iter()
        .take(8)
        .fold(0u64, |word, &byte| (word << 8) | u64::from(byte))
}

// Newton iteration doubles the number of correct low bits each round; an odd
// seed is already correct mod 2^3, so five rounds cover all 64 bits.
fn invert_odd_mod_2_64(a: u64) -> u64 {
    debug_assert_eq!(a & 1, 1);
    let mut inverse = a;
    for _ in 0..5 {
        inverse = inverse.wrapping_mul(2u64.wrapping_sub(a.wrapping_mul(inverse)));
    }
    inverse
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn permutation_is_a_bijection_with_inverse() {
        let mut rng = StdRng::seed_from_u64(0);
        let k = 10;
        let prp = AffinePermutation::generate(k, &mut rng).unwrap();
        assert_eq!(prp.domain_bits(), k);

        let mut seen = vec![false; 1 << k];
        for x in 0..(1u64 << k) {
            let y = prp.permute(x).unwrap();
            assert!(y < (1 << k));
            assert!(!seen[y as usize], "collision at {x}");
            seen[y as usize] = true;
            assert_eq!(prp.inverse(y).unwrap(), x);
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn the_same_key_derives_the_same_permutation() {
        let key = [7u8; KEY_LENGTH];
        let first = AffinePermutation::new(&key, 8).unwrap();
        let second = AffinePermutation::new(&key, 8).unwrap();
        for x in 0..256 {
            assert_eq!(first.permute(x).unwrap(), second.permute(x).unwrap());
        }
    }

    #[test]
    fn distinct_keys_disagree_somewhere() {
        let first = AffinePermutation::new(&[1u8; KEY_LENGTH], 10).unwrap();
        let second = AffinePermutation::new(&[2u8; KEY_LENGTH], 10).unwrap();
        let disagreements = (0..1024)
            .filter(|&x| first.permute(x).unwrap() != second.permute(x).unwrap())
            .count();
        assert!(disagreements > 0);
    }

    #[test]
    fn out_of_domain_inputs_are_rejected() {
        let prp = AffinePermutation::new(&[0u8; KEY_LENGTH], 4).unwrap();
        assert!(matches!(
            prp.permute(16),
            Err(OramError::PermutationDomainError { k: 4 })
        ));
        assert!(matches!(
            prp.inverse(16),
            Err(OramError::PermutationDomainError { k: 4 })
        ));
    }

    #[test]
    fn the_zero_bit_domain_is_the_identity_on_zero() {
        let prp = AffinePermutation::new(&[9u8; KEY_LENGTH], 0).unwrap();
        assert_eq!(prp.permute(0).unwrap(), 0);
        assert_eq!(prp.inverse(0).unwrap(), 0);
        assert!(prp.permute(1).is_err());
    }

    #[test]
    fn newton_inversion_inverts_odd_words() {
        for a in [1u64, 3, 5, 0xdead_beef_dead_beef | 1, u64::MAX] {
            assert_eq!(a.wrapping_mul(invert_odd_mod_2_64(a)), 1);
        }
    }
}
