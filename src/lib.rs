// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A testbed for measuring the leakage of partition-based oblivious storage.
//!
//! # Overview
//!
//! This crate implements a partitioned oblivious storage scheme and the
//! machinery needed to quantify what it leaks. A logical address space of
//! `n = 2^k` blocks is split into `m = 2^alpha` independent Path ORAM
//! sub-trees: a keyed pseudorandom permutation scrambles each address, the
//! top `alpha` bits of the result select a sub-tree, and the remaining bits
//! select a block within it. The parameter `alpha` is the knob under study:
//! `alpha = 0` is a single monolithic tree, `alpha = k` degenerates to one
//! block per sub-tree.
//!
//! Obliviousness is modelled by counting bucket touches on an in-memory
//! server tree; there is no encryption, network transport, or persistence.
//! A [`LeakageOracle`] turns point queries over a dataset into the exact
//! observation stream an adversary would see, and [`query_recovery_attack`]
//! / [`database_recovery_attack`] are the adversaries that consume that
//! stream.
//!
//! # Design
//!
//! The baseline client implements the Path ORAM protocol: a secret position
//! map, a client-side stash, and an access that reads and rewrites exactly
//! one root-to-leaf path of fixed-capacity buckets. See the
//! [Path ORAM retrospective paper](http://elaineshi.com/docs/pathoram-retro.pdf)
//! for background on the protocol.
//!
//! # Example
//!
//! ```
//! use partitioned_oram::PartitionedOram;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! # use partitioned_oram::OramError;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//!
//! // 64 blocks spread over 2^2 = 4 sub-trees of 16 blocks each.
//! let mut oram = PartitionedOram::<u64>::new(64, 4, 2, 0, &mut rng)?;
//!
//! oram.write(5, 42, &mut rng)?;
//! assert_eq!(oram.read(5, &mut rng)?, 42);
//!
//! // Every access records the sub-tree it touched; this alpha-bit
//! // index is precisely the leakage under study.
//! let entry = oram.last_access.unwrap();
//! assert!(entry.sub_index < 4);
//! # Ok::<(), OramError>(())
//! ```

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

use std::num::TryFromIntError;

use thiserror::Error;

pub(crate) mod attacks;
pub(crate) mod bucket;
pub(crate) mod client;
pub(crate) mod oracle;
pub(crate) mod padding;
pub(crate) mod partition;
pub(crate) mod partitioned;
pub(crate) mod prp;
pub(crate) mod server;
#[cfg(test)]
mod test_utils;
pub(crate) mod tree;

pub use crate::attacks::{
    database_recovery_attack, evaluate_attacks, padded_size_buckets, query_recovery_attack,
};
pub use crate::bucket::{Block, Bucket, DEFAULT_BLOCKS_PER_BUCKET};
pub use crate::client::PathOramClient;
pub use crate::oracle::{
    value_counts, AttackOutcome, ConstantVolumeOracle, DatasetIndex, EncryptedTuple, LeakageOracle,
    QueryObservation, ValueCounts,
};
pub use crate::padding::next_power_of;
pub use crate::partition::PartitionParams;
pub use crate::partitioned::{estimate_bandwidth_bytes, AccessLogEntry, PartitionedOram};
pub use crate::prp::{AffinePermutation, KEY_LENGTH};
pub use crate::server::{ServerStats, ServerTree};
pub use crate::tree::{depth_for_capacity, on_path_to_leaf, path_nodes, random_leaf};

/// The numeric type used to specify the size of an ORAM in blocks, and to index into it.
pub type Address = u64;
/// The numeric type used for leaf labels, ranging over `[0, 2^depth)`.
pub type Leaf = u64;
/// The numeric type used for tree depths and node levels.
pub type TreeHeight = u32;
/// The numeric type used to specify the size of an ORAM bucket in blocks.
pub type BucketSize = usize;
/// Numeric type used to represent the size of a Path ORAM stash in blocks.
pub type StashSize = usize;
/// The numeric type used for query result volumes.
pub type Volume = usize;
/// The numeric type used for plaintext point-query values.
pub type QueryValue = u32;

/// The largest supported tree depth.
pub const MAX_TREE_HEIGHT: TreeHeight = 63;

/// A "trait alias" for ORAM blocks: the values read and written by ORAMs.
pub trait OramBlock: Copy + Clone + std::fmt::Debug + Default + PartialEq {}

impl OramBlock for u8 {}
impl OramBlock for u16 {}
impl OramBlock for u32 {}
impl OramBlock for u64 {}
impl OramBlock for i8 {}
impl OramBlock for i16 {}
impl OramBlock for i32 {}
impl OramBlock for i64 {}

/// A list of error types which are produced during ORAM protocol execution.
#[derive(Error, Debug)]
pub enum OramError {
    /// Errors arising from conversions between integer types.
    #[error("Arithmetic error encountered.")]
    IntegerConversionError(#[from] TryFromIntError),
    /// Errors arising from attempting to make an ORAM access to an invalid address.
    #[error("Attempted to access an out-of-bounds ORAM address.")]
    AddressOutOfBoundsError,
    /// Errors arising from a capacity that is not a positive power of two.
    #[error("Capacity must be a positive power of two, got {capacity}.")]
    InvalidCapacityError {
        /// The rejected capacity.
        capacity: Address,
    },
    /// Errors arising from a leakage parameter outside `[0, k]`.
    #[error("The leakage parameter must be in [0, {k}], got {alpha}.")]
    InvalidAlphaError {
        /// The rejected leakage parameter.
        alpha: u32,
        /// The address width `log2(n)`.
        k: u32,
    },
    /// Errors arising from a padding base smaller than 2.
    #[error("Padding base must be at least 2, got {base}.")]
    InvalidPaddingBaseError {
        /// The rejected padding base.
        base: Volume,
    },
    /// Errors arising from a permutation input outside `[0, 2^k)`.
    #[error("Input outside the domain of a {k}-bit permutation.")]
    PermutationDomainError {
        /// The width of the permutation domain in bits.
        k: u32,
    },
    /// Errors arising from a bucket holding more blocks than its capacity.
    /// Indicates a client logic bug; not recoverable.
    #[error("Bucket holds {len} blocks, exceeding its capacity of {capacity}.")]
    BucketOverflowError {
        /// The number of blocks in the offending bucket.
        len: usize,
        /// The bucket capacity `Z`.
        capacity: BucketSize,
    },
    /// Errors arising from writing a path of the wrong length.
    #[error("Expected a path of {expected} buckets, got {actual}.")]
    PathLengthMismatchError {
        /// The number of buckets on a root-to-leaf path.
        expected: usize,
        /// The number of buckets supplied.
        actual: usize,
    },
    /// Errors arising from invalid parameters or configuration.
    #[error("Invalid configuration.")]
    InvalidConfigurationError,
}
