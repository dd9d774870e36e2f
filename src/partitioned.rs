// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The partitioned client: a keyed permutation routes each global address
//! to one of `2^alpha` independent Path ORAM sub-trees, and every access
//! appends the observable sub-tree index to a leakage log.

use crate::client::PathOramClient;
use crate::partition::PartitionParams;
use crate::prp::{AffinePermutation, KEY_LENGTH};
use crate::server::ServerStats;
use crate::{Address, BucketSize, OramBlock, OramError, StashSize};
use rand::{CryptoRng, RngCore};
use std::mem;

/// One entry of the per-access leakage log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessLogEntry {
    /// The sub-tree that served the access. This alpha-bit index is what an
    /// observer of the scheme sees.
    pub sub_index: usize,
    /// The address within that sub-tree.
    pub local_id: Address,
    /// Buckets read from the sub-tree's server during the access.
    pub buckets_read: u64,
    /// Buckets written to the sub-tree's server during the access.
    pub buckets_written: u64,
    /// The sub-tree's stash size after the access.
    pub stash_size: StashSize,
    /// Estimated bytes moved between client and server.
    pub approx_bandwidth_bytes: u64,
}

/// Estimates the bytes moved by an access that touched the counted buckets,
/// each holding `bucket_capacity` blocks of `block_size_bytes`.
pub fn estimate_bandwidth_bytes(
    stats: ServerStats,
    bucket_capacity: BucketSize,
    block_size_bytes: usize,
) -> u64 {
    (stats.buckets_read + stats.buckets_written)
        * bucket_capacity as u64
        * block_size_bytes as u64
}

/// A client for the partitioned scheme: `m = 2^alpha` independent
/// [`PathOramClient`] sub-trees behind a keyed address permutation.
#[derive(Debug)]
pub struct PartitionedOram<V: OramBlock> {
    params: PartitionParams,
    prp: AffinePermutation,
    sub_trees: Vec<PathOramClient<V>>,
    bucket_capacity: BucketSize,
    /// The log entry of the most recent access.
    pub last_access: Option<AccessLogEntry>,
    /// Every access since construction or the last [`reset_log`](Self::reset_log).
    pub access_log: Vec<AccessLogEntry>,
}

impl<V: OramBlock> PartitionedOram<V> {
    /// Creates a partitioned ORAM for `n` blocks under a freshly sampled
    /// permutation key.
    pub fn new<R: RngCore + CryptoRng>(
        n: Address,
        bucket_capacity: BucketSize,
        alpha: u32,
        default_value: V,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        let mut key = [0u8; KEY_LENGTH];
        rng.fill_bytes(&mut key);
        Self::with_prp_key(n, bucket_capacity, alpha, default_value, &key, rng)
    }

    /// Creates a partitioned ORAM routing through the permutation derived
    /// from an explicit `key`.
    pub fn with_prp_key<R: RngCore + CryptoRng>(
        n: Address,
        bucket_capacity: BucketSize,
        alpha: u32,
        default_value: V,
        key: &[u8; KEY_LENGTH],
        rng: &mut R,
    ) -> Result<Self, OramError> {
        let params = PartitionParams::new(n, alpha)?;
        let prp = AffinePermutation::new(key, params.k)?;
        log::debug!(
            "PartitionedOram::new -- n = {}, Z = {}, alpha = {}, m = {}",
            n,
            bucket_capacity,
            alpha,
            params.m
        );

        let mut sub_trees = Vec::with_capacity(params.m);
        for _ in 0..params.m {
            sub_trees.push(PathOramClient::setup(
                params.local_n,
                bucket_capacity,
                default_value,
                rng,
            )?);
        }

        Ok(Self {
            params,
            prp,
            sub_trees,
            bucket_capacity,
            last_access: None,
            access_log: Vec::new(),
        })
    }

    /// The derived partitioning parameters.
    pub fn params(&self) -> &PartitionParams {
        &self.params
    }

    /// Routes a global address to `(sub-tree index, local address)`.
    ///
    /// The permuted address is split at `local_k` bits: the top `alpha`
    /// bits select the sub-tree, the rest the block within it. With
    /// `alpha == 0` the whole permuted address is local to sub-tree 0.
    pub fn route(&self, global_id: Address) -> Result<(usize, Address), OramError> {
        if global_id >= self.params.n {
            return Err(OramError::AddressOutOfBoundsError);
        }
        let permuted = self.prp.permute(global_id)?;

        if self.params.alpha == 0 {
            return Ok((0, permuted));
        }
        let sub_index = usize::try_from(permuted >> self.params.local_k)?;
        let local_id = permuted & ((1u64 << self.params.local_k) - 1);
        Ok((sub_index, local_id))
    }

    /// Performs one access: routes, delegates to the owning sub-tree, and
    /// appends the per-access leakage to the log.
    ///
    /// The sub-tree's counters are reset before delegating, so the log
    /// entry carries the exact bucket I/O of this access.
    pub fn access<R: RngCore + CryptoRng, F: Fn(&V) -> V>(
        &mut self,
        global_id: Address,
        callback: F,
        rng: &mut R,
    ) -> Result<V, OramError> {
        let (sub_index, local_id) = self.route(global_id)?;
        let sub_tree = &mut self.sub_trees[sub_index];

        sub_tree.reset_server_stats();
        let result = sub_tree.access(local_id, callback, rng)?;
        let stats = sub_tree.server_stats();

        let entry = AccessLogEntry {
            sub_index,
            local_id,
            buckets_read: stats.buckets_read,
            buckets_written: stats.buckets_written,
            stash_size: sub_tree.stash_size(),
            approx_bandwidth_bytes: estimate_bandwidth_bytes(
                stats,
                self.bucket_capacity,
                mem::size_of::<V>(),
            ),
        };
        self.last_access = Some(entry);
        self.access_log.push(entry);

        Ok(result)
    }

    /// Obliviously reads the value stored at `global_id`.
    pub fn read<R: RngCore + CryptoRng>(
        &mut self,
        global_id: Address,
        rng: &mut R,
    ) -> Result<V, OramError> {
        let callback = |value: &V| *value;
        self.access(global_id, callback, rng)
    }

    /// Obliviously writes `new_value` at `global_id`. Returns the value
    /// previously stored there.
    pub fn write<R: RngCore + CryptoRng>(
        &mut self,
        global_id: Address,
        new_value: V,
        rng: &mut R,
    ) -> Result<V, OramError> {
        let callback = |_: &V| new_value;
        self.access(global_id, callback, rng)
    }

    /// Clears the access log and the last-access entry.
    pub fn reset_log(&mut self) {
        self.access_log.clear();
        self.last_access = None;
    }
}
