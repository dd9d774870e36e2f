// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The Path ORAM client: a secret position map, a client-side stash, and an
//! access protocol that reads and rewrites exactly one root-to-leaf path.

use crate::bucket::{Block, Bucket};
use crate::server::{ServerStats, ServerTree};
use crate::tree::{depth_for_capacity, on_path_to_leaf, path_nodes, random_leaf};
use crate::{Address, BucketSize, Leaf, OramBlock, OramError, StashSize, TreeHeight};
use rand::{CryptoRng, RngCore};
use std::mem;

/// A Path ORAM client over a server-side bucket tree.
///
/// The client owns the position map and the stash; the server owns the
/// buckets. Every access reads and writes exactly `depth + 1` buckets.
#[derive(Debug)]
pub struct PathOramClient<V: OramBlock> {
    server: ServerTree<V>,
    position_map: Vec<Leaf>,
    stash: Vec<Block<V>>,
    capacity: Address,
    bucket_capacity: BucketSize,
    depth: TreeHeight,
    default_value: V,
}

impl<V: OramBlock> PathOramClient<V> {
    /// Creates a client for `capacity` blocks over a fresh all-dummy server
    /// tree, with every position map entry drawn independently at random.
    ///
    /// Reading an address that was never written returns `default_value`.
    pub fn setup<R: RngCore + CryptoRng>(
        capacity: Address,
        bucket_capacity: BucketSize,
        default_value: V,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        let depth = depth_for_capacity(capacity)?;
        log::debug!(
            "PathOramClient::setup -- B = {}, Z = {}, n = {}",
            mem::size_of::<V>(),
            bucket_capacity,
            capacity
        );

        let server = ServerTree::new(depth, bucket_capacity);
        let mut position_map = Vec::with_capacity(usize::try_from(capacity)?);
        for _ in 0..capacity {
            position_map.push(random_leaf(depth, rng));
        }

        Ok(Self {
            server,
            position_map,
            stash: Vec::new(),
            capacity,
            bucket_capacity,
            depth,
            default_value,
        })
    }

    /// Performs one oblivious access: returns the value `v` stored at
    /// `address` and stores `callback(v)` in its place.
    ///
    /// The position map entry for `address` is re-sampled before the old
    /// path is read, so the path an observer sees is uncorrelated with the
    /// block after the access.
    pub fn access<R: RngCore + CryptoRng, F: Fn(&V) -> V>(
        &mut self,
        address: Address,
        callback: F,
        rng: &mut R,
    ) -> Result<V, OramError> {
        if address >= self.capacity {
            return Err(OramError::AddressOutOfBoundsError);
        }
        let map_slot = usize::try_from(address)?;

        let old_leaf = self.position_map[map_slot];
        let new_leaf = random_leaf(self.depth, rng);
        self.position_map[map_slot] = new_leaf;

        // Pull every real block on the old path into the stash.
        for bucket in self.server.read_path(old_leaf)? {
            for block in bucket.blocks {
                if !block.is_dummy {
                    self.stash_put_or_replace(block);
                }
            }
        }

        // Find the target in the stash, materialising it on first touch.
        let target = match self.stash.iter().position(|block| block.address == address) {
            Some(index) => index,
            None => {
                self.stash
                    .push(Block::new(address, self.default_value, new_leaf));
                self.stash.len() - 1
            }
        };
        let block = &mut self.stash[target];
        block.leaf = new_leaf;
        let result = block.value;
        block.value = callback(&result);

        let new_path = self.evict_path(old_leaf);
        self.server.write_path(old_leaf, new_path)?;

        Ok(result)
    }

    /// Obliviously reads the value stored at `address`.
    pub fn read<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        rng: &mut R,
    ) -> Result<V, OramError> {
        log::debug!("ORAM read: {}", address);
        let callback = |value: &V| *value;
        self.access(address, callback, rng)
    }

    /// Obliviously writes `new_value` at `address`. Returns the value
    /// previously stored there.
    pub fn write<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        new_value: V,
        rng: &mut R,
    ) -> Result<V, OramError> {
        log::debug!("ORAM write: {}", address);
        let callback = |_: &V| new_value;
        self.access(address, callback, rng)
    }

    // The stash never holds two blocks with the same address: a block read
    // off the path replaces any stashed copy.
    fn stash_put_or_replace(&mut self, block: Block<V>) {
        for slot in &mut self.stash {
            if slot.address == block.address {
                *slot = block;
                return;
            }
        }
        self.stash.push(block);
    }

    // Rebuilds the path to `accessed_leaf` from the stash, deepest bucket
    // first. Each level takes the first `Z` stash blocks (in insertion
    // order) whose assigned leaf passes through it.
    fn evict_path(&mut self, accessed_leaf: Leaf) -> Vec<Bucket<V>> {
        let nodes = path_nodes(accessed_leaf, self.depth);
        let mut new_path: Vec<Bucket<V>> = (0..nodes.len())
            .map(|_| Bucket::new(self.bucket_capacity))
            .collect();

        for position in (0..nodes.len()).rev() {
            let (level, index) = nodes[position];
            let mut bucket = Bucket::new(self.bucket_capacity);

            let mut stash_index = 0;
            while stash_index < self.stash.len() && bucket.blocks.len() < self.bucket_capacity {
                let leaf = self.stash[stash_index].leaf;
                if on_path_to_leaf(level, index, leaf, self.depth) {
                    bucket.blocks.push(self.stash.remove(stash_index));
                } else {
                    stash_index += 1;
                }
            }

            bucket.fill_with_dummies(accessed_leaf);
            new_path[position] = bucket;
        }

        new_path
    }

    /// The capacity in blocks of this ORAM.
    pub fn capacity(&self) -> Address {
        self.capacity
    }

    /// The depth of the server tree.
    pub fn depth(&self) -> TreeHeight {
        self.depth
    }

    /// The number of blocks currently held in the stash.
    pub fn stash_size(&self) -> StashSize {
        self.stash.len()
    }

    /// The server's bucket I/O counters.
    pub fn server_stats(&self) -> ServerStats {
        self.server.stats()
    }

    /// Zeroes the server's bucket I/O counters.
    pub fn reset_server_stats(&mut self) {
        self.server.reset_stats();
    }

    /// Counts the real blocks across the stash and the server tree. After
    /// every block has been touched once this equals the capacity.
    pub fn count_real_blocks(&self) -> usize {
        self.stash.len() + self.server.count_real_blocks()
    }

    #[cfg(test)]
    pub(crate) fn real_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.stash.iter().map(|block| block.address).collect();
        addresses.extend(self.server.real_addresses());
        addresses
    }
}
