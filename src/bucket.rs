// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Blocks and the fixed-capacity buckets that hold them.

use crate::{Address, BucketSize, Leaf, OramBlock, OramError};

/// The parameter "Z" from the Path ORAM literature that sets the number of blocks per bucket; typical values are 3 or 4.
/// Here we adopt the more conservative setting of 4.
pub const DEFAULT_BLOCKS_PER_BUCKET: BucketSize = 4;

/// The address reserved for dummy blocks.
pub(crate) const DUMMY_ADDRESS: Address = Address::MAX;

/// A block stored in a bucket: a value together with its ORAM address and its
/// currently assigned leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Block<V> {
    /// The ORAM address of this block; `Address::MAX` marks dummies.
    pub address: Address,
    /// The stored value; filler for dummies.
    pub value: V,
    /// The leaf this block is assigned to. For a real block leaving the
    /// stash this equals the client's position map entry for `address`.
    pub leaf: Leaf,
    /// Whether this block is a dummy occupying a bucket slot.
    pub is_dummy: bool,
}

impl<V: OramBlock> Block<V> {
    /// Creates a real block.
    pub fn new(address: Address, value: V, leaf: Leaf) -> Self {
        Self {
            address,
            value,
            leaf,
            is_dummy: false,
        }
    }

    /// Creates a dummy block assigned to `leaf_hint`.
    pub fn dummy(leaf_hint: Leaf) -> Self {
        Self {
            address: DUMMY_ADDRESS,
            value: V::default(),
            leaf: leaf_hint,
            is_dummy: true,
        }
    }
}

/// A bucket holding up to `capacity` blocks. After every server-visible
/// operation a bucket holds exactly `capacity` blocks, padded with dummies.
#[derive(Clone, Debug)]
pub struct Bucket<V> {
    capacity: BucketSize,
    pub(crate) blocks: Vec<Block<V>>,
}

impl<V: OramBlock> Bucket<V> {
    /// Creates an empty bucket with room for `capacity` blocks.
    pub fn new(capacity: BucketSize) -> Self {
        Self {
            capacity,
            blocks: Vec::with_capacity(capacity),
        }
    }

    /// The capacity `Z` of this bucket.
    pub fn capacity(&self) -> BucketSize {
        self.capacity
    }

    /// The real (non-dummy) blocks in this bucket.
    pub fn real_blocks(&self) -> impl Iterator<Item = &Block<V>> {
        self.blocks.iter().filter(|block| !block.is_dummy)
    }

    /// Appends dummy blocks until the bucket holds exactly `capacity` blocks.
    pub fn fill_with_dummies(&mut self, leaf_hint: Leaf) {
        while self.blocks.len() < self.capacity {
            self.blocks.push(Block::dummy(leaf_hint));
        }
    }

    /// Fails if the bucket holds more blocks than its capacity.
    pub fn enforce_capacity(&self) -> Result<(), OramError> {
        if self.blocks.len() > self.capacity {
            return Err(OramError::BucketOverflowError {
                len: self.blocks.len(),
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}
