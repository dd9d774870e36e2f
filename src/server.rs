// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The server side of the protocol: a complete binary tree of buckets that
//! counts how many buckets each access touches.

use crate::bucket::Bucket;
use crate::tree::path_nodes;
use crate::{BucketSize, Leaf, OramBlock, OramError, TreeHeight};
use std::mem;

/// Counters of server-side bucket I/O. The per-access difference of these
/// counters is the bandwidth signal recorded in the leakage log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Buckets copied out of the tree by `read_path`.
    pub buckets_read: u64,
    /// Buckets installed into the tree by `write_path`.
    pub buckets_written: u64,
}

/// The bucket tree. The server exclusively owns its buckets: `read_path`
/// hands an owned snapshot to the caller and simultaneously installs fresh
/// all-dummy buckets on the path, so `write_path` is the only way a block
/// returns to the tree.
#[derive(Debug)]
pub struct ServerTree<V> {
    depth: TreeHeight,
    bucket_capacity: BucketSize,
    levels: Vec<Vec<Bucket<V>>>,
    stats: ServerStats,
}

impl<V: OramBlock> ServerTree<V> {
    /// Creates a tree of `depth + 1` levels with every bucket full of dummies.
    pub fn new(depth: TreeHeight, bucket_capacity: BucketSize) -> Self {
        let mut levels = Vec::with_capacity(depth as usize + 1);
        for level in 0..=depth {
            let width = 1usize << level;
            levels.push(
                (0..width)
                    .map(|_| Self::fresh_bucket(bucket_capacity))
                    .collect(),
            );
        }
        Self {
            depth,
            bucket_capacity,
            levels,
            stats: ServerStats::default(),
        }
    }

    fn fresh_bucket(bucket_capacity: BucketSize) -> Bucket<V> {
        let mut bucket = Bucket::new(bucket_capacity);
        bucket.fill_with_dummies(0);
        bucket
    }

    /// The depth of this tree; leaves live at level `depth`.
    pub fn depth(&self) -> TreeHeight {
        self.depth
    }

    /// The current bucket I/O counters.
    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    /// Zeroes the bucket I/O counters.
    pub fn reset_stats(&mut self) {
        self.stats = ServerStats::default();
    }

    /// Removes and returns the buckets on the path to `leaf` in root-to-leaf
    /// order, leaving fresh all-dummy buckets behind.
    pub fn read_path(&mut self, leaf: Leaf) -> Result<Vec<Bucket<V>>, OramError> {
        if leaf >> self.depth != 0 {
            return Err(OramError::AddressOutOfBoundsError);
        }
        log::debug!("Server read_path -- leaf {}", leaf);

        let mut path = Vec::with_capacity(self.depth as usize + 1);
        for (level, index) in path_nodes(leaf, self.depth) {
            self.stats.buckets_read += 1;
            let fresh = Self::fresh_bucket(self.bucket_capacity);
            let bucket =
                mem::replace(&mut self.levels[level as usize][usize::try_from(index)?], fresh);
            path.push(bucket);
        }
        Ok(path)
    }

    /// Installs `buckets` along the path to `leaf`. Requires exactly
    /// `depth + 1` buckets, each within capacity.
    pub fn write_path(&mut self, leaf: Leaf, buckets: Vec<Bucket<V>>) -> Result<(), OramError> {
        if leaf >> self.depth != 0 {
            return Err(OramError::AddressOutOfBoundsError);
        }
        log::debug!("Server write_path -- leaf {}", leaf);

        let nodes = path_nodes(leaf, self.depth);
        if buckets.len() != nodes.len() {
            return Err(OramError::PathLengthMismatchError {
                expected: nodes.len(),
                actual: buckets.len(),
            });
        }

        for (bucket, (level, index)) in buckets.into_iter().zip(nodes) {
            bucket.enforce_capacity()?;
            self.stats.buckets_written += 1;
            self.levels[level as usize][usize::try_from(index)?] = bucket;
        }
        Ok(())
    }

    /// Counts the real blocks currently stored in the tree.
    pub fn count_real_blocks(&self) -> usize {
        self.levels
            .iter()
            .flatten()
            .map(|bucket| bucket.real_blocks().count())
            .sum()
    }

    #[cfg(test)]
    pub(crate) fn real_addresses(&self) -> Vec<crate::Address> {
        self.levels
            .iter()
            .flatten()
            .flat_map(Bucket::real_blocks)
            .map(|block| block.address)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Block;

    fn padded_path(depth: TreeHeight, bucket_capacity: BucketSize) -> Vec<Bucket<u64>> {
        (0..=depth)
            .map(|_| {
                let mut bucket = Bucket::new(bucket_capacity);
                bucket.fill_with_dummies(0);
                bucket
            })
            .collect()
    }

    #[test]
    fn read_path_clears_the_path_and_counts() {
        let mut server = ServerTree::<u64>::new(3, 4);

        let mut path = padded_path(3, 4);
        path[3].blocks[0] = Block::new(7, 99, 5);
        server.write_path(5, path).unwrap();
        assert_eq!(server.count_real_blocks(), 1);

        let snapshot = server.read_path(5).unwrap();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(
            snapshot
                .iter()
                .map(|bucket| bucket.real_blocks().count())
                .sum::<usize>(),
            1
        );
        // The block now lives only in the returned snapshot.
        assert_eq!(server.count_real_blocks(), 0);

        assert_eq!(server.stats().buckets_read, 4);
        assert_eq!(server.stats().buckets_written, 4);
        server.reset_stats();
        assert_eq!(server.stats(), ServerStats::default());
    }

    #[test]
    fn write_path_rejects_wrong_length() {
        let mut server = ServerTree::<u64>::new(3, 4);
        let result = server.write_path(0, padded_path(2, 4));
        assert!(matches!(
            result,
            Err(OramError::PathLengthMismatchError {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn write_path_rejects_overfull_buckets() {
        let mut server = ServerTree::<u64>::new(1, 2);
        let mut path = padded_path(1, 2);
        path[0].blocks.push(Block::new(0, 0, 0));
        assert!(matches!(
            server.write_path(0, path),
            Err(OramError::BucketOverflowError { .. })
        ));
    }

    #[test]
    fn out_of_range_leaf_is_rejected() {
        let mut server = ServerTree::<u64>::new(2, 4);
        assert!(matches!(
            server.read_path(4),
            Err(OramError::AddressOutOfBoundsError)
        ));
    }
}
