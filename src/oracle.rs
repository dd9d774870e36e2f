// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Leakage oracles: what an adversary observes when point queries run
//! against the partitioned scheme, and against a constant-volume baseline.

use crate::padding::next_power_of;
use crate::partitioned::PartitionedOram;
use crate::{Address, OramBlock, OramError, QueryValue, Volume};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Maps each plaintext value to the ids of the records carrying it.
///
/// An ordered map so that record enumeration (and with it `enc_id`
/// assignment) is deterministic across runs.
pub type DatasetIndex = BTreeMap<QueryValue, Vec<Address>>;

/// The public per-value record counts the attacks assume known.
pub type ValueCounts = BTreeMap<QueryValue, Volume>;

/// Derives the public value-count histogram from a dataset index.
pub fn value_counts(index: &DatasetIndex) -> ValueCounts {
    index
        .iter()
        .map(|(value, ids)| (*value, ids.len()))
        .collect()
}

/// One record of the conceptual encrypted database. An adversary sees only
/// `alpha_prefix`; the plaintext `value` is retained to score attacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptedTuple {
    /// Identifier assigned in dataset enumeration order.
    pub enc_id: u64,
    /// The plaintext value of the underlying record.
    pub value: QueryValue,
    /// The sub-tree index of the record: the top alpha bits of its
    /// permuted address.
    pub alpha_prefix: usize,
}

/// What the adversary observes for one point query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryObservation {
    /// The position of the query in the stream; opaque to the adversary.
    pub token_id: usize,
    /// The (possibly padded) number of returned records.
    pub observed_volume: Volume,
    /// The alpha-prefix of each returned record, dummies included.
    pub returned_prefixes: Vec<usize>,
}

/// The success rates of one attack run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackOutcome {
    /// Query recovery success rate.
    pub qrsr: f64,
    /// Database recovery success rate; `None` when not computed.
    pub drsr: Option<f64>,
}

/// Produces the leakage trace of the partitioned scheme for point queries:
/// per query, an observed volume and the alpha-prefix of every returned
/// record.
#[derive(Debug)]
pub struct LeakageOracle<'a, V: OramBlock> {
    client: &'a PartitionedOram<V>,
    dataset_index: &'a DatasetIndex,
    padding_x: Option<Volume>,
    rng_seed: u64,
}

impl<'a, V: OramBlock> LeakageOracle<'a, V> {
    /// Creates an oracle over `dataset_index` routed through `client`.
    /// Dummy prefixes for padded queries are drawn from a stream seeded by
    /// `rng_seed` plus the query's token, so traces are reproducible.
    pub fn new(
        client: &'a PartitionedOram<V>,
        dataset_index: &'a DatasetIndex,
        padding_x: Option<Volume>,
        rng_seed: u64,
    ) -> Self {
        Self {
            client,
            dataset_index,
            padding_x,
            rng_seed,
        }
    }

    /// Enumerates the conceptual encrypted database: one tuple per record,
    /// in dataset iteration order. Consumed by the database-recovery attack.
    pub fn encrypted_tuples(&self) -> Result<Vec<EncryptedTuple>, OramError> {
        let mut tuples = Vec::new();
        let mut enc_id = 0;
        for (value, ids) in self.dataset_index {
            for id in ids {
                let (alpha_prefix, _) = self.client.route(*id)?;
                tuples.push(EncryptedTuple {
                    enc_id,
                    value: *value,
                    alpha_prefix,
                });
                enc_id += 1;
            }
        }
        Ok(tuples)
    }

    /// Observes the leakage of a single point query for `value`.
    ///
    /// A value absent from the dataset yields volume 0 and no prefixes.
    pub fn observe_query(
        &self,
        value: QueryValue,
        token_id: usize,
    ) -> Result<(QueryValue, QueryObservation), OramError> {
        let ids: &[Address] = self
            .dataset_index
            .get(&value)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut prefixes = Vec::with_capacity(ids.len());
        for id in ids {
            prefixes.push(self.client.route(*id)?.0);
        }

        let real_volume = prefixes.len();
        let padded_volume = next_power_of(real_volume, self.padding_x)?;
        if padded_volume > real_volume {
            // Dummy records land in uniformly random sub-trees.
            let mut rng = StdRng::seed_from_u64(self.rng_seed.wrapping_add(token_id as u64));
            for _ in real_volume..padded_volume {
                prefixes.push(rng.gen_range(0..self.client.params().m));
            }
        }

        Ok((
            value,
            QueryObservation {
                token_id,
                observed_volume: padded_volume,
                returned_prefixes: prefixes,
            },
        ))
    }

    /// Observes a stream of queries, assigning token ids by position.
    pub fn observe_query_stream(
        &self,
        values: &[QueryValue],
    ) -> Result<Vec<(QueryValue, QueryObservation)>, OramError> {
        values
            .iter()
            .enumerate()
            .map(|(token_id, value)| self.observe_query(*value, token_id))
            .collect()
    }

    /// Observes one query per distinct indexed value, in index order.
    pub fn observe_all_queries(&self) -> Result<Vec<(QueryValue, QueryObservation)>, OramError> {
        self.dataset_index
            .keys()
            .enumerate()
            .map(|(token_id, value)| self.observe_query(*value, token_id))
            .collect()
    }
}

/// The baseline: a monolithic oblivious tree answers every query with the
/// same volume and returns no prefixes, so volume and prefix signals both
/// vanish. Database recovery against this oracle is reported as 0 by
/// convention.
#[derive(Clone, Copy, Debug)]
pub struct ConstantVolumeOracle {
    constant_volume: Volume,
    padding_x: Option<Volume>,
}

impl ConstantVolumeOracle {
    /// Creates a baseline oracle answering with `constant_volume`.
    pub fn new(constant_volume: Volume, padding_x: Option<Volume>) -> Self {
        Self {
            constant_volume,
            padding_x,
        }
    }

    /// Observes a single query.
    pub fn observe_query(
        &self,
        value: QueryValue,
        token_id: usize,
    ) -> Result<(QueryValue, QueryObservation), OramError> {
        Ok((
            value,
            QueryObservation {
                token_id,
                observed_volume: next_power_of(self.constant_volume, self.padding_x)?,
                returned_prefixes: Vec::new(),
            },
        ))
    }

    /// Observes a stream of queries, assigning token ids by position.
    pub fn observe_query_stream(
        &self,
        values: &[QueryValue],
    ) -> Result<Vec<(QueryValue, QueryObservation)>, OramError> {
        values
            .iter()
            .enumerate()
            .map(|(token_id, value)| self.observe_query(*value, token_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::skewed_dataset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_client(n: Address, alpha: u32, seed: u64) -> PartitionedOram<u64> {
        let mut rng = StdRng::seed_from_u64(seed);
        PartitionedOram::new(n, 4, alpha, 0, &mut rng).unwrap()
    }

    #[test]
    fn unpadded_volumes_match_the_dataset_counts() {
        let index = skewed_dataset(&[40, 17, 9, 9, 3, 1, 1]);
        let client = small_client(128, 3, 0);
        let oracle = LeakageOracle::new(&client, &index, None, 5);

        let values: Vec<QueryValue> = index.keys().copied().collect();
        let observations = oracle.observe_query_stream(&values).unwrap();
        assert_eq!(observations.len(), values.len());

        for (value, observation) in &observations {
            assert_eq!(observation.observed_volume, index[value].len());
            assert_eq!(
                observation.returned_prefixes.len(),
                observation.observed_volume
            );
            assert!(observation
                .returned_prefixes
                .iter()
                .all(|prefix| *prefix < 8));
        }
    }

    #[test]
    fn alpha_zero_leaks_only_zero_prefixes() {
        let index = skewed_dataset(&[5, 3, 2]);
        let client = small_client(16, 0, 1);
        let oracle = LeakageOracle::new(&client, &index, None, 9);

        for (value, observation) in oracle.observe_all_queries().unwrap() {
            assert_eq!(observation.observed_volume, index[&value].len());
            assert!(observation.returned_prefixes.iter().all(|prefix| *prefix == 0));
        }
    }

    #[test]
    fn missing_values_observe_an_empty_result() {
        let index = skewed_dataset(&[4]);
        let client = small_client(16, 2, 2);
        let oracle = LeakageOracle::new(&client, &index, Some(2), 3);

        let (_, observation) = oracle.observe_query(99, 0).unwrap();
        assert_eq!(observation.observed_volume, 0);
        assert!(observation.returned_prefixes.is_empty());
    }

    #[test]
    fn padded_queries_append_reproducible_dummy_prefixes() {
        let index = skewed_dataset(&[3]);
        let client = small_client(16, 2, 4);
        let oracle = LeakageOracle::new(&client, &index, Some(2), 77);

        let (_, first) = oracle.observe_query(0, 6).unwrap();
        assert_eq!(first.observed_volume, 4);
        assert_eq!(first.returned_prefixes.len(), 4);
        assert!(first.returned_prefixes.iter().all(|prefix| *prefix < 4));

        // The dummy tail is a function of (seed, token) only.
        let (_, second) = oracle.observe_query(0, 6).unwrap();
        assert_eq!(first, second);
        let (_, other_token) = oracle.observe_query(0, 7).unwrap();
        assert_eq!(other_token.observed_volume, 4);
    }

    #[test]
    fn encrypted_tuples_enumerate_every_record() {
        let index = skewed_dataset(&[4, 2, 1]);
        let client = small_client(8, 3, 5);
        let oracle = LeakageOracle::new(&client, &index, None, 0);

        let tuples = oracle.encrypted_tuples().unwrap();
        assert_eq!(tuples.len(), 7);
        for (position, tuple) in tuples.iter().enumerate() {
            assert_eq!(tuple.enc_id, position as u64);
            assert!(tuple.alpha_prefix < 8);
        }
        assert_eq!(tuples.iter().filter(|tuple| tuple.value == 0).count(), 4);
    }

    #[test]
    fn the_constant_volume_oracle_reveals_nothing_but_its_constant() {
        let oracle = ConstantVolumeOracle::new(3, Some(2));
        let observations = oracle.observe_query_stream(&[10, 20, 30]).unwrap();
        for (_, observation) in observations {
            assert_eq!(observation.observed_volume, 4);
            assert!(observation.returned_prefixes.is_empty());
        }
    }
}
