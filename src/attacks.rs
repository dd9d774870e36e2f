// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Randomised adversaries against the leakage stream: query recovery from
//! observed volumes, and database recovery from volumes plus alpha-prefixes.
//!
//! Both attackers know the per-value record counts, keep a shared pool of
//! not-yet-guessed values, and never fail hard: an empty candidate set is a
//! graceful miss. All randomness flows from an explicit seed so identical
//! inputs score identically.

use crate::oracle::{AttackOutcome, EncryptedTuple, QueryObservation, ValueCounts};
use crate::padding::next_power_of;
use crate::{OramError, QueryValue, Volume};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};

/// Groups the plaintext values by padded record count. These are the
/// candidate pools a volume observation narrows a query down to.
pub fn padded_size_buckets(
    counts: &ValueCounts,
    x: Option<Volume>,
) -> Result<BTreeMap<Volume, Vec<QueryValue>>, OramError> {
    let mut buckets: BTreeMap<Volume, Vec<QueryValue>> = BTreeMap::new();
    for (value, count) in counts {
        buckets
            .entry(next_power_of(*count, x)?)
            .or_default()
            .push(*value);
    }
    Ok(buckets)
}

// One guessing step: pick uniformly among the not-yet-guessed values whose
// padded count matches the observed volume, and retire the pick.
fn guess_queried_value(
    buckets: &BTreeMap<Volume, Vec<QueryValue>>,
    remaining: &mut HashSet<QueryValue>,
    observed_volume: Volume,
    rng: &mut StdRng,
) -> Option<QueryValue> {
    let candidates: Vec<QueryValue> = buckets
        .get(&observed_volume)
        .map(|values| {
            values
                .iter()
                .copied()
                .filter(|value| remaining.contains(value))
                .collect()
        })
        .unwrap_or_default();

    if candidates.is_empty() {
        return None;
    }
    let guess = candidates[rng.gen_range(0..candidates.len())];
    remaining.remove(&guess);
    Some(guess)
}

/// Guesses which plaintext value each observation queried, from its volume
/// alone. Returns the fraction of observations guessed correctly (QRSR).
pub fn query_recovery_attack(
    counts: &ValueCounts,
    observations: &[(QueryValue, QueryObservation)],
    x: Option<Volume>,
    rng_seed: u64,
) -> Result<f64, OramError> {
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let buckets = padded_size_buckets(counts, x)?;
    let mut remaining: HashSet<QueryValue> = counts.keys().copied().collect();

    let mut correct = 0;
    for (true_value, observation) in observations {
        let guess =
            guess_queried_value(&buckets, &mut remaining, observation.observed_volume, &mut rng);
        if guess == Some(*true_value) {
            correct += 1;
        }
    }

    if observations.is_empty() {
        return Ok(0.0);
    }
    Ok(correct as f64 / observations.len() as f64)
}

/// Additionally binds each returned record to a plaintext value: after the
/// volume-based guess, every returned alpha-prefix is matched against a
/// uniformly drawn still-live encrypted tuple under that prefix. Returns
/// the fraction of returned records bound correctly (DRSR), 0 if no
/// records were returned.
pub fn database_recovery_attack(
    counts: &ValueCounts,
    encrypted_tuples: &[EncryptedTuple],
    observations: &[(QueryValue, QueryObservation)],
    x: Option<Volume>,
    rng_seed: u64,
) -> Result<f64, OramError> {
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let buckets = padded_size_buckets(counts, x)?;
    let mut remaining: HashSet<QueryValue> = counts.keys().copied().collect();

    // Tuples are consumed as the attack binds them.
    let mut live_by_prefix: BTreeMap<usize, Vec<EncryptedTuple>> = BTreeMap::new();
    for tuple in encrypted_tuples {
        live_by_prefix
            .entry(tuple.alpha_prefix)
            .or_default()
            .push(*tuple);
    }

    let mut correct = 0;
    let mut returned = 0;
    for (_, observation) in observations {
        let guess =
            guess_queried_value(&buckets, &mut remaining, observation.observed_volume, &mut rng);

        for prefix in &observation.returned_prefixes {
            returned += 1;
            let pool = match live_by_prefix.get_mut(prefix) {
                Some(pool) if !pool.is_empty() => pool,
                // Nothing left under that prefix; the record can't be bound.
                _ => continue,
            };
            let chosen = pool.remove(rng.gen_range(0..pool.len()));
            if guess == Some(chosen.value) {
                correct += 1;
            }
        }
    }

    if returned == 0 {
        return Ok(0.0);
    }
    Ok(f64::from(correct) / f64::from(returned))
}

/// Runs the query-recovery attack, and the database-recovery attack when
/// `encrypted_tuples` is supplied, over one observation stream.
pub fn evaluate_attacks(
    counts: &ValueCounts,
    encrypted_tuples: Option<&[EncryptedTuple]>,
    observations: &[(QueryValue, QueryObservation)],
    x: Option<Volume>,
    rng_seed: u64,
) -> Result<AttackOutcome, OramError> {
    let qrsr = query_recovery_attack(counts, observations, x, rng_seed)?;
    let drsr = match encrypted_tuples {
        Some(tuples) => Some(database_recovery_attack(
            counts,
            tuples,
            observations,
            x,
            rng_seed,
        )?),
        None => None,
    };
    Ok(AttackOutcome { qrsr, drsr })
}
