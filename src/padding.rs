// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The volume padding rule.

use crate::{OramError, Volume};

/// Pads `s` up to the smallest power of `x` that is at least `s`;
/// `x == None` disables padding. For example `next_power_of(13, Some(4))`
/// is 16.
///
/// Volumes of 0 and 1 are returned unchanged. In particular an empty result
/// set is *not* padded up to `x^0 = 1`, so emptiness stays observable — a
/// deliberate one-bit leak kept for compatibility with the padded-size
/// bucketing the attacks perform.
pub fn next_power_of(s: Volume, x: Option<Volume>) -> Result<Volume, OramError> {
    let x = match x {
        Some(x) => x,
        None => return Ok(s),
    };
    if x < 2 {
        return Err(OramError::InvalidPaddingBaseError { base: x });
    }
    if s <= 1 {
        return Ok(s);
    }

    let mut power = 1;
    while power < s {
        power *= x;
    }
    Ok(power)
}
