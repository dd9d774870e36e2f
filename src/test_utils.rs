// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Shared test fixtures.

use crate::oracle::DatasetIndex;
use crate::{Address, QueryValue};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

/// Initializes logging for tests. Repeated calls are harmless; only the
/// first installs the logger.
pub(crate) fn init_logger() {
    let _ = TermLogger::init(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

/// Builds a fixed skewed dataset: `counts[v]` records carry value `v`, with
/// record ids assigned sequentially from 0. Values with a zero count are
/// left out of the index.
pub(crate) fn skewed_dataset(counts: &[usize]) -> DatasetIndex {
    let mut index = DatasetIndex::new();
    let mut next_id: Address = 0;
    for (value, count) in counts.iter().enumerate() {
        let ids: Vec<Address> = (next_id..next_id + *count as Address).collect();
        next_id += *count as Address;
        if !ids.is_empty() {
            index.insert(value as QueryValue, ids);
        }
    }
    index
}
