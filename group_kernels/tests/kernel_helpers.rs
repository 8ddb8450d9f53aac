/*
 * Copyright 2022-2025 Crown Copyright
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
use arrow::{
    array::{ArrayRef, DictionaryArray, Int64Array, StringArray, UInt32Array},
    datatypes::UInt32Type,
};
use color_eyre::eyre::Error;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{collections::HashMap, sync::Arc};

/// Seeds used by every randomised test so failures are reproducible.
pub const SEEDS: [u64; 4] = [1, 7, 42, 2025];

#[must_use]
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Sparse raw codes drawn from `distinct` possible values spread over a wide range.
pub fn random_codes(rng: &mut StdRng, rows: usize, distinct: u32) -> Vec<u32> {
    (0..rows)
        .map(|_| rng.random_range(0..distinct) * 1_000 + 3)
        .collect()
}

pub fn random_values(rng: &mut StdRng, rows: usize) -> Vec<i64> {
    (0..rows).map(|_| rng.random_range(-1_000..1_000)).collect()
}

/// A dictionary column whose keys are `codes`, with one string value per possible code.
#[allow(clippy::missing_errors_doc)]
pub fn dictionary_of(codes: &[u32]) -> Result<DictionaryArray<UInt32Type>, Error> {
    let size = codes.iter().max().map_or(0, |max| *max as usize + 1);
    let values = (0..size).map(|v| format!("k{v}")).collect::<Vec<_>>();
    Ok(DictionaryArray::try_new(
        UInt32Array::from(codes.to_vec()),
        Arc::new(StringArray::from(values)),
    )?)
}

#[must_use]
pub fn int_column(values: &[i64]) -> ArrayRef {
    Arc::new(Int64Array::from(values.to_vec()))
}

/// Distinct codes in order of first appearance.
#[must_use]
pub fn first_seen(codes: &[u32]) -> Vec<u32> {
    let mut seen = Vec::new();
    for code in codes {
        if !seen.contains(code) {
            seen.push(*code);
        }
    }
    seen
}

/// Values of every row whose code is `code`, in row order.
#[must_use]
pub fn rows_for(code: u32, codes: &[u32], values: &[i64]) -> Vec<i64> {
    codes
        .iter()
        .zip(values)
        .filter(|(c, _)| **c == code)
        .map(|(_, v)| *v)
        .collect()
}

/// Reference `(count, sum)` per code.
#[must_use]
pub fn count_and_sum(codes: &[u32], values: &[i64]) -> HashMap<u32, (i64, i64)> {
    let mut totals = HashMap::new();
    for (code, value) in codes.iter().zip(values) {
        let entry = totals.entry(*code).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += value;
    }
    totals
}
