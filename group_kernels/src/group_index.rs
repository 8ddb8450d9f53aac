//! Dense group id allocation from raw dictionary codes.
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
use crate::error::{KernelError, Result};
use arrow::{
    array::{Array, AsArray},
    datatypes::{
        ArrowDictionaryKeyType, ArrowNativeType, DataType, Int8Type, Int16Type, Int32Type,
        Int64Type, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
    },
};
use nohash::BuildNoHashHasher;
use std::collections::HashMap;

/// Maps raw dictionary codes to dense group ids.
///
/// The first time a code is seen it is given the next unused id, so ids are always the
/// contiguous range `0..len()` in order of first appearance. The mapping is append only
/// and lives as long as the owning kernel.
#[derive(Debug, Default)]
pub struct GroupIndex {
    ids: HashMap<u32, usize, BuildNoHashHasher<u32>>,
    codes: Vec<u32>,
}

impl GroupIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the dense group id for `code`, allocating one if this is the first sighting.
    pub fn resolve(&mut self, code: u32) -> usize {
        *self.ids.entry(code).or_insert_with(|| {
            self.codes.push(code);
            self.codes.len() - 1
        })
    }

    /// Resolves every code in order, returning one group id per code.
    pub fn resolve_all(&mut self, codes: &[u32]) -> Vec<usize> {
        codes.iter().map(|code| self.resolve(*code)).collect()
    }

    /// Number of groups allocated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Raw codes in group id order: position `g` holds the code that was given id `g`.
    #[must_use]
    pub fn codes(&self) -> &[u32] {
        &self.codes
    }
}

/// Extracts the raw codes of a dictionary-encoded column.
///
/// This is the validation gate in front of [`GroupIndex`]: every code returned is a valid
/// non-negative `u32`.
///
/// # Errors
/// If the column is a null column, is not dictionary encoded, or has null or negative keys.
pub fn dictionary_codes(dictionary: &dyn Array) -> Result<Vec<u32>> {
    let DataType::Dictionary(key_type, _) = dictionary.data_type() else {
        return Err(match dictionary.data_type() {
            DataType::Null => KernelError::InvalidInput("dictionary column is null".into()),
            other => KernelError::InvalidInput(format!(
                "expected a dictionary encoded column, found {other}"
            )),
        });
    };
    match key_type.as_ref() {
        DataType::Int8 => keys_to_codes::<Int8Type>(dictionary),
        DataType::Int16 => keys_to_codes::<Int16Type>(dictionary),
        DataType::Int32 => keys_to_codes::<Int32Type>(dictionary),
        DataType::Int64 => keys_to_codes::<Int64Type>(dictionary),
        DataType::UInt8 => keys_to_codes::<UInt8Type>(dictionary),
        DataType::UInt16 => keys_to_codes::<UInt16Type>(dictionary),
        DataType::UInt32 => keys_to_codes::<UInt32Type>(dictionary),
        DataType::UInt64 => keys_to_codes::<UInt64Type>(dictionary),
        other => Err(KernelError::InvalidInput(format!(
            "dictionary key type {other} is not an integer type"
        ))),
    }
}

fn keys_to_codes<K: ArrowDictionaryKeyType>(dictionary: &dyn Array) -> Result<Vec<u32>> {
    let Some(dictionary) = dictionary.as_dictionary_opt::<K>() else {
        return Err(KernelError::InvalidInput(format!(
            "column of type {} could not be read as a dictionary",
            dictionary.data_type()
        )));
    };
    let keys = dictionary.keys();
    if keys.null_count() > 0 {
        return Err(KernelError::InvalidInput(
            "dictionary column contains null keys".into(),
        ));
    }
    keys.values()
        .iter()
        .map(|key| {
            key.to_usize()
                .and_then(|code| u32::try_from(code).ok())
                .ok_or_else(|| {
                    KernelError::InvalidInput(format!(
                        "dictionary key {key:?} is not a valid group code"
                    ))
                })
        })
        .collect()
}
