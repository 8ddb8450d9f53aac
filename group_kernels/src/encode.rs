//! Dictionary encoding with codes that stay stable across calls.
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
use crate::{
    dispatch::{ColumnType, downcast_checked, downcast_column_type, unsupported_type},
    error::{KernelError, Result},
};
use arrow::{
    array::{Array, ArrayBuilder, ArrayRef, DictionaryArray, UInt32Array},
    datatypes::{DataType, UInt32Type},
};
use log::debug;
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
};

/// Maps distinct values of one column type to sequential codes.
trait MemoTable: Debug + Send {
    fn data_type(&self) -> &DataType;

    /// Number of distinct values, including null if it has been seen.
    fn len(&self) -> usize;

    /// Returns a code for every row of `column`, assigning new codes to unseen values.
    fn encode(&mut self, column: &dyn Array) -> Result<Vec<u32>>;

    /// Distinct values in code order.
    fn values(&self) -> ArrayRef;
}

struct TypedMemoTable<C: ColumnType> {
    data_type: DataType,
    codes: HashMap<C::Key, u32>,
    null_code: Option<u32>,
    values: C::Builder,
}

impl<C: ColumnType> TypedMemoTable<C> {
    fn new(data_type: &DataType) -> Self {
        Self {
            data_type: data_type.clone(),
            codes: HashMap::new(),
            null_code: None,
            values: C::new_builder(data_type, 0),
        }
    }
}

impl<C: ColumnType> Debug for TypedMemoTable<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedMemoTable")
            .field("data_type", &self.data_type)
            .field("len", &self.values.len())
            .field("null_code", &self.null_code)
            .finish()
    }
}

/// Code the next value appended to `values` will get.
fn next_code(values: &dyn ArrayBuilder) -> u32 {
    u32::try_from(values.len()).expect("dictionary size checked before encoding")
}

impl<C: ColumnType> MemoTable for TypedMemoTable<C> {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn encode(&mut self, column: &dyn Array) -> Result<Vec<u32>> {
        let array = downcast_checked::<C>(&self.data_type, column)?;
        if u32::try_from(self.values.len() + column.len()).is_err() {
            return Err(KernelError::InvalidInput(format!(
                "encoding {} more rows could exceed the dictionary size limit",
                column.len()
            )));
        }
        let values = &mut self.values;
        let mut indices = Vec::with_capacity(column.len());
        for row in 0..column.len() {
            let code = match C::key(array, row) {
                Some(key) => *self.codes.entry(key).or_insert_with(|| {
                    let code = next_code(values);
                    C::append(values, array, row);
                    code
                }),
                None => *self.null_code.get_or_insert_with(|| {
                    let code = next_code(values);
                    C::append(values, array, row);
                    code
                }),
            };
            indices.push(code);
        }
        Ok(indices)
    }

    fn values(&self) -> ArrayRef {
        self.values.finish_cloned()
    }
}

fn make_memo_table(data_type: &DataType) -> Result<Box<dyn MemoTable>> {
    macro_rules! memo_table_helper {
        ($t:ty, $dt:expr) => {
            Ok(Box::new(TypedMemoTable::<$t>::new($dt)) as Box<dyn MemoTable>)
        };
    }
    downcast_column_type!(data_type => (memo_table_helper, data_type), _ => Err(unsupported_type(data_type)))
}

/// Dictionary encodes columns of a single type.
///
/// The value type is fixed by the first column encoded. Codes are handed out in order of
/// first appearance and never change, so the same value gets the same code on every call.
/// Null is treated as a value with a code of its own, so the returned keys are never null.
#[derive(Debug, Default)]
pub struct DictionaryEncoder {
    memo: Option<Box<dyn MemoTable>>,
}

impl DictionaryEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes `column`. The dictionary of the result holds every distinct value seen by
    /// this encoder so far.
    ///
    /// # Errors
    /// If the column type differs from earlier calls or is not supported.
    pub fn encode(&mut self, column: &dyn Array) -> Result<DictionaryArray<UInt32Type>> {
        let memo = match self.memo.take() {
            Some(memo) => memo,
            None => {
                debug!("Creating dictionary encoder for {}", column.data_type());
                make_memo_table(column.data_type())?
            }
        };
        let memo = self.memo.insert(memo);
        let keys = memo.encode(column)?;
        Ok(DictionaryArray::try_new(
            UInt32Array::from(keys),
            memo.values(),
        )?)
    }

    /// Number of distinct values seen so far.
    #[must_use]
    pub fn dictionary_size(&self) -> usize {
        self.memo.as_ref().map_or(0, |memo| memo.len())
    }

    /// Type of the values being encoded, once known.
    #[must_use]
    pub fn value_type(&self) -> Option<&DataType> {
        self.memo.as_ref().map(|memo| memo.data_type())
    }
}
