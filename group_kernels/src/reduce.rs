//! Whole array reductions whose results are cached across calls.
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
    action::ActionKind, append::ArrayAppender, encode::DictionaryEncoder, error::Result,
};
use arrow::array::{Array, ArrayRef};

/// Reduces each column it is given to a small array and appends that to a cache.
///
/// * [`ActionKind::Unique`] caches the distinct values of the column, null included once.
///   Empty columns add nothing.
/// * [`ActionKind::Sum`] caches one value, the sum of the non-null values or null if there
///   are none.
/// * [`ActionKind::Count`] caches one value, the number of rows.
#[derive(Debug)]
pub struct ArrayReducer {
    kind: ActionKind,
    cache: ArrayAppender,
}

impl ArrayReducer {
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            cache: ArrayAppender::new(),
        }
    }

    /// Creates a reducer from an action name.
    ///
    /// # Errors
    /// If the name is not recognised.
    pub fn try_from_name(name: &str) -> Result<Self> {
        ActionKind::try_from(name).map(Self::new)
    }

    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Reduces `column` and caches the result.
    ///
    /// # Errors
    /// If the column type can't be reduced by this kind, or the reduced type differs from
    /// earlier results.
    pub fn evaluate(&mut self, column: &dyn Array) -> Result<()> {
        let reduced = match self.kind {
            ActionKind::Unique => {
                if column.is_empty() {
                    return Ok(());
                }
                DictionaryEncoder::new().encode(column)?.values().clone()
            }
            ActionKind::Sum | ActionKind::Count => {
                let mut action = self.kind.make(column.data_type())?;
                let mut update = action.submit(column, 0)?;
                for row in 0..column.len() {
                    update(row, 0);
                }
                drop(update);
                action.finish()?
            }
        };
        self.cache.evaluate(reduced.as_ref(), 0)
    }

    /// All cached results, in the order they were produced. May be called repeatedly.
    ///
    /// # Errors
    /// If nothing has been cached yet.
    pub fn finish(&self) -> Result<ArrayRef> {
        self.cache.finish_array()
    }
}
