//! Caches that accumulate columns over many calls ahead of a single materialisation.
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
    dispatch::{GroupedBuilder, check_data_type, concat_groups, make_grouped_builder},
    error::{KernelError, Result},
};
use arrow::array::{Array, ArrayRef};
use log::debug;

/// Appends whole batches. Later batches may carry extra trailing columns, but never fewer
/// columns than before.
#[derive(Debug, Default)]
pub struct ArrayListAppender {
    builders: Vec<Box<dyn GroupedBuilder>>,
}

impl ArrayListAppender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.builders.len()
    }

    /// Appends the full contents of every column in `columns`.
    ///
    /// # Errors
    /// If fewer columns are given than on a previous call, a column's type differs from
    /// earlier calls or a new column's type is not supported. Nothing is appended on error.
    pub fn evaluate(&mut self, columns: &[ArrayRef]) -> Result<()> {
        if columns.len() < self.builders.len() {
            return Err(KernelError::InvalidInput(format!(
                "{} columns supplied but {} were appended previously",
                columns.len(),
                self.builders.len()
            )));
        }
        for (builder, column) in self.builders.iter().zip(columns) {
            check_data_type(builder.data_type(), column.as_ref())?;
        }
        let new_builders = columns[self.builders.len()..]
            .iter()
            .map(|column| make_grouped_builder(column.data_type()))
            .collect::<Result<Vec<_>>>()?;
        if !new_builders.is_empty() {
            debug!("Appender binding {} new columns", new_builders.len());
        }
        self.builders.extend(new_builders);
        for (builder, column) in self.builders.iter_mut().zip(columns) {
            builder.append_column(column.as_ref(), 0)?;
        }
        Ok(())
    }

    /// Everything appended so far, one array per column. Appending may continue afterwards.
    ///
    /// # Errors
    /// If the cached arrays can't be combined.
    pub fn finish(&self) -> Result<Vec<ArrayRef>> {
        self.builders
            .iter()
            .map(|builder| concat_groups(builder.data_type(), &builder.finish_cloned()))
            .collect()
    }
}

/// Appends single columns at a caller chosen group id, typically to rebuild per-group
/// results that arrive over many calls.
#[derive(Debug, Default)]
pub struct ArrayAppender {
    builder: Option<Box<dyn GroupedBuilder>>,
}

impl ArrayAppender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every row of `column` to group `group_id`. The column type is fixed by the
    /// first call.
    ///
    /// # Errors
    /// If the column type differs from earlier calls or is not supported.
    pub fn evaluate(&mut self, column: &dyn Array, group_id: usize) -> Result<()> {
        let builder = match self.builder.take() {
            Some(builder) => builder,
            None => make_grouped_builder(column.data_type())?,
        };
        self.builder.insert(builder).append_column(column, group_id)
    }

    /// Every group's contents concatenated in group id order.
    ///
    /// # Errors
    /// If nothing was ever appended, as the output type is then unknown.
    pub fn finish_array(&self) -> Result<ArrayRef> {
        let Some(builder) = &self.builder else {
            return Err(KernelError::InvalidInput(
                "no column has been appended".into(),
            ));
        };
        concat_groups(builder.data_type(), &builder.finish_cloned())
    }

    /// One array per group id up to the largest id appended to. Groups that were never
    /// appended to are empty.
    #[must_use]
    pub fn finish_array_list(&self) -> Vec<ArrayRef> {
        self.builder
            .as_ref()
            .map(|builder| builder.finish_cloned())
            .unwrap_or_default()
    }
}
