//! Partitioning of a batch of columns into one batch per group.
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
    dispatch::{GroupedBuilder, make_grouped_builder},
    error::{KernelError, Result},
    group_index::{GroupIndex, dictionary_codes},
};
use arrow::array::{Array, ArrayRef};
use log::debug;
use num_format::{Locale, ToFormattedString};

/// Result of one [`Splitter::split`] call.
///
/// All three vectors are indexed by dense group id and cover every group the splitter has
/// ever seen, so a group absent from the batch has zero length arrays and a size of zero.
#[derive(Debug, Default)]
pub struct SplitOutput {
    /// `groups[g][c]` holds the rows of column `c` that belong to group `g`, in row order.
    pub groups: Vec<Vec<ArrayRef>>,
    pub group_sizes: Vec<usize>,
    /// Raw dictionary code that was given each dense group id.
    pub group_codes: Vec<u32>,
}

/// Splits batches by dictionary code. Group ids are kept for the lifetime of the splitter
/// so the same code lands in the same output position on every call.
#[derive(Debug, Default)]
pub struct Splitter {
    group_index: GroupIndex,
}

impl Splitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct codes seen so far.
    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.group_index.len()
    }

    /// Partitions `columns` by the codes in `dictionary`.
    ///
    /// Nothing is changed if an error is returned.
    ///
    /// # Errors
    /// If `dictionary` is not a valid dictionary column, any column's length differs from
    /// it, or a column type is not supported.
    pub fn split(&mut self, columns: &[ArrayRef], dictionary: &dyn Array) -> Result<SplitOutput> {
        let codes = dictionary_codes(dictionary)?;
        for (index, column) in columns.iter().enumerate() {
            if column.len() != codes.len() {
                return Err(KernelError::InvalidInput(format!(
                    "column {index} has {} rows but the dictionary column has {}",
                    column.len(),
                    codes.len()
                )));
            }
        }
        let mut builders = columns
            .iter()
            .map(|column| make_grouped_builder(column.data_type()))
            .collect::<Result<Vec<Box<dyn GroupedBuilder>>>>()?;
        let mut writers = builders
            .iter_mut()
            .zip(columns)
            .map(|(builder, column)| builder.bind(column.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Splitting {} rows of {} columns",
            codes.len().to_formatted_string(&Locale::en),
            columns.len()
        );

        let group_ids = self.group_index.resolve_all(&codes);
        let num_groups = self.group_index.len();
        let mut group_sizes = vec![0; num_groups];
        for (row, &group_id) in group_ids.iter().enumerate() {
            group_sizes[group_id] += 1;
            for writer in &mut writers {
                writer(row, group_id);
            }
        }
        drop(writers);

        let mut groups = vec![Vec::with_capacity(columns.len()); num_groups];
        for builder in &mut builders {
            builder.ensure_groups(num_groups);
            for (group, array) in groups.iter_mut().zip(builder.finish()) {
                group.push(array);
            }
        }
        Ok(SplitOutput {
            groups,
            group_sizes,
            group_codes: self.group_index.codes().to_vec(),
        })
    }
}

/// Splits a single batch with a fresh [`Splitter`].
///
/// # Errors
/// See [`Splitter::split`].
pub fn split_array_list(columns: &[ArrayRef], dictionary: &dyn Array) -> Result<SplitOutput> {
    Splitter::new().split(columns, dictionary)
}
