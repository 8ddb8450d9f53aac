/// Row counting per group.
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
use super::{Action, ActionKind, UpdateFn};
use crate::{
    dispatch::{check_data_type, downcast_column_type, unsupported_type},
    error::Result,
};
use arrow::{
    array::{Array, ArrayRef, Int64Array},
    datatypes::DataType,
};
use std::sync::Arc;

/// Counts every row submitted for a group, nulls included. Values are never read.
#[derive(Debug)]
pub struct CountAction {
    input_type: DataType,
    counts: Vec<i64>,
}

impl CountAction {
    #[must_use]
    pub(crate) fn new(input_type: &DataType) -> Self {
        Self {
            input_type: input_type.clone(),
            counts: Vec::new(),
        }
    }
}

impl Action for CountAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Count
    }

    fn input_type(&self) -> &DataType {
        &self.input_type
    }

    fn output_type(&self) -> DataType {
        DataType::Int64
    }

    fn num_groups(&self) -> usize {
        self.counts.len()
    }

    fn submit<'a>(
        &'a mut self,
        column: &'a dyn Array,
        max_group_id: usize,
    ) -> Result<UpdateFn<'a>> {
        check_data_type(&self.input_type, column)?;
        if self.counts.len() <= max_group_id {
            self.counts.resize(max_group_id + 1, 0);
        }
        let counts = &mut self.counts;
        Ok(Box::new(move |_row, group_id| counts[group_id] += 1))
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        Ok(Arc::new(Int64Array::from(std::mem::take(&mut self.counts))))
    }
}

/// Creates a counter for `input_type`. Values are never read, but the column type must
/// still be one the kernels support.
///
/// # Errors
/// If `input_type` is not a supported column type.
pub fn make_count_action(input_type: &DataType) -> Result<Box<dyn Action>> {
    macro_rules! count_helper {
        ($t:ty, $dt:expr) => {
            Ok(Box::new(CountAction::new($dt)) as Box<dyn Action>)
        };
    }
    downcast_column_type!(input_type => (count_helper, input_type), _ => Err(unsupported_type(input_type)))
}
