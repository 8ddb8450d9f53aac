/// Distinct value collection per group.
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
    dispatch::{ColumnType, concat_groups, downcast_checked, downcast_column_type, unsupported_type},
    error::Result,
};
use arrow::{
    array::{Array, ArrayBuilder, ArrayRef, ListArray},
    buffer::OffsetBuffer,
    datatypes::{DataType, Field, FieldRef},
};
use std::{
    collections::HashSet,
    fmt::{Debug, Formatter},
    sync::Arc,
};

/// Collects the distinct non-null values of each group in first-seen order.
///
/// Finishing yields a list column with one entry per group.
pub struct UniqueAction<C: ColumnType> {
    input_type: DataType,
    item_field: FieldRef,
    seen: Vec<HashSet<C::Key>>,
    values: Vec<C::Builder>,
}

impl<C: ColumnType> UniqueAction<C> {
    pub fn new(input_type: &DataType) -> Self {
        Self {
            input_type: input_type.clone(),
            item_field: Arc::new(Field::new("item", input_type.clone(), true)),
            seen: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<C: ColumnType> Debug for UniqueAction<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueAction")
            .field("input_type", &self.input_type)
            .field("num_groups", &self.seen.len())
            .finish()
    }
}

impl<C: ColumnType> Action for UniqueAction<C> {
    fn kind(&self) -> ActionKind {
        ActionKind::Unique
    }

    fn input_type(&self) -> &DataType {
        &self.input_type
    }

    fn output_type(&self) -> DataType {
        DataType::List(self.item_field.clone())
    }

    fn num_groups(&self) -> usize {
        self.seen.len()
    }

    fn submit<'a>(
        &'a mut self,
        column: &'a dyn Array,
        max_group_id: usize,
    ) -> Result<UpdateFn<'a>> {
        let array = downcast_checked::<C>(&self.input_type, column)?;
        let total_num_groups = max_group_id + 1;
        if self.seen.len() < total_num_groups {
            let input_type = &self.input_type;
            self.seen.resize_with(total_num_groups, HashSet::new);
            self.values
                .resize_with(total_num_groups, || C::new_builder(input_type, 0));
        }
        let seen = &mut self.seen;
        let values = &mut self.values;
        Ok(Box::new(move |row, group_id| {
            if let Some(key) = C::key(array, row) {
                if seen[group_id].insert(key) {
                    C::append(&mut values[group_id], array, row);
                }
            }
        }))
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        self.seen.clear();
        let groups = self
            .values
            .drain(..)
            .map(|mut builder| builder.finish())
            .collect::<Vec<_>>();
        let offsets = OffsetBuffer::from_lengths(groups.iter().map(|group| group.len()));
        let values = concat_groups(&self.input_type, &groups)?;
        Ok(Arc::new(ListArray::try_new(
            self.item_field.clone(),
            offsets,
            values,
            None,
        )?))
    }
}

/// Creates a unique collector for `input_type`.
///
/// # Errors
/// If `input_type` is not a supported column type.
pub fn make_unique_action(input_type: &DataType) -> Result<Box<dyn Action>> {
    macro_rules! unique_helper {
        ($t:ty, $dt:expr) => {
            Ok(Box::new(UniqueAction::<$t>::new($dt)) as Box<dyn Action>)
        };
    }
    downcast_column_type!(input_type => (unique_helper, input_type), _ => Err(unsupported_type(input_type)))
}
