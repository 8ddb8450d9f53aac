//! The grouped aggregator drives one [`Action`] per column over many batches.
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
    action::{Action, ActionKind},
    dispatch::check_data_type,
    error::{KernelError, Result},
    group_index::{GroupIndex, dictionary_codes},
};
use arrow::array::{Array, ArrayRef};
use log::{debug, info};
use num_format::{Locale, ToFormattedString};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregatorState {
    Uninitialized,
    Initialized,
    Finished,
}

/// Folds batches of columns into per-group state, one action per column, then emits one
/// row per group.
///
/// Raw dictionary codes are densified through a [`GroupIndex`] owned by the aggregator, so
/// output row `g` belongs to the code at position `g` of [`GroupedAggregator::group_codes`].
///
/// Action names are resolved against the first batch's column types, either explicitly via
/// [`GroupedAggregator::initialize`] or implicitly by the first
/// [`GroupedAggregator::evaluate`].
#[derive(Debug)]
pub struct GroupedAggregator {
    action_names: Vec<String>,
    actions: Vec<Box<dyn Action>>,
    group_index: GroupIndex,
    state: AggregatorState,
    rows: usize,
    eval_elapsed: Duration,
}

impl GroupedAggregator {
    /// Creates an aggregator that will apply `action_names[i]` to column `i`.
    pub fn new<I, S>(action_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action_names: action_names.into_iter().map(Into::into).collect(),
            actions: Vec::new(),
            group_index: GroupIndex::new(),
            state: AggregatorState::Uninitialized,
            rows: 0,
            eval_elapsed: Duration::ZERO,
        }
    }

    /// Creates one action per column using the column types of `columns`.
    ///
    /// # Errors
    /// If already initialised, the column count differs from the number of action names, an
    /// action name is not recognised or an action does not support its column's type.
    pub fn initialize(&mut self, columns: &[ArrayRef]) -> Result<()> {
        if self.state != AggregatorState::Uninitialized {
            return Err(KernelError::InvalidInput(
                "aggregator is already initialised".into(),
            ));
        }
        if columns.len() != self.action_names.len() {
            return Err(KernelError::InvalidInput(format!(
                "{} columns supplied for {} actions",
                columns.len(),
                self.action_names.len()
            )));
        }
        self.actions = self
            .action_names
            .iter()
            .zip(columns)
            .map(|(name, column)| ActionKind::try_from(name.as_str())?.make(column.data_type()))
            .collect::<Result<Vec<_>>>()?;
        debug!("Aggregator initialised with actions {:?}", self.action_names);
        self.state = AggregatorState::Initialized;
        Ok(())
    }

    /// Folds one batch into the running state.
    ///
    /// Either every row is applied to every action or, on error, no state is changed.
    ///
    /// # Errors
    /// If the aggregator has finished, the dictionary column is invalid, the columns do
    /// not line up with the actions, or initialisation fails.
    pub fn evaluate(&mut self, columns: &[ArrayRef], dictionary: &dyn Array) -> Result<()> {
        if self.state == AggregatorState::Finished {
            return Err(KernelError::InvalidInput(
                "aggregator has already finished".into(),
            ));
        }
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
        // Initialisation either binds every action or leaves the aggregator untouched.
        if self.state == AggregatorState::Uninitialized {
            self.initialize(columns)?;
        }
        if columns.len() != self.actions.len() {
            return Err(KernelError::InvalidInput(format!(
                "{} columns supplied for {} actions",
                columns.len(),
                self.actions.len()
            )));
        }
        for (column, action) in columns.iter().zip(&self.actions) {
            check_data_type(action.input_type(), column.as_ref())?;
        }

        let group_ids = self.group_index.resolve_all(&codes);
        let Some(max_group_id) = group_ids.iter().copied().max() else {
            return Ok(());
        };
        let start = Instant::now();
        let mut updates = self
            .actions
            .iter_mut()
            .zip(columns)
            .map(|(action, column)| action.submit(column.as_ref(), max_group_id))
            .collect::<Result<Vec<_>>>()?;
        for (row, &group_id) in group_ids.iter().enumerate() {
            for update in &mut updates {
                update(row, group_id);
            }
        }
        drop(updates);
        self.eval_elapsed += start.elapsed();
        self.rows += codes.len();
        Ok(())
    }

    /// Materialises one column per action with one row per group.
    ///
    /// An aggregator that never saw a batch returns no columns at all, not one empty column
    /// per action, because the action output types depend on column types that are only
    /// known once a batch has been evaluated.
    ///
    /// # Errors
    /// If called a second time or an action can't build its output.
    pub fn finish(&mut self) -> Result<Vec<ArrayRef>> {
        match self.state {
            AggregatorState::Finished => Err(KernelError::InvalidInput(
                "aggregator has already finished".into(),
            )),
            AggregatorState::Uninitialized => {
                self.state = AggregatorState::Finished;
                Ok(Vec::new())
            }
            AggregatorState::Initialized => {
                let results = self
                    .actions
                    .iter_mut()
                    .map(|action| action.finish())
                    .collect::<Result<Vec<_>>>()?;
                self.state = AggregatorState::Finished;
                info!(
                    "Aggregated {} rows into {} groups, {:.3} seconds spent in update loop",
                    self.rows.to_formatted_string(&Locale::en),
                    self.group_index.len().to_formatted_string(&Locale::en),
                    self.eval_elapsed.as_secs_f64()
                );
                Ok(results)
            }
        }
    }

    /// Raw dictionary code of each output row.
    #[must_use]
    pub fn group_codes(&self) -> &[u32] {
        self.group_index.codes()
    }

    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.group_index.len()
    }

    /// Rows folded in so far.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::GroupedAggregator;
    use crate::{KernelError, assert_error};
    use arrow::{
        array::{
            Array, ArrayRef, AsArray, DictionaryArray, Int8Array, Int64Array, ListArray,
            NullArray, StringArray, UInt32Array,
        },
        datatypes::{Int8Type, Int64Type, UInt32Type},
    };
    use color_eyre::eyre::Result;
    use std::sync::Arc;
    use test_log::test;

    fn make_dictionary(codes: Vec<u32>) -> Result<DictionaryArray<UInt32Type>> {
        let size = codes.iter().max().map_or(0, |max| *max as usize + 1);
        let values = (0..size).map(|v| format!("key{v}")).collect::<Vec<_>>();
        Ok(DictionaryArray::try_new(
            UInt32Array::from(codes),
            Arc::new(StringArray::from(values)),
        )?)
    }

    fn int_column(values: Vec<i64>) -> ArrayRef {
        Arc::new(Int64Array::from(values))
    }

    #[test]
    fn should_sum_per_group() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_sum"]);

        // When
        aggregator.evaluate(
            &[int_column(vec![1, 2, 3, 4])],
            &make_dictionary(vec![0, 1, 0, 1])?,
        )?;
        let result = aggregator.finish()?;

        // Then
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].as_primitive::<Int64Type>(),
            &Int64Array::from(vec![4, 6])
        );
        Ok(())
    }

    #[test]
    fn should_fuse_all_actions_across_batches() -> Result<()> {
        // Given
        let mut aggregator =
            GroupedAggregator::new(["action_sum", "action_count", "action_unique"]);
        let names: ArrayRef = Arc::new(StringArray::from(vec!["x", "y", "x"]));
        let more_names: ArrayRef = Arc::new(StringArray::from(vec!["z", "x"]));

        // When
        aggregator.evaluate(
            &[int_column(vec![10, 20, 30]), int_column(vec![0, 0, 0]), names],
            &make_dictionary(vec![7, 2, 7])?,
        )?;
        aggregator.evaluate(
            &[int_column(vec![5, 6]), int_column(vec![0, 0]), more_names],
            &make_dictionary(vec![2, 4])?,
        )?;
        let result = aggregator.finish()?;

        // Then
        assert_eq!(aggregator.group_codes(), &[7, 2, 4]);
        assert_eq!(aggregator.rows(), 5);
        assert_eq!(
            result[0].as_primitive::<Int64Type>(),
            &Int64Array::from(vec![40, 25, 6])
        );
        assert_eq!(
            result[1].as_primitive::<Int64Type>(),
            &Int64Array::from(vec![2, 2, 1])
        );
        let unique = result[2].as_list::<i32>();
        assert_eq!(unique.value(0).as_string::<i32>(), &StringArray::from(vec!["x"]));
        assert_eq!(
            unique.value(1).as_string::<i32>(),
            &StringArray::from(vec!["y", "z"])
        );
        assert_eq!(unique.value(2).as_string::<i32>(), &StringArray::from(vec!["x"]));
        Ok(())
    }

    #[test]
    fn should_accept_signed_dictionary_keys() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_count"]);
        let dictionary = DictionaryArray::<Int8Type>::try_new(
            Int8Array::from(vec![1, 1, 0]),
            Arc::new(StringArray::from(vec!["a", "b"])),
        )?;

        // When
        aggregator.evaluate(&[int_column(vec![1, 2, 3])], &dictionary)?;

        // Then
        assert_eq!(
            aggregator.finish()?[0].as_primitive::<Int64Type>(),
            &Int64Array::from(vec![2, 1])
        );
        Ok(())
    }

    #[test]
    fn should_report_unknown_action_on_evaluate() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_bogus"]);

        // When
        let result = aggregator.evaluate(&[int_column(vec![1])], &make_dictionary(vec![0])?);

        // Then
        assert_error!(
            result,
            KernelError::NotImplemented,
            "action_bogus is not implemented"
        );
        Ok(())
    }

    #[test]
    fn should_reject_column_count_mismatch() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_sum", "action_count"]);

        // When
        let result = aggregator.initialize(&[int_column(vec![1])]);

        // Then
        assert_error!(
            result,
            KernelError::InvalidInput,
            "1 columns supplied for 2 actions"
        );
        Ok(())
    }

    #[test]
    fn should_reject_null_dictionary() {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_sum"]);

        // When
        let result = aggregator.evaluate(&[int_column(vec![1, 2])], &NullArray::new(2));

        // Then
        assert_error!(
            result,
            KernelError::InvalidInput,
            "dictionary column is null"
        );
    }

    #[test]
    fn should_reject_type_drift_without_changing_state() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_sum"]);
        aggregator.evaluate(&[int_column(vec![1])], &make_dictionary(vec![0])?)?;
        let strings: ArrayRef = Arc::new(StringArray::from(vec!["a"]));

        // When
        let result = aggregator.evaluate(&[strings], &make_dictionary(vec![3])?);

        // Then
        assert_error!(
            result,
            KernelError::InvalidInput,
            "column type Utf8 does not match expected type Int64"
        );
        assert_eq!(aggregator.num_groups(), 1);
        assert_eq!(aggregator.finish()?[0].len(), 1);
        Ok(())
    }

    #[test]
    fn should_not_bind_actions_from_rejected_first_batch() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_count"]);
        let rejected = aggregator.evaluate(
            &[int_column(vec![1, 2, 3])],
            &make_dictionary(vec![0, 1])?,
        );
        let names: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));

        // When
        aggregator.evaluate(&[names], &make_dictionary(vec![0, 0])?)?;
        let result = aggregator.finish()?;

        // Then
        assert_error!(
            rejected,
            KernelError::InvalidInput,
            "column 0 has 3 rows but the dictionary column has 2"
        );
        assert_eq!(aggregator.rows(), 2);
        assert_eq!(
            result[0].as_primitive::<Int64Type>(),
            &Int64Array::from(vec![2])
        );
        Ok(())
    }

    #[test]
    fn should_not_implement_count_over_list_column() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_count"]);
        let lists: ArrayRef = Arc::new(ListArray::from_iter_primitive::<Int64Type, _, _>(vec![
            Some(vec![Some(1)]),
            None,
        ]));

        // When
        let result = aggregator.evaluate(&[lists], &make_dictionary(vec![0, 1])?);

        // Then
        assert!(matches!(result, Err(KernelError::NotImplemented(_))));
        assert_eq!(aggregator.num_groups(), 0);
        assert!(aggregator.finish()?.is_empty());
        Ok(())
    }

    #[test]
    fn should_finish_empty_before_evaluate() -> Result<()> {
        let mut aggregator = GroupedAggregator::new(["action_sum"]);
        assert!(aggregator.finish()?.is_empty());
        Ok(())
    }

    #[test]
    fn should_reject_use_after_finish() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_count"]);
        aggregator.evaluate(&[int_column(vec![1])], &make_dictionary(vec![0])?)?;
        aggregator.finish()?;

        // When
        let evaluate = aggregator.evaluate(&[int_column(vec![1])], &make_dictionary(vec![0])?);
        let finish = aggregator.finish();

        // Then
        assert_error!(
            evaluate,
            KernelError::InvalidInput,
            "aggregator has already finished"
        );
        assert_error!(
            finish,
            KernelError::InvalidInput,
            "aggregator has already finished"
        );
        Ok(())
    }

    #[test]
    fn should_ignore_empty_batch() -> Result<()> {
        // Given
        let mut aggregator = GroupedAggregator::new(["action_count"]);

        // When
        aggregator.evaluate(&[int_column(vec![])], &make_dictionary(vec![])?)?;
        let result = aggregator.finish()?;

        // Then
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 0);
        Ok(())
    }
}
