/// Numeric summation per group.
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
    dispatch::check_data_type,
    error::{KernelError, Result},
    state::SeenState,
};
use arrow::{
    array::{Array, ArrayRef, ArrowPrimitiveType, AsArray, PrimitiveArray},
    datatypes::{
        ArrowNativeTypeOp, DataType, Decimal128Type, Float32Type, Float64Type, Int8Type,
        Int16Type, Int32Type, Int64Type, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
    },
};
use num_traits::AsPrimitive;
use std::{fmt::Debug, marker::PhantomData, sync::Arc};

/// Widest precision a 128 bit decimal can carry.
const MAX_DECIMAL128_PRECISION: u8 = 38;

/// Sums values of primitive type `T` into an accumulator of primitive type `A`.
///
/// Nulls are skipped. A group that never saw a non-null value produces null. Additions
/// wrap on overflow.
#[derive(Debug)]
pub struct SumAction<T, A>
where
    T: ArrowPrimitiveType,
    A: ArrowPrimitiveType,
{
    input_type: DataType,
    output_type: DataType,
    sums: Vec<A::Native>,
    seen: SeenState,
    _input: PhantomData<fn() -> T>,
}

impl<T, A> SumAction<T, A>
where
    T: ArrowPrimitiveType,
    A: ArrowPrimitiveType,
{
    pub fn new(input_type: &DataType, output_type: DataType) -> Self {
        Self {
            input_type: input_type.clone(),
            output_type,
            sums: Vec::new(),
            seen: SeenState::new(),
            _input: PhantomData,
        }
    }
}

impl<T, A> Action for SumAction<T, A>
where
    T: ArrowPrimitiveType + Debug,
    A: ArrowPrimitiveType + Debug,
    T::Native: AsPrimitive<A::Native>,
{
    fn kind(&self) -> ActionKind {
        ActionKind::Sum
    }

    fn input_type(&self) -> &DataType {
        &self.input_type
    }

    fn output_type(&self) -> DataType {
        self.output_type.clone()
    }

    fn num_groups(&self) -> usize {
        self.seen.len()
    }

    fn submit<'a>(
        &'a mut self,
        column: &'a dyn Array,
        max_group_id: usize,
    ) -> Result<UpdateFn<'a>> {
        check_data_type(&self.input_type, column)?;
        let array = column.as_primitive_opt::<T>().ok_or_else(|| {
            KernelError::InvalidInput(format!(
                "column of type {} could not be summed",
                column.data_type()
            ))
        })?;
        let total_num_groups = max_group_id + 1;
        if self.sums.len() < total_num_groups {
            self.sums.resize(total_num_groups, A::Native::default());
        }
        self.seen.resize(total_num_groups);

        let sums = &mut self.sums;
        let seen = &mut self.seen;
        let values = array.values();
        if array.null_count() == 0 {
            Ok(Box::new(move |row, group_id| {
                sums[group_id] = sums[group_id].add_wrapping(values[row].as_());
                seen.set(group_id);
            }))
        } else {
            Ok(Box::new(move |row, group_id| {
                if array.is_valid(row) {
                    sums[group_id] = sums[group_id].add_wrapping(values[row].as_());
                    seen.set(group_id);
                }
            }))
        }
    }

    fn finish(&mut self) -> Result<ArrayRef> {
        let sums = std::mem::take(&mut self.sums);
        let nulls = self.seen.build();
        let array = PrimitiveArray::<A>::try_new(sums.into(), Some(nulls))?
            .with_data_type(self.output_type.clone());
        Ok(Arc::new(array))
    }
}

/// Creates a sum for `input_type`, picking the accumulator width: signed integers sum into
/// `Int64`, unsigned into `UInt64`, floats into `Float64` and decimals into a full
/// precision `Decimal128` of the same scale.
///
/// # Errors
/// If `input_type` is not numeric.
pub fn make_sum_action(input_type: &DataType) -> Result<Box<dyn Action>> {
    macro_rules! sum_action {
        ($input:ty, $acc:ty, $output_type:expr) => {
            Ok(Box::new(SumAction::<$input, $acc>::new(input_type, $output_type)) as Box<dyn Action>)
        };
    }
    match input_type {
        DataType::Int8 => sum_action!(Int8Type, Int64Type, DataType::Int64),
        DataType::Int16 => sum_action!(Int16Type, Int64Type, DataType::Int64),
        DataType::Int32 => sum_action!(Int32Type, Int64Type, DataType::Int64),
        DataType::Int64 => sum_action!(Int64Type, Int64Type, DataType::Int64),
        DataType::UInt8 => sum_action!(UInt8Type, UInt64Type, DataType::UInt64),
        DataType::UInt16 => sum_action!(UInt16Type, UInt64Type, DataType::UInt64),
        DataType::UInt32 => sum_action!(UInt32Type, UInt64Type, DataType::UInt64),
        DataType::UInt64 => sum_action!(UInt64Type, UInt64Type, DataType::UInt64),
        DataType::Float32 => sum_action!(Float32Type, Float64Type, DataType::Float64),
        DataType::Float64 => sum_action!(Float64Type, Float64Type, DataType::Float64),
        DataType::Decimal128(_, scale) => sum_action!(
            Decimal128Type,
            Decimal128Type,
            DataType::Decimal128(MAX_DECIMAL128_PRECISION, *scale)
        ),
        _ => Err(KernelError::NotImplemented(format!(
            "{} does not support column type {input_type}",
            ActionKind::Sum
        ))),
    }
}
