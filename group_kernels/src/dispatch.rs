//! Runtime type dispatch from an Arrow [`DataType`] to statically typed column code.
//!
//! Kernels are written once against the [`ColumnType`] trait and instantiated for each
//! supported column type through [`downcast_column_type!`]. The supported types are:
//! booleans, all signed and unsigned integer widths, 32 and 64 bit floats, dates, times,
//! timestamps (any unit and time zone), 128 bit decimals, UTF-8 and binary strings (both
//! offset widths) and fixed size binary.
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
    array::{
        Array, ArrayBuilder, ArrayRef, ArrowPrimitiveType, AsArray, BooleanArray,
        BooleanBuilder, FixedSizeBinaryArray, FixedSizeBinaryBuilder, GenericByteArray,
        GenericByteBuilder, PrimitiveArray, PrimitiveBuilder, new_empty_array,
    },
    compute::concat,
    datatypes::{ByteArrayType, DataType},
};
use std::{
    fmt::{Debug, Formatter},
    hash::Hash,
    marker::PhantomData,
};

/// Hashable identity of a primitive value.
///
/// Floats are keyed on their bit pattern so that they can be hashed. This means `NaN`
/// values with the same payload are equal to each other and `0.0` differs from `-0.0`.
pub trait NativeKey: Copy {
    type Key: Hash + Eq + Clone + Debug + Send + Sync + 'static;

    fn to_key(self) -> Self::Key;
}

macro_rules! identity_native_key {
    ($($t:ty),+) => {
        $(
            impl NativeKey for $t {
                type Key = $t;

                fn to_key(self) -> Self::Key {
                    self
                }
            }
        )+
    };
}

identity_native_key!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl NativeKey for f32 {
    type Key = u32;

    fn to_key(self) -> Self::Key {
        self.to_bits()
    }
}

impl NativeKey for f64 {
    type Key = u64;

    fn to_key(self) -> Self::Key {
        self.to_bits()
    }
}

/// Static description of one family of Arrow column types.
pub trait ColumnType: 'static {
    type Array: Array + 'static;
    type Builder: ArrayBuilder + Debug;
    type Key: Hash + Eq + Clone + Debug + Send + Sync + 'static;

    fn downcast(array: &dyn Array) -> Option<&Self::Array>;

    /// Creates an empty builder whose output arrays have exactly `data_type`.
    fn new_builder(data_type: &DataType, capacity: usize) -> Self::Builder;

    /// Copies `row` (value or null) from `array` onto the end of `builder`.
    fn append(builder: &mut Self::Builder, array: &Self::Array, row: usize);

    /// Hashable value of `row`, or `None` if it is null.
    fn key(array: &Self::Array, row: usize) -> Option<Self::Key>;
}

#[derive(Debug)]
pub struct PrimitiveColumn<T>(PhantomData<fn() -> T>);

impl<T> ColumnType for PrimitiveColumn<T>
where
    T: ArrowPrimitiveType + Debug,
    T::Native: NativeKey,
{
    type Array = PrimitiveArray<T>;
    type Builder = PrimitiveBuilder<T>;
    type Key = <T::Native as NativeKey>::Key;

    fn downcast(array: &dyn Array) -> Option<&Self::Array> {
        array.as_primitive_opt::<T>()
    }

    fn new_builder(data_type: &DataType, capacity: usize) -> Self::Builder {
        PrimitiveBuilder::<T>::with_capacity(capacity).with_data_type(data_type.clone())
    }

    fn append(builder: &mut Self::Builder, array: &Self::Array, row: usize) {
        if array.is_null(row) {
            builder.append_null();
        } else {
            builder.append_value(array.value(row));
        }
    }

    fn key(array: &Self::Array, row: usize) -> Option<Self::Key> {
        array.is_valid(row).then(|| array.value(row).to_key())
    }
}

#[derive(Debug)]
pub struct BooleanColumn;

impl ColumnType for BooleanColumn {
    type Array = BooleanArray;
    type Builder = BooleanBuilder;
    type Key = bool;

    fn downcast(array: &dyn Array) -> Option<&Self::Array> {
        array.as_boolean_opt()
    }

    fn new_builder(_data_type: &DataType, capacity: usize) -> Self::Builder {
        BooleanBuilder::with_capacity(capacity)
    }

    fn append(builder: &mut Self::Builder, array: &Self::Array, row: usize) {
        if array.is_null(row) {
            builder.append_null();
        } else {
            builder.append_value(array.value(row));
        }
    }

    fn key(array: &Self::Array, row: usize) -> Option<Self::Key> {
        array.is_valid(row).then(|| array.value(row))
    }
}

/// Variable length strings and binary, keyed on their raw bytes.
#[derive(Debug)]
pub struct ByteColumn<T>(PhantomData<fn() -> T>);

impl<T: ByteArrayType> ColumnType for ByteColumn<T> {
    type Array = GenericByteArray<T>;
    type Builder = GenericByteBuilder<T>;
    type Key = Vec<u8>;

    fn downcast(array: &dyn Array) -> Option<&Self::Array> {
        array.as_bytes_opt::<T>()
    }

    fn new_builder(_data_type: &DataType, capacity: usize) -> Self::Builder {
        GenericByteBuilder::<T>::with_capacity(capacity, capacity * 8)
    }

    fn append(builder: &mut Self::Builder, array: &Self::Array, row: usize) {
        if array.is_null(row) {
            builder.append_null();
        } else {
            builder.append_value(array.value(row));
        }
    }

    fn key(array: &Self::Array, row: usize) -> Option<Self::Key> {
        array.is_valid(row).then(|| {
            let bytes: &[u8] = array.value(row).as_ref();
            bytes.to_vec()
        })
    }
}

#[derive(Debug)]
pub struct FixedBinaryColumn;

impl ColumnType for FixedBinaryColumn {
    type Array = FixedSizeBinaryArray;
    type Builder = FixedSizeBinaryBuilder;
    type Key = Vec<u8>;

    fn downcast(array: &dyn Array) -> Option<&Self::Array> {
        array.as_fixed_size_binary_opt()
    }

    /// # Panics
    /// If `data_type` is not a fixed size binary type. Dispatch only selects this column
    /// type for that case.
    fn new_builder(data_type: &DataType, capacity: usize) -> Self::Builder {
        let DataType::FixedSizeBinary(byte_width) = data_type else {
            unreachable!("FixedBinaryColumn created for {data_type}");
        };
        FixedSizeBinaryBuilder::with_capacity(capacity, *byte_width)
    }

    fn append(builder: &mut Self::Builder, array: &Self::Array, row: usize) {
        if array.is_null(row) {
            builder.append_null();
        } else {
            builder
                .append_value(array.value(row))
                .expect("byte width checked when binding");
        }
    }

    fn key(array: &Self::Array, row: usize) -> Option<Self::Key> {
        array.is_valid(row).then(|| array.value(row).to_vec())
    }
}

/// Expands `$helper!(ColumnTypeImpl, $args...)` for the [`ColumnType`] matching
/// `$data_type`, or evaluates `$fallback` for types without one.
macro_rules! downcast_column_type {
    ($data_type:expr => ($helper:ident $(, $args:expr)* $(,)?), _ => $fallback:expr $(,)?) => {{
        use ::arrow::datatypes::{DataType, TimeUnit};
        use $crate::dispatch::{BooleanColumn, ByteColumn, FixedBinaryColumn, PrimitiveColumn};
        match $data_type {
            DataType::Boolean => $helper!(BooleanColumn $(, $args)*),
            DataType::Int8 => $helper!(PrimitiveColumn<::arrow::datatypes::Int8Type> $(, $args)*),
            DataType::Int16 => $helper!(PrimitiveColumn<::arrow::datatypes::Int16Type> $(, $args)*),
            DataType::Int32 => $helper!(PrimitiveColumn<::arrow::datatypes::Int32Type> $(, $args)*),
            DataType::Int64 => $helper!(PrimitiveColumn<::arrow::datatypes::Int64Type> $(, $args)*),
            DataType::UInt8 => $helper!(PrimitiveColumn<::arrow::datatypes::UInt8Type> $(, $args)*),
            DataType::UInt16 => $helper!(PrimitiveColumn<::arrow::datatypes::UInt16Type> $(, $args)*),
            DataType::UInt32 => $helper!(PrimitiveColumn<::arrow::datatypes::UInt32Type> $(, $args)*),
            DataType::UInt64 => $helper!(PrimitiveColumn<::arrow::datatypes::UInt64Type> $(, $args)*),
            DataType::Float32 => $helper!(PrimitiveColumn<::arrow::datatypes::Float32Type> $(, $args)*),
            DataType::Float64 => $helper!(PrimitiveColumn<::arrow::datatypes::Float64Type> $(, $args)*),
            DataType::Date32 => $helper!(PrimitiveColumn<::arrow::datatypes::Date32Type> $(, $args)*),
            DataType::Date64 => $helper!(PrimitiveColumn<::arrow::datatypes::Date64Type> $(, $args)*),
            DataType::Time32(TimeUnit::Second) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::Time32SecondType> $(, $args)*)
            }
            DataType::Time32(TimeUnit::Millisecond) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::Time32MillisecondType> $(, $args)*)
            }
            DataType::Time64(TimeUnit::Microsecond) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::Time64MicrosecondType> $(, $args)*)
            }
            DataType::Time64(TimeUnit::Nanosecond) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::Time64NanosecondType> $(, $args)*)
            }
            DataType::Timestamp(TimeUnit::Second, _) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::TimestampSecondType> $(, $args)*)
            }
            DataType::Timestamp(TimeUnit::Millisecond, _) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::TimestampMillisecondType> $(, $args)*)
            }
            DataType::Timestamp(TimeUnit::Microsecond, _) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::TimestampMicrosecondType> $(, $args)*)
            }
            DataType::Timestamp(TimeUnit::Nanosecond, _) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::TimestampNanosecondType> $(, $args)*)
            }
            DataType::Decimal128(_, _) => {
                $helper!(PrimitiveColumn<::arrow::datatypes::Decimal128Type> $(, $args)*)
            }
            DataType::Utf8 => $helper!(ByteColumn<::arrow::datatypes::Utf8Type> $(, $args)*),
            DataType::LargeUtf8 => $helper!(ByteColumn<::arrow::datatypes::LargeUtf8Type> $(, $args)*),
            DataType::Binary => $helper!(ByteColumn<::arrow::datatypes::BinaryType> $(, $args)*),
            DataType::LargeBinary => {
                $helper!(ByteColumn<::arrow::datatypes::LargeBinaryType> $(, $args)*)
            }
            DataType::FixedSizeBinary(_) => $helper!(FixedBinaryColumn $(, $args)*),
            _ => $fallback,
        }
    }};
}

pub(crate) use downcast_column_type;

pub(crate) fn unsupported_type(data_type: &DataType) -> KernelError {
    KernelError::NotImplemented(format!("column type {data_type} is not supported"))
}

pub(crate) fn check_data_type(data_type: &DataType, column: &dyn Array) -> Result<()> {
    if column.data_type() == data_type {
        Ok(())
    } else {
        Err(KernelError::InvalidInput(format!(
            "column type {} does not match expected type {data_type}",
            column.data_type()
        )))
    }
}

/// Checks `column` has exactly `data_type` and views it as the concrete array type.
pub(crate) fn downcast_checked<'a, C: ColumnType>(
    data_type: &DataType,
    column: &'a dyn Array,
) -> Result<&'a C::Array> {
    check_data_type(data_type, column)?;
    C::downcast(column).ok_or_else(|| {
        KernelError::InvalidInput(format!("column of type {data_type} could not be downcast"))
    })
}

/// Concatenates per-group arrays, yielding an empty array of `data_type` when there are none.
pub(crate) fn concat_groups(data_type: &DataType, arrays: &[ArrayRef]) -> Result<ArrayRef> {
    if arrays.is_empty() {
        return Ok(new_empty_array(data_type));
    }
    let refs = arrays.iter().map(AsRef::as_ref).collect::<Vec<&dyn Array>>();
    Ok(concat(&refs)?)
}

/// Copies one row of a bound column into a group: `writer(row, group_index)`.
pub type RowWriter<'a> = Box<dyn FnMut(usize, usize) + 'a>;

/// A set of per-group array builders that all share one column type.
pub trait GroupedBuilder: Debug + Send {
    fn data_type(&self) -> &DataType;

    fn num_groups(&self) -> usize;

    /// Makes sure at least `total_num_groups` groups exist so that empty groups still
    /// produce a (zero length) array on finish.
    fn ensure_groups(&mut self, total_num_groups: usize);

    /// Type checks `column` once and returns a writer that copies its rows into groups.
    /// Groups are created on demand by the writer.
    ///
    /// # Errors
    /// If `column` does not have this builder's data type.
    fn bind<'a>(&'a mut self, column: &'a dyn Array) -> Result<RowWriter<'a>>;

    /// Appends every row of `column` onto group `group_index`.
    ///
    /// # Errors
    /// If `column` does not have this builder's data type.
    fn append_column(&mut self, column: &dyn Array, group_index: usize) -> Result<()>;

    /// One array per group, resetting every group to empty.
    fn finish(&mut self) -> Vec<ArrayRef>;

    /// One array per group, leaving the builders untouched.
    fn finish_cloned(&self) -> Vec<ArrayRef>;
}

pub struct TypedGroupedBuilder<C: ColumnType> {
    data_type: DataType,
    builders: Vec<C::Builder>,
}

impl<C: ColumnType> TypedGroupedBuilder<C> {
    pub fn new(data_type: &DataType) -> Self {
        Self {
            data_type: data_type.clone(),
            builders: Vec::new(),
        }
    }
}

impl<C: ColumnType> Debug for TypedGroupedBuilder<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedGroupedBuilder")
            .field("data_type", &self.data_type)
            .field("num_groups", &self.builders.len())
            .finish()
    }
}

impl<C: ColumnType> GroupedBuilder for TypedGroupedBuilder<C> {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn num_groups(&self) -> usize {
        self.builders.len()
    }

    fn ensure_groups(&mut self, total_num_groups: usize) {
        if self.builders.len() < total_num_groups {
            let data_type = &self.data_type;
            self.builders
                .resize_with(total_num_groups, || C::new_builder(data_type, 0));
        }
    }

    fn bind<'a>(&'a mut self, column: &'a dyn Array) -> Result<RowWriter<'a>> {
        let array = downcast_checked::<C>(&self.data_type, column)?;
        let data_type = &self.data_type;
        let builders = &mut self.builders;
        Ok(Box::new(move |row, group_index| {
            if group_index >= builders.len() {
                builders.resize_with(group_index + 1, || C::new_builder(data_type, 0));
            }
            C::append(&mut builders[group_index], array, row);
        }))
    }

    fn append_column(&mut self, column: &dyn Array, group_index: usize) -> Result<()> {
        let array = downcast_checked::<C>(&self.data_type, column)?;
        self.ensure_groups(group_index + 1);
        let builder = &mut self.builders[group_index];
        for row in 0..column.len() {
            C::append(builder, array, row);
        }
        Ok(())
    }

    fn finish(&mut self) -> Vec<ArrayRef> {
        self.builders.iter_mut().map(ArrayBuilder::finish).collect()
    }

    fn finish_cloned(&self) -> Vec<ArrayRef> {
        self.builders
            .iter()
            .map(ArrayBuilder::finish_cloned)
            .collect()
    }
}

/// Creates an empty [`GroupedBuilder`] for columns of `data_type`.
///
/// # Errors
/// If `data_type` is not a supported column type.
pub fn make_grouped_builder(data_type: &DataType) -> Result<Box<dyn GroupedBuilder>> {
    macro_rules! grouped_builder_helper {
        ($t:ty, $dt:expr) => {
            Ok(Box::new(TypedGroupedBuilder::<$t>::new($dt)) as Box<dyn GroupedBuilder>)
        };
    }
    downcast_column_type!(data_type => (grouped_builder_helper, data_type), _ => Err(unsupported_type(data_type)))
}
