//! Pluggable per-group accumulation strategies.
//!
//! An [`Action`] owns one accumulator cell per dense group id. For every batch the caller
//! [`submit`](Action::submit)s a column, receiving a type specialised update function that
//! is then called once per row with that row's group id. Type checks happen in `submit`,
//! so a failure there leaves the accumulated state untouched.
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
mod count;
mod sum;
mod unique;

use crate::error::{KernelError, Result};
use arrow::{
    array::{Array, ArrayRef},
    datatypes::DataType,
};
use std::fmt::{Debug, Display, Formatter};

pub use count::{CountAction, make_count_action};
pub use sum::make_sum_action;
pub use unique::make_unique_action;

/// Per-row update returned by [`Action::submit`]: `update(row, group_id)`.
pub type UpdateFn<'a> = Box<dyn FnMut(usize, usize) + 'a>;

pub trait Action: Debug + Send {
    fn kind(&self) -> ActionKind;

    /// Column type this action was created for.
    fn input_type(&self) -> &DataType;

    /// Type of the column produced by [`Action::finish`].
    fn output_type(&self) -> DataType;

    /// Number of accumulator cells currently held.
    fn num_groups(&self) -> usize;

    /// Grows the state to hold `max_group_id + 1` groups and binds `column`.
    ///
    /// The returned function must only be called with rows of `column` and group ids no
    /// larger than `max_group_id`.
    ///
    /// # Errors
    /// If `column` is not of this action's input type.
    fn submit<'a>(&'a mut self, column: &'a dyn Array, max_group_id: usize)
    -> Result<UpdateFn<'a>>;

    /// Materialises one value per group, in group id order, and clears the state.
    ///
    /// # Errors
    /// If the output array can't be built.
    fn finish(&mut self) -> Result<ArrayRef>;
}

/// The recognised action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Unique,
    Count,
    Sum,
}

impl ActionKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unique => "action_unique",
            Self::Count => "action_count",
            Self::Sum => "action_sum",
        }
    }

    /// Parse a comma separated list of action names. Whitespace around names is ignored.
    ///
    /// # Errors
    /// If any name is not recognised.
    pub fn parse_config(config_string: &str) -> Result<Vec<Self>> {
        config_string
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Self::try_from)
            .collect()
    }

    /// Creates an empty action of this kind for columns of `input_type`.
    ///
    /// # Errors
    /// If this kind of action can't process `input_type`.
    pub fn make(self, input_type: &DataType) -> Result<Box<dyn Action>> {
        match self {
            Self::Count => make_count_action(input_type),
            Self::Sum => make_sum_action(input_type),
            Self::Unique => make_unique_action(input_type),
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<&str> for ActionKind {
    type Error = KernelError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        match name {
            "action_unique" => Ok(Self::Unique),
            "action_count" => Ok(Self::Count),
            "action_sum" => Ok(Self::Sum),
            _ => Err(KernelError::NotImplemented(format!("{name} is not implemented"))),
        }
    }
}
