//! The `group_kernels` crate implements grouped columnar computation over Arrow arrays.
//!
//! Given a batch of columns and a dictionary-encoded grouping column, rows can either be
//! partitioned into one batch per group ([`Splitter`]) or folded into per-group aggregate
//! state by pluggable [`Action`]s driven by a [`GroupedAggregator`]. Supporting kernels
//! dictionary-encode raw key columns ([`DictionaryEncoder`]), accumulate results across
//! many calls before a single finish ([`ArrayListAppender`], [`ArrayAppender`]) and reduce
//! whole arrays ([`ArrayReducer`]).
//!
//! Every kernel is a single-threaded, synchronous unit of work that owns all of its state.
//! Callers wanting parallelism run independent instances.
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
pub mod action;
mod aggregate;
mod append;
pub mod dispatch;
mod encode;
mod error;
mod group_index;
mod reduce;
mod split;
mod state;

pub use action::{Action, ActionKind, UpdateFn};
pub use aggregate::GroupedAggregator;
pub use append::{ArrayAppender, ArrayListAppender};
pub use dispatch::{GroupedBuilder, RowWriter, make_grouped_builder};
pub use encode::DictionaryEncoder;
pub use error::{KernelError, Result};
pub use group_index::{GroupIndex, dictionary_codes};
pub use reduce::ArrayReducer;
pub use split::{SplitOutput, Splitter, split_array_list};
