//! Error type shared by every kernel in this crate.
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
use arrow::error::ArrowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    /// Inputs violate a kernel's preconditions: missing or malformed dictionary column,
    /// mismatched column counts, row counts or column types.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// An action name or column type the kernels have no implementation for.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

pub type Result<T, E = KernelError> = std::result::Result<T, E>;
