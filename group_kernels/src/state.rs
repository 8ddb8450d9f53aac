/// Per-group "has seen a value" tracking, used to null out groups that never received input.
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
use arrow::{array::BooleanBufferBuilder, buffer::NullBuffer};

#[derive(Debug)]
pub struct SeenState {
    /// If `seen_values[i]` is true, group `i` has seen at least one non null value.
    seen_values: BooleanBufferBuilder,
}

impl Default for SeenState {
    fn default() -> Self {
        Self::new()
    }
}

impl SeenState {
    pub fn new() -> Self {
        Self {
            seen_values: BooleanBufferBuilder::new(0),
        }
    }

    /// Grows the state to cover `total_num_groups`, new groups start unseen.
    pub fn resize(&mut self, total_num_groups: usize) {
        if self.seen_values.len() < total_num_groups {
            let new_groups = total_num_groups - self.seen_values.len();
            self.seen_values.append_n(new_groups, false);
        }
    }

    /// Marks `group_index` as having seen a value.
    ///
    /// # Panics
    /// If `group_index` is beyond the last [`SeenState::resize`].
    pub fn set(&mut self, group_index: usize) {
        self.seen_values.set_bit(group_index, true);
    }

    pub fn len(&self) -> usize {
        self.seen_values.len()
    }

    /// Creates a [`NullBuffer`] where every group that never saw a value is null.
    ///
    /// Resets the internal state.
    pub fn build(&mut self) -> NullBuffer {
        NullBuffer::new(self.seen_values.finish())
    }
}
