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
use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::{io::Write, process::Command};
use tempfile::NamedTempFile;

fn sample_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "name,value\na,1\nb,2\na,3\nb,4\nc,5").unwrap();
    file
}

#[test]
fn should_aggregate_per_key() {
    let file = sample_csv();
    let mut cmd = Command::new(cargo_bin!("group_agg"));
    cmd.arg(file.path())
        .args(["--key", "name", "--actions", "action_count,action_sum"])
        .args(["--batch-size", "2"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("action_sum(value)"))
        .stdout(predicate::str::is_match(r"\| a +\| 2 +\| 4 +\|").unwrap())
        .stdout(predicate::str::is_match(r"\| b +\| 2 +\| 6 +\|").unwrap())
        .stdout(predicate::str::is_match(r"\| c +\| 1 +\| 5 +\|").unwrap());
}

#[test]
fn should_split_rows_per_key() {
    let file = sample_csv();
    let mut cmd = Command::new(cargo_bin!("group_agg"));
    cmd.arg(file.path()).args(["-k", "name", "--split", "-b", "3"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("name = a"))
        .stdout(predicate::str::contains("name = c"))
        .stdout(predicate::str::is_match(r"\| b +\| 4 +\|").unwrap());
}

#[test]
fn unknown_action() {
    let file = sample_csv();
    let mut cmd = Command::new(cargo_bin!("group_agg"));
    cmd.arg(file.path())
        .args(["--key", "name", "--actions", "action_count,action_bogus"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("action_bogus is not implemented"));
}

#[test]
fn action_count_mismatch() {
    let file = sample_csv();
    let mut cmd = Command::new(cargo_bin!("group_agg"));
    cmd.arg(file.path()).args(["--key", "name", "--actions", "action_count"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("1 actions given for 2 columns"));
}

#[test]
fn missing_key_column() {
    let file = sample_csv();
    let mut cmd = Command::new(cargo_bin!("group_agg"));
    cmd.arg(file.path())
        .args(["--key", "colour", "--actions", "action_count,action_sum"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("key column colour not found"));
}
