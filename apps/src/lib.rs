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
use arrow::{
    array::{ArrayRef, UInt32Array},
    compute::take,
    csv::{Reader, ReaderBuilder, reader::Format},
};
use chrono::Local;
use color_eyre::eyre::Result;
use env_logger::Env;
use std::{
    fs::File,
    io::{Seek, Write},
    path::Path,
    sync::{Arc, Once},
};

/// Number of rows sampled when inferring the schema of a CSV file.
const SCHEMA_INFERENCE_ROWS: usize = 100;

static LOG_CFG: Once = Once::new();

/// A one time initialisation of the logging library. Safe to call from
/// multiple threads.
pub fn maybe_cfg_log() {
    LOG_CFG.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} [{}] {}:{} - {}",
                    Local::now().format("%Y-%m-%dT%H:%M:%S"),
                    record.level(),
                    record.file().unwrap_or("??"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
            .format_target(false)
            .init();
    });
}

/// Opens a CSV file with a header row and returns a reader producing batches of at
/// most `batch_size` rows. Column types are inferred from the first rows of the file.
///
/// # Errors
/// If the file can't be opened or its schema can't be inferred.
pub fn open_csv<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Reader<File>> {
    let mut file = File::open(path)?;
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(SCHEMA_INFERENCE_ROWS))?;
    file.rewind()?;
    Ok(ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .with_batch_size(batch_size)
        .build(file)?)
}

/// Looks up the dictionary value for each code, in the order given.
///
/// # Errors
/// If a code is out of range for `dictionary`.
pub fn key_values(dictionary: &ArrayRef, codes: &[u32]) -> Result<ArrayRef> {
    Ok(take(
        dictionary.as_ref(),
        &UInt32Array::from(codes.to_vec()),
        None,
    )?)
}

#[cfg(test)]
mod tests {
    use super::{key_values, open_csv};
    use arrow::{
        array::{ArrayRef, AsArray, StringArray},
        datatypes::{DataType, Int64Type},
    };
    use color_eyre::eyre::Result;
    use std::{io::Write, sync::Arc};
    use tempfile::NamedTempFile;

    #[test]
    fn should_read_csv_in_batches() -> Result<()> {
        // Given
        let mut file = NamedTempFile::new()?;
        write!(file, "name,value\na,1\nb,2\na,3")?;

        // When
        let reader = open_csv(file.path(), 2)?;
        let schema = reader.schema();
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        // Then
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(
            batches.iter().map(|b| b.num_rows()).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(batches[1].column(1).as_primitive::<Int64Type>().value(0), 3);
        Ok(())
    }

    #[test]
    fn should_look_up_keys_by_code() -> Result<()> {
        // Given
        let dictionary: ArrayRef = Arc::new(StringArray::from(vec!["x", "y", "z"]));

        // When
        let keys = key_values(&dictionary, &[2, 0])?;

        // Then
        assert_eq!(keys.as_string::<i32>(), &StringArray::from(vec!["z", "x"]));
        Ok(())
    }

    #[test]
    fn should_fail_on_missing_file() {
        assert!(open_csv("/nonexistent/input.csv", 10).is_err());
    }
}
