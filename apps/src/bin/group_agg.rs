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
use apps::{key_values, maybe_cfg_log, open_csv};
use arrow::{
    array::{ArrayRef, RecordBatch},
    csv::Reader,
    datatypes::{Field, Schema, SchemaRef},
    util::{display::array_value_to_string, pretty::pretty_format_batches},
};
use clap::Parser;
use color_eyre::eyre::{Result, bail};
use group_kernels::{ArrayListAppender, DictionaryEncoder, GroupedAggregator, Splitter};
use human_panic::setup_panic;
use log::info;
use num_format::{Locale, ToFormattedString};
use std::{fs::File, sync::Arc};

/// Groups the rows of a CSV file by a key column.
///
/// In aggregate mode each column is reduced per group by the action in the same position
/// of the action list. In split mode the rows of each group are gathered and printed as a
/// table of their own.
#[derive(Parser, Debug)]
#[command(author, version)]
struct CmdLineArgs {
    /// CSV file with a header row
    input: String,
    /// Name of the column to group by
    #[arg(short = 'k', long, required = true)]
    key: String,
    /// One action per CSV column, e.g. action_count,action_sum
    #[arg(short = 'a', long, value_delimiter = ',', num_args = 1..)]
    actions: Vec<String>,
    /// Print the rows of each group instead of aggregating
    #[arg(long, conflicts_with = "actions")]
    split: bool,
    /// Maximum number of rows read per batch
    #[arg(short = 'b', long, default_value = "8192")]
    batch_size: usize,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    setup_panic!();
    maybe_cfg_log();

    let args = CmdLineArgs::parse();
    if args.batch_size == 0 {
        bail!("batch size must be greater than zero");
    }
    if !args.split && args.actions.is_empty() {
        bail!("either --actions or --split must be given");
    }

    let reader = open_csv(&args.input, args.batch_size)?;
    let schema = reader.schema();
    let Ok(key_index) = schema.index_of(&args.key) else {
        bail!("key column {} not found in {}", args.key, args.input);
    };

    if args.split {
        split(reader, &schema, key_index)
    } else {
        if args.actions.len() != schema.fields().len() {
            bail!(
                "{} actions given for {} columns",
                args.actions.len(),
                schema.fields().len()
            );
        }
        aggregate(reader, &schema, key_index, &args.actions)
    }
}

fn aggregate(
    reader: Reader<File>,
    schema: &SchemaRef,
    key_index: usize,
    actions: &[String],
) -> Result<()> {
    let mut encoder = DictionaryEncoder::new();
    let mut aggregator = GroupedAggregator::new(actions);
    let mut dictionary: Option<ArrayRef> = None;

    for batch in reader {
        let batch = batch?;
        let encoded = encoder.encode(batch.column(key_index).as_ref())?;
        aggregator.evaluate(batch.columns(), &encoded)?;
        dictionary = Some(encoded.values().clone());
    }

    let group_codes = aggregator.group_codes().to_vec();
    let results = aggregator.finish()?;
    let Some(dictionary) = dictionary else {
        info!("No rows read");
        return Ok(());
    };

    let mut fields = vec![schema.field(key_index).clone()];
    let mut columns = vec![key_values(&dictionary, &group_codes)?];
    for ((action, field), result) in actions.iter().zip(schema.fields()).zip(results) {
        fields.push(Field::new(
            format!("{action}({})", field.name()),
            result.data_type().clone(),
            true,
        ));
        columns.push(result);
    }
    let output = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    println!("{}", pretty_format_batches(&[output])?);
    info!(
        "Aggregated {} groups",
        group_codes.len().to_formatted_string(&Locale::en)
    );
    Ok(())
}

fn split(reader: Reader<File>, schema: &SchemaRef, key_index: usize) -> Result<()> {
    let mut encoder = DictionaryEncoder::new();
    let mut splitter = Splitter::new();
    let mut groups = Vec::<ArrayListAppender>::new();
    let mut group_codes = Vec::new();
    let mut dictionary: Option<ArrayRef> = None;
    let mut rows = 0;

    for batch in reader {
        let batch = batch?;
        let encoded = encoder.encode(batch.column(key_index).as_ref())?;
        let output = splitter.split(batch.columns(), &encoded)?;
        groups.resize_with(output.groups.len(), ArrayListAppender::new);
        for (appender, columns) in groups.iter_mut().zip(&output.groups) {
            appender.evaluate(columns)?;
        }
        group_codes = output.group_codes;
        dictionary = Some(encoded.values().clone());
        rows += batch.num_rows();
    }

    let Some(dictionary) = dictionary else {
        info!("No rows read");
        return Ok(());
    };
    let keys = key_values(&dictionary, &group_codes)?;
    let key_column = schema.field(key_index).name();
    for (group, appender) in groups.iter().enumerate() {
        let batch = RecordBatch::try_new(schema.clone(), appender.finish()?)?;
        println!("{key_column} = {}", array_value_to_string(keys.as_ref(), group)?);
        println!("{}", pretty_format_batches(&[batch])?);
    }
    info!(
        "Split {} rows into {} groups",
        rows.to_formatted_string(&Locale::en),
        groups.len().to_formatted_string(&Locale::en)
    );
    Ok(())
}
