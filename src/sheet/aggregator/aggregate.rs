use std::path::Path;

use tracing::{info, instrument, warn};

use crate::sheet::aggregator::config::{AggregateConfig, FailurePolicy};
use crate::sheet::aggregator::dates::{YearMonth, select_year_month};
use crate::sheet::aggregator::error::{Result, ToolError};
use crate::sheet::aggregator::io::sheet_read::read_file;
use crate::sheet::aggregator::model::Table;
use crate::sheet::aggregator::select::{compile_pattern, select_files};
use crate::sheet::aggregator::transform::Pipeline;

/// A file left out of the combined table under
/// [`FailurePolicy::SkipUnreadable`].
#[derive(Debug)]
pub struct SkippedFile {
    pub file_name: String,
    pub error: ToolError,
}

/// Outcome of an aggregation run.
#[derive(Debug)]
pub struct Aggregation {
    /// The combined table, after any configured pipeline steps.
    pub table: Table,
    /// Files that contributed to the table, in order.
    pub files: Vec<String>,
    /// Files skipped because they could not be read.
    pub skipped: Vec<SkippedFile>,
}

/// Resolves the configured file list: pattern selection followed by the
/// optional month restriction.
pub fn resolve_files(config: &AggregateConfig) -> Result<Vec<String>> {
    let pattern = compile_pattern(&config.pattern)?;
    let files = select_files(&config.directory, &pattern)?;
    match &config.year_month {
        Some(target) => select_year_month(&files, target.parse::<YearMonth>()?),
        None => Ok(files),
    }
}

/// Selects, reads, and combines the files described by `config`, then
/// applies its pipeline steps.
#[instrument(
    level = "info",
    skip_all,
    fields(directory = %config.directory.display(), pattern = %config.pattern)
)]
pub fn aggregate(config: &AggregateConfig) -> Result<Aggregation> {
    let pipeline = Pipeline::from_steps(&config.steps)?;
    let delimiter = delimiter_byte(config.delimiter)?;
    let files = resolve_files(config)?;
    info!(file_count = files.len(), "selected input files");

    let mut aggregation = aggregate_files(&config.directory, &files, delimiter, config.on_error)?;
    aggregation.table = pipeline.apply(aggregation.table);
    Ok(aggregation)
}

/// Reads `files` from `directory` in order and concatenates their tables.
pub fn aggregate_files(
    directory: &Path,
    files: &[String],
    delimiter: u8,
    policy: FailurePolicy,
) -> Result<Aggregation> {
    let mut tables = Vec::with_capacity(files.len());
    let mut read = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for file_name in files {
        match read_file(directory, file_name, delimiter) {
            Ok(table) => {
                tables.push(table);
                read.push(file_name.clone());
            }
            Err(error) if policy == FailurePolicy::SkipUnreadable && error.is_per_file() => {
                warn!(file = %file_name, %error, "skipping unreadable file");
                skipped.push(SkippedFile {
                    file_name: file_name.clone(),
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    let table = Table::concat(tables);
    info!(
        records = table.len(),
        columns = table.columns().len(),
        skipped = skipped.len(),
        "aggregated files"
    );
    Ok(Aggregation {
        table,
        files: read,
        skipped,
    })
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(ToolError::InvalidDelimiter(delimiter))
    }
}
