use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sheet_aggregator::aggregate::{self, Aggregation};
use sheet_aggregator::config::{AggregateConfig, FailurePolicy};
use sheet_aggregator::io::{csv_write, excel_write};
use sheet_aggregator::model::{FILE_NAME_COLUMN, SHEET_NAME_COLUMN, Table};
use sheet_aggregator::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = init_tracing() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }

    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("{}", error_report(&error));
        std::process::exit(1);
    }
}

fn error_report(error: &ToolError) -> String {
    match error.file() {
        Some(file) => format!("error: {error} ({} stage, file {file})", error.stage()),
        None => format!("error: {error} ({} stage)", error.stage()),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Aggregate(args) => execute_aggregate(args),
        Command::List(args) => execute_list(args),
    }
}

fn execute_aggregate(args: AggregateArgs) -> Result<()> {
    let config = args.selection.resolve_config()?;
    let Aggregation { table, skipped, .. } = aggregate::aggregate(&config)?;

    for skipped_file in &skipped {
        eprintln!("skipped {}: {}", skipped_file.file_name, skipped_file.error);
    }

    if args.summary {
        print_summary(&table);
        return Ok(());
    }

    match &args.output {
        Some(path) => write_output(path, &table),
        None => csv_write::write_csv_to(io::stdout().lock(), &table),
    }
}

fn execute_list(args: SelectionArgs) -> Result<()> {
    let config = args.resolve_config()?;
    for file_name in aggregate::resolve_files(&config)? {
        println!("{file_name}");
    }
    Ok(())
}

fn write_output(path: &Path, table: &Table) -> Result<()> {
    let is_workbook = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("xlsx"));
    if is_workbook {
        excel_write::write_workbook(path, table)
    } else {
        csv_write::write_csv(path, table)
    }
}

fn print_summary(table: &Table) {
    println!("records: {}", table.len());
    println!("columns: {}", table.columns().join(", "));
    for column in [FILE_NAME_COLUMN, SHEET_NAME_COLUMN] {
        println!("{column}:");
        for (value, count) in table.value_counts(column) {
            println!("  {value}: {count}");
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Combine every sheet of matching spreadsheets into one table."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read and combine the selected files.
    Aggregate(AggregateArgs),
    /// Print the files that would be aggregated.
    List(SelectionArgs),
}

#[derive(clap::Args)]
struct SelectionArgs {
    /// JSON configuration file; flags given on the command line override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory scanned for input files.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Regular expression matched against file names.
    #[arg(long)]
    pattern: Option<String>,

    /// Only include files whose embedded date falls in this month (YYYY-MM).
    #[arg(long)]
    month: Option<String>,

    /// Skip files that cannot be read instead of aborting.
    #[arg(long)]
    skip_unreadable: bool,

    /// Field delimiter for .csv and .txt inputs.
    #[arg(long)]
    delimiter: Option<char>,

    /// Pipeline step, applied in the order given: `normalize`,
    /// `filter:<column> <op> <value>`, `drop:<column>`,
    /// `derive:<column>=<expression>`.
    #[arg(long = "step")]
    steps: Vec<String>,
}

impl SelectionArgs {
    fn resolve_config(&self) -> Result<AggregateConfig> {
        let mut config = match &self.config {
            Some(path) => AggregateConfig::from_json_file(path)?,
            None => {
                let directory = self.dir.clone().ok_or_else(|| missing_flag("--dir"))?;
                let pattern = self.pattern.clone().ok_or_else(|| missing_flag("--pattern"))?;
                AggregateConfig::new(directory, pattern)
            }
        };

        if let Some(directory) = &self.dir {
            config.directory = directory.clone();
        }
        if let Some(pattern) = &self.pattern {
            config.pattern = pattern.clone();
        }
        if let Some(month) = &self.month {
            config.year_month = Some(month.clone());
        }
        if self.skip_unreadable {
            config.on_error = FailurePolicy::SkipUnreadable;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        config.steps.extend(self.steps.iter().cloned());
        Ok(config)
    }
}

fn missing_flag(flag: &str) -> ToolError {
    ToolError::MissingSetting(format!("{flag} (required unless --config is given)"))
}

#[derive(clap::Args)]
struct AggregateArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Write the combined table to this file (.xlsx or delimited text)
    /// instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print record counts per file and sheet instead of the table.
    #[arg(long)]
    summary: bool,
}
