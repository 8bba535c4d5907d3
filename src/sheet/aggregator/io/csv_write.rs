use std::io::Write;
use std::path::Path;

use csv::Writer;

use crate::sheet::aggregator::error::Result;
use crate::sheet::aggregator::model::{Table, Value};

/// Writes the table as delimited text to `path`.
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let writer = Writer::from_path(path)?;
    write_records(writer, table)
}

/// Writes the table as comma separated text to any writer, e.g. stdout.
pub fn write_csv_to<W: Write>(output: W, table: &Table) -> Result<()> {
    write_records(Writer::from_writer(output), table)
}

fn write_records<W: Write>(mut writer: Writer<W>, table: &Table) -> Result<()> {
    writer.write_record(table.columns())?;
    for record in table.records() {
        writer.write_record(table.columns().iter().map(|column| field(record.get(column))))?;
    }
    writer.flush()?;
    Ok(())
}

fn field(value: &Value) -> String {
    match value {
        Value::DateTime(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        other => other.to_string(),
    }
}
