use std::path::Path;

use csv::ReaderBuilder;

use crate::sheet::aggregator::error::{Result, ToolError};
use crate::sheet::aggregator::io::sheet_read::SheetData;
use crate::sheet::aggregator::model::Value;

/// Field contents read as missing values, compared case-insensitively.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "#N/A", "NaN", "null"];

/// Reads a delimited text file as a single sheet named after the file stem.
pub fn read_sheet(path: &Path, file_name: &str, delimiter: u8) -> Result<SheetData> {
    let name = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
        .to_string();

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|error| ToolError::unreadable(file_name, error))?;

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record
            .map_err(|error| ToolError::unreadable(file_name, error))?
            .iter()
            .map(|field| {
                let field = field.trim();
                (!field.is_empty()).then(|| field.to_string())
            })
            .collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|error| ToolError::unreadable(file_name, error))?;
        rows.push(record.iter().map(field_to_value).collect());
    }

    Ok(SheetData {
        name,
        headers,
        rows,
    })
}

/// Infers a typed value from a text field: missing markers, finite
/// numbers, then booleans; anything else stays text.
pub fn field_to_value(field: &str) -> Value {
    let trimmed = field.trim();
    if MISSING_MARKERS
        .iter()
        .any(|marker| marker.eq_ignore_ascii_case(trimmed))
    {
        return Value::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() => return Value::Number(number),
        Ok(number) if number.is_nan() => return Value::Missing,
        _ => {}
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::String(field.to_string()),
    }
}
