use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::sheet::aggregator::error::{Result, ToolError};
use crate::sheet::aggregator::io::sheet_read::SheetData;
use crate::sheet::aggregator::model::Value;

/// Largest spreadsheet serial date chrono can represent comfortably
/// (9999-12-31).
const MAX_SERIAL_DATE: f64 = 2_958_465.0;

/// Reads every sheet of a workbook in the workbook's own sheet order.
pub fn read_sheets(path: &Path, file_name: &str) -> Result<Vec<SheetData>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|error| ToolError::unreadable(file_name, error))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .ok_or_else(|| {
                ToolError::malformed(file_name, &sheet_name, "sheet listed but not found")
            })?
            .map_err(|error| ToolError::unreadable(file_name, error))?;
        sheets.push(range_to_sheet(file_name, sheet_name, &range)?);
    }

    Ok(sheets)
}

fn range_to_sheet(file_name: &str, name: String, range: &Range<DataType>) -> Result<SheetData> {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| header_cell(file_name, &name, cell))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let rows = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    Ok(SheetData {
        name,
        headers,
        rows,
    })
}

fn header_cell(file_name: &str, sheet: &str, cell: &DataType) -> Result<Option<String>> {
    Ok(match cell {
        DataType::Empty => None,
        DataType::String(value) if value.trim().is_empty() => None,
        DataType::String(value) => Some(value.clone()),
        DataType::Float(value) => Some(value.to_string()),
        DataType::Int(value) => Some(value.to_string()),
        DataType::Bool(value) => Some(value.to_string()),
        DataType::Error(error) => {
            return Err(ToolError::malformed(
                file_name,
                sheet,
                format!("header cell holds error value {error:?}"),
            ));
        }
        other => Some(other.to_string()),
    })
}

/// Converts a calamine cell into a table value. Blank and error cells are
/// missing.
pub fn cell_to_value(cell: &DataType) -> Value {
    match cell {
        DataType::Empty | DataType::Error(_) => Value::Missing,
        DataType::String(value) => Value::String(value.clone()),
        DataType::Float(value) => Value::Number(*value),
        DataType::Int(value) => Value::Number(*value as f64),
        DataType::Bool(value) => Value::Boolean(*value),
        DataType::DateTime(serial) => serial_to_datetime(*serial)
            .map(Value::DateTime)
            .unwrap_or(Value::Number(*serial)),
        other => Value::String(other.to_string()),
    }
}

/// Converts a spreadsheet serial date (days since 1899-12-30, fractional
/// part is the time of day) into a date-time.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL_DATE).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}
