use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::sheet::aggregator::error::Result;
use crate::sheet::aggregator::model::{Table, Value};

/// Name of the worksheet holding the exported table.
pub const EXPORT_SHEET: &str = "combined";

const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Writes the table to a single-sheet workbook at `path`.
pub fn write_workbook(path: &Path, table: &Table) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET)?;
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    for (col_idx, header) in table.columns().iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, header)?;
    }

    for (row_idx, record) in table.records().iter().enumerate() {
        let row = (row_idx + 1) as u32;
        for (col_idx, column) in table.columns().iter().enumerate() {
            write_cell(
                worksheet,
                row,
                col_idx as u16,
                record.get(column),
                &datetime_format,
            )?;
        }
    }

    if !table.columns().is_empty() {
        let col_end = (table.columns().len() as u16).saturating_sub(1);
        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofilter(0, 0, table.len() as u32, col_end)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    datetime_format: &Format,
) -> Result<()> {
    match value {
        Value::Missing => {}
        Value::String(text) => {
            worksheet.write_string(row, col, text)?;
        }
        Value::Number(number) => {
            worksheet.write_number(row, col, *number)?;
        }
        Value::Boolean(flag) => {
            worksheet.write_boolean(row, col, *flag)?;
        }
        Value::DateTime(datetime) => {
            worksheet.write_datetime_with_format(row, col, datetime, datetime_format)?;
        }
    }
    Ok(())
}
