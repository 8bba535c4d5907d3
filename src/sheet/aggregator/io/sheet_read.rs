use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, instrument};

use crate::sheet::aggregator::error::{Result, ToolError};
use crate::sheet::aggregator::io::{csv_read, excel_read};
use crate::sheet::aggregator::model::{
    FILE_NAME_COLUMN, Record, SHEET_NAME_COLUMN, Table, Value,
};

/// Raw content of one sheet: its name, the header cells of its first row,
/// and the remaining rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetData {
    pub name: String,
    /// Header cells; `None` marks a blank header cell.
    pub headers: Vec<Option<String>>,
    pub rows: Vec<Vec<Value>>,
}

/// How a file is parsed, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Spreadsheet workbook read through calamine.
    Workbook,
    /// Delimited text file, read as a single sheet.
    Delimited(u8),
}

impl FileKind {
    /// Detects the file kind from the name's extension. `.tsv` files are
    /// always tab separated; `.csv` and `.txt` use `delimiter`.
    pub fn detect(file_name: &str, delimiter: u8) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(FileKind::Workbook),
            "tsv" => Some(FileKind::Delimited(b'\t')),
            "csv" | "txt" => Some(FileKind::Delimited(delimiter)),
            _ => None,
        }
    }
}

/// Reads every sheet of `directory/file_name` into one table whose leading
/// columns are `file_name` and `sheet_name`, followed by the sheets' own
/// columns in original order.
#[instrument(level = "debug", skip(directory, delimiter), fields(file = %file_name))]
pub fn read_file(directory: &Path, file_name: &str, delimiter: u8) -> Result<Table> {
    let path = directory.join(file_name);
    let kind = FileKind::detect(file_name, delimiter)
        .ok_or_else(|| ToolError::unreadable(file_name, "unsupported file extension"))?;

    let sheets = match kind {
        FileKind::Workbook => excel_read::read_sheets(&path, file_name)?,
        FileKind::Delimited(delimiter) => {
            vec![csv_read::read_sheet(&path, file_name, delimiter)?]
        }
    };

    build_file_table(file_name, sheets)
}

/// Tags each sheet's rows with the file and sheet name and concatenates the
/// sheets in order.
pub fn build_file_table(file_name: &str, sheets: Vec<SheetData>) -> Result<Table> {
    let mut tables = Vec::with_capacity(sheets.len() + 1);
    tables.push(Table::new(vec![
        FILE_NAME_COLUMN.to_string(),
        SHEET_NAME_COLUMN.to_string(),
    ]));

    for sheet in sheets {
        let name = sheet.name.clone();
        let table = sheet_table(file_name, sheet)?;
        debug!(sheet = %name, rows = table.len(), "read sheet");
        tables.push(table);
    }

    Ok(Table::concat(tables))
}

fn sheet_table(file_name: &str, sheet: SheetData) -> Result<Table> {
    if sheet.headers.is_empty() {
        if sheet.rows.iter().any(|row| !row.is_empty()) {
            return Err(ToolError::malformed(file_name, &sheet.name, "missing header row"));
        }
        return Ok(Table::default());
    }
    if sheet.headers.iter().all(Option::is_none) {
        return Err(ToolError::malformed(file_name, &sheet.name, "header row is blank"));
    }

    let headers = unique_headers(&sheet.headers);
    let mut columns = vec![FILE_NAME_COLUMN.to_string(), SHEET_NAME_COLUMN.to_string()];
    columns.extend(headers.iter().cloned());

    let records = sheet
        .rows
        .into_iter()
        .filter(|row| !row.iter().all(Value::is_missing))
        .map(|row| {
            let mut record = Record::new();
            record.insert(FILE_NAME_COLUMN, Value::from(file_name));
            record.insert(SHEET_NAME_COLUMN, Value::from(sheet.name.as_str()));
            for (header, value) in headers.iter().zip(row) {
                record.insert(header.clone(), value);
            }
            record
        })
        .collect();

    Ok(Table::from_records(columns, records))
}

/// Names blank header cells `Unnamed: <index>` and suffixes repeated names
/// with `.1`, `.2`, … The tag columns count as already taken.
pub fn unique_headers(raw: &[Option<String>]) -> Vec<String> {
    let mut taken: HashSet<String> = [FILE_NAME_COLUMN, SHEET_NAME_COLUMN]
        .iter()
        .map(|column| column.to_string())
        .collect();

    raw.iter()
        .enumerate()
        .map(|(index, cell)| {
            let base = match cell {
                Some(name) => name.clone(),
                None => format!("Unnamed: {index}"),
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while taken.contains(&name) {
                name = format!("{base}.{suffix}");
                suffix += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}
