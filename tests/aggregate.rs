use std::fs;
use std::path::Path;

use rust_xlsxwriter::Workbook;
use sheet_aggregator::aggregate::{aggregate, resolve_files};
use sheet_aggregator::config::{AggregateConfig, FailurePolicy};
use sheet_aggregator::io::{csv_write, excel_read, excel_write};
use sheet_aggregator::model::{FILE_NAME_COLUMN, SHEET_NAME_COLUMN, Value};
use sheet_aggregator::{Stage, ToolError};
use tempfile::tempdir;

/// A sheet fixture: name, header row, and data rows where `None` leaves the
/// cell blank.
struct SheetFixture<'a> {
    name: &'a str,
    headers: &'a [&'a str],
    rows: Vec<Vec<Option<f64>>>,
}

fn numbered_rows(count: usize, width: usize, offset: f64) -> Vec<Vec<Option<f64>>> {
    (0..count)
        .map(|row| {
            (0..width)
                .map(|col| Some(offset + (row * width + col) as f64))
                .collect()
        })
        .collect()
}

fn write_fixture(path: &Path, sheets: &[SheetFixture<'_>]) {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name).expect("sheet named");
        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *header)
                .expect("header written");
        }
        for (row, cells) in sheet.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if let Some(value) = cell {
                    worksheet
                        .write_number((row + 1) as u32, col as u16, *value)
                        .expect("cell written");
                }
            }
        }
    }
    workbook.save(path).expect("workbook saved");
}

fn three_column_sheet(name: &str, offset: f64) -> SheetFixture<'_> {
    SheetFixture {
        name,
        headers: &["col1", "col2", "col3"],
        rows: numbered_rows(3, 3, offset),
    }
}

fn strings(values: impl Iterator<Item = impl ToString>) -> Vec<String> {
    values.map(|value| value.to_string()).collect()
}

#[test]
fn combines_all_sheets_of_matching_files() {
    let dir = tempdir().expect("temporary directory");
    write_fixture(
        &dir.path().join("test1.xlsx"),
        &[three_column_sheet("Sheet1", 0.0), three_column_sheet("Sheet2", 100.0)],
    );
    write_fixture(
        &dir.path().join("test2.xlsx"),
        &[three_column_sheet("Sheet1", 200.0)],
    );
    write_fixture(
        &dir.path().join("other.xlsx"),
        &[three_column_sheet("Sheet1", 300.0)],
    );

    let config = AggregateConfig::new(dir.path(), r"^test[0-9]\.xlsx");
    let aggregation = aggregate(&config).expect("aggregation succeeded");
    let table = aggregation.table;

    assert_eq!(aggregation.files, vec!["test1.xlsx", "test2.xlsx"]);
    assert!(aggregation.skipped.is_empty());
    assert_eq!(table.len(), 9);
    assert_eq!(
        table.columns(),
        ["file_name", "sheet_name", "col1", "col2", "col3"]
    );

    let file_names = strings(table.column_values(FILE_NAME_COLUMN));
    assert_eq!(&file_names[..6], vec!["test1.xlsx"; 6].as_slice());
    assert_eq!(&file_names[6..], vec!["test2.xlsx"; 3].as_slice());

    let sheet_names = strings(table.column_values(SHEET_NAME_COLUMN));
    assert_eq!(
        sheet_names,
        vec![
            "Sheet1", "Sheet1", "Sheet1", "Sheet2", "Sheet2", "Sheet2", "Sheet1", "Sheet1",
            "Sheet1"
        ]
    );

    assert_eq!(table.records()[0].get("col1"), &Value::Number(0.0));
    assert_eq!(table.records()[3].get("col1"), &Value::Number(100.0));
    assert_eq!(table.records()[8].get("col3"), &Value::Number(208.0));
}

#[test]
fn heterogeneous_sheets_union_columns() {
    let dir = tempdir().expect("temporary directory");
    write_fixture(
        &dir.path().join("a.xlsx"),
        &[
            SheetFixture {
                name: "narrow",
                headers: &["A", "B"],
                rows: numbered_rows(2, 2, 0.0),
            },
            SheetFixture {
                name: "wide",
                headers: &["A", "B", "C"],
                rows: numbered_rows(1, 3, 10.0),
            },
        ],
    );

    let table = aggregate(&AggregateConfig::new(dir.path(), r"\.xlsx$"))
        .expect("aggregation succeeded")
        .table;

    assert_eq!(table.columns(), ["file_name", "sheet_name", "A", "B", "C"]);
    for record in &table.records()[..2] {
        assert_eq!(record.get(SHEET_NAME_COLUMN), &Value::from("narrow"));
        assert_eq!(record.get("C"), &Value::Missing);
    }
    assert_eq!(table.records()[2].get("C"), &Value::Number(12.0));
    assert!(
        table
            .records()
            .iter()
            .all(|record| table.columns().iter().all(|column| record.contains(column)))
    );
}

#[test]
fn unreadable_file_aborts_by_default() {
    let dir = tempdir().expect("temporary directory");
    write_fixture(&dir.path().join("test1.xlsx"), &[three_column_sheet("Sheet1", 0.0)]);
    fs::write(dir.path().join("test2.xlsx"), b"not a workbook").expect("file written");

    let error = aggregate(&AggregateConfig::new(dir.path(), r"^test[0-9]\.xlsx"))
        .expect_err("corrupt file aborts the run");

    assert!(matches!(error, ToolError::UnreadableFile { .. }));
    assert_eq!(error.stage(), Stage::Reading);
    assert_eq!(error.file(), Some("test2.xlsx"));
}

#[test]
fn unreadable_file_can_be_skipped() {
    let dir = tempdir().expect("temporary directory");
    fs::write(dir.path().join("test1.xlsx"), b"not a workbook").expect("file written");
    write_fixture(&dir.path().join("test2.xlsx"), &[three_column_sheet("Sheet1", 0.0)]);

    let config = AggregateConfig::new(dir.path(), r"^test[0-9]\.xlsx")
        .with_failure_policy(FailurePolicy::SkipUnreadable);
    let aggregation = aggregate(&config).expect("aggregation succeeded");

    assert_eq!(aggregation.files, vec!["test2.xlsx"]);
    assert_eq!(aggregation.skipped.len(), 1);
    assert_eq!(aggregation.skipped[0].file_name, "test1.xlsx");
    assert_eq!(aggregation.table.len(), 3);
}

#[test]
fn missing_directory_fails_selection() {
    let dir = tempdir().expect("temporary directory");
    let config = AggregateConfig::new(dir.path().join("absent"), ".*")
        .with_failure_policy(FailurePolicy::SkipUnreadable);

    let error = aggregate(&config).expect_err("directory is missing");

    assert!(matches!(error, ToolError::DirectoryNotFound { .. }));
    assert_eq!(error.stage(), Stage::Selection);
}

#[test]
fn no_matching_files_yields_empty_table() {
    let dir = tempdir().expect("temporary directory");
    write_fixture(&dir.path().join("test1.xlsx"), &[three_column_sheet("Sheet1", 0.0)]);

    let aggregation = aggregate(&AggregateConfig::new(dir.path(), r"\.ods$"))
        .expect("aggregation succeeded");

    assert!(aggregation.files.is_empty());
    assert!(aggregation.table.is_empty());
}

#[test]
fn month_subset_limits_input_files() {
    let dir = tempdir().expect("temporary directory");
    for (index, name) in [
        "sample_2019-01-09.xlsx",
        "sample_2019-01-15.xlsx",
        "sample_2019-02-02.xlsx",
    ]
    .iter()
    .enumerate()
    {
        write_fixture(
            &dir.path().join(name),
            &[three_column_sheet("Sheet1", index as f64 * 10.0)],
        );
    }

    let config = AggregateConfig::new(dir.path(), r"^sample_.*\.xlsx$").with_year_month("2019-01");

    assert_eq!(
        resolve_files(&config).expect("files resolved"),
        vec!["sample_2019-01-09.xlsx", "sample_2019-01-15.xlsx"]
    );
    let table = aggregate(&config).expect("aggregation succeeded").table;
    assert_eq!(table.value_counts(FILE_NAME_COLUMN).len(), 2);
    assert_eq!(table.len(), 6);
}

#[test]
fn month_subset_requires_dates_in_names() {
    let dir = tempdir().expect("temporary directory");
    write_fixture(&dir.path().join("sample.xlsx"), &[three_column_sheet("Sheet1", 0.0)]);

    let config = AggregateConfig::new(dir.path(), r"\.xlsx$").with_year_month("2019-01");
    let error = aggregate(&config).expect_err("undated file name");

    assert_eq!(error.stage(), Stage::DateExtraction);
    assert_eq!(error.file(), Some("sample.xlsx"));
}

#[test]
fn configured_steps_run_after_aggregation() {
    let dir = tempdir().expect("temporary directory");
    write_fixture(
        &dir.path().join("data.xlsx"),
        &[SheetFixture {
            name: "Sheet1",
            headers: &["Col 1", "Col 2", "Col 3"],
            rows: vec![
                vec![Some(1.0), Some(2.0), Some(0.0)],
                vec![None, Some(5.0), Some(0.0)],
                vec![Some(7.0), Some(1.0), Some(0.0)],
            ],
        }],
    );

    let config = AggregateConfig::new(dir.path(), r"\.xlsx$")
        .with_step("normalize")
        .with_step("drop:col_3")
        .with_step("derive:col_1_plus_col_2 = col_1 + col_2")
        .with_step("filter:col_2 > 1");
    let table = aggregate(&config).expect("aggregation succeeded").table;

    assert_eq!(
        table.columns(),
        ["file_name", "sheet_name", "col_1", "col_2", "col_1_plus_col_2"]
    );
    assert_eq!(table.len(), 2);
    assert_eq!(table.records()[0].get("col_1_plus_col_2"), &Value::Number(3.0));
    assert_eq!(table.records()[1].get("col_1"), &Value::Missing);
    assert_eq!(table.records()[1].get("col_1_plus_col_2"), &Value::Missing);
}

#[test]
fn invalid_step_fails_before_reading() {
    let dir = tempdir().expect("temporary directory");
    let config = AggregateConfig::new(dir.path().join("absent"), ".*").with_step("explode");

    let error = aggregate(&config).expect_err("step is invalid");

    assert!(matches!(error, ToolError::InvalidStep { .. }));
    assert_eq!(error.stage(), Stage::Configuration);
}

#[test]
fn delimited_files_join_workbooks() {
    let dir = tempdir().expect("temporary directory");
    write_fixture(&dir.path().join("a.xlsx"), &[three_column_sheet("Sheet1", 0.0)]);
    fs::write(dir.path().join("b.csv"), "col1;col4\n1;x\n2;y\n").expect("file written");

    let config = AggregateConfig::new(dir.path(), r"^[ab]\.").with_delimiter(';');
    let table = aggregate(&config).expect("aggregation succeeded").table;

    assert_eq!(
        table.columns(),
        ["file_name", "sheet_name", "col1", "col2", "col3", "col4"]
    );
    assert_eq!(table.len(), 5);
    assert_eq!(table.records()[3].get(SHEET_NAME_COLUMN), &Value::from("b"));
    assert_eq!(table.records()[3].get("col4"), &Value::from("x"));
    assert_eq!(table.records()[3].get("col2"), &Value::Missing);
}

#[test]
fn exported_table_can_be_read_back() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input");
    fs::create_dir(&input).expect("directory created");
    write_fixture(&input.join("test1.xlsx"), &[three_column_sheet("Sheet1", 0.0)]);
    let table = aggregate(&AggregateConfig::new(&input, r"\.xlsx$"))
        .expect("aggregation succeeded")
        .table;

    let xlsx_path = dir.path().join("combined.xlsx");
    excel_write::write_workbook(&xlsx_path, &table).expect("workbook written");
    let sheets = excel_read::read_sheets(&xlsx_path, "combined.xlsx").expect("workbook read");
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].name, excel_write::EXPORT_SHEET);
    assert_eq!(
        sheets[0].headers,
        table
            .columns()
            .iter()
            .map(|column| Some(column.clone()))
            .collect::<Vec<_>>()
    );
    assert_eq!(sheets[0].rows.len(), 3);
    assert_eq!(sheets[0].rows[0][0], Value::from("test1.xlsx"));

    let csv_path = dir.path().join("combined.csv");
    csv_write::write_csv(&csv_path, &table).expect("CSV written");
    let text = fs::read_to_string(&csv_path).expect("CSV read");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("file_name,sheet_name,col1,col2,col3"));
    assert_eq!(lines.next(), Some("test1.xlsx,Sheet1,0,1,2"));
    assert_eq!(lines.count(), 2);
}
