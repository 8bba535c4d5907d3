use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDateTime;

/// Column holding the name of the file a record was read from.
pub const FILE_NAME_COLUMN: &str = "file_name";
/// Column holding the name of the sheet a record was read from.
pub const SHEET_NAME_COLUMN: &str = "sheet_name";

static MISSING: Value = Value::Missing;

/// A single cell value in a combined table.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Marker for a column that has no value in a record. Distinct from an
    /// empty string or zero.
    #[default]
    Missing,
    /// Text cell.
    String(String),
    /// Numeric cell. Integer cells are widened to `f64`.
    Number(f64),
    /// Boolean cell.
    Boolean(bool),
    /// Date or date-time cell.
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value; only `Number` cells qualify.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::String(value) => f.write_str(value),
            Value::Number(value) => write!(f, "{value}"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

/// One row of a table: column name → value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored for `column`, or [`Value::Missing`] when the
    /// record has no such column.
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&MISSING)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(column.into(), value)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Renames columns according to `mapping`; unmapped columns keep their names.
    pub(crate) fn rename(self, mapping: &HashMap<String, String>) -> Self {
        let values = self
            .values
            .into_iter()
            .map(|(column, value)| match mapping.get(&column) {
                Some(renamed) => (renamed.clone(), value),
                None => (column, value),
            })
            .collect();
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(column, value)| (column.into(), value))
                .collect(),
        }
    }
}

/// An ordered set of records sharing a declared column list.
///
/// Every record holds a value for every declared column; columns a record
/// did not provide are filled with [`Value::Missing`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Creates an empty table with the given column order.
    pub fn new(columns: Vec<String>) -> Self {
        let mut table = Self::default();
        for column in columns {
            table.add_column(column);
        }
        table
    }

    /// Builds a table from records, extending `columns` with any column a
    /// record carries that is not yet declared.
    pub fn from_records(columns: Vec<String>, records: Vec<Record>) -> Self {
        let mut table = Self::new(columns);
        for record in records {
            table.push(record);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|existing| existing == column)
    }

    /// Declares a column, backfilling existing records with missing values.
    /// Declaring an existing column is a no-op.
    pub fn add_column(&mut self, column: impl Into<String>) {
        let column = column.into();
        if self.has_column(&column) {
            return;
        }
        for record in &mut self.records {
            if !record.contains(&column) {
                record.insert(column.clone(), Value::Missing);
            }
        }
        self.columns.push(column);
    }

    /// Appends a record, keeping the column invariant in both directions.
    pub fn push(&mut self, mut record: Record) {
        let undeclared: Vec<String> = record
            .iter()
            .map(|(column, _)| column)
            .filter(|column| !self.has_column(column))
            .cloned()
            .collect();
        for column in undeclared {
            self.add_column(column);
        }
        for column in &self.columns {
            if !record.contains(column) {
                record.insert(column.clone(), Value::Missing);
            }
        }
        self.records.push(record);
    }

    /// Values of one column in record order.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.records.iter().map(move |record| record.get(column))
    }

    /// Concatenates tables in order. The resulting columns are the union of
    /// all input columns in first-seen order.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let tables: Vec<Table> = tables.into_iter().collect();

        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if seen.insert(column.clone()) {
                    columns.push(column.clone());
                }
            }
        }

        let mut records = Vec::with_capacity(tables.iter().map(Table::len).sum());
        for table in tables {
            for mut record in table.records {
                for column in &columns {
                    if !record.contains(column) {
                        record.insert(column.clone(), Value::Missing);
                    }
                }
                records.push(record);
            }
        }

        Table { columns, records }
    }

    /// Counts records per distinct value of `column`, in first-seen order.
    pub fn value_counts(&self, column: &str) -> Vec<(String, usize)> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut counts: Vec<(String, usize)> = Vec::new();
        for value in self.column_values(column) {
            let key = value.to_string();
            match index.get(&key) {
                Some(&position) => counts[position].1 += 1,
                None => {
                    index.insert(key.clone(), counts.len());
                    counts.push((key, 1));
                }
            }
        }
        counts
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Record>) {
        (self.columns, self.records)
    }

    /// Reassembles a table whose records are already aligned with `columns`.
    pub(crate) fn from_parts(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }
}
