//! Post-processing steps applied to a combined table.
//!
//! Every step consumes a [`Table`] and returns a new one; steps never fail.
//! A [`Pipeline`] applies steps in the order the caller adds them, and the
//! order matters: a filter added after [`NormalizeColumns`] must reference
//! the normalized column names.

mod derive;
mod filter;
mod step;

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::sheet::aggregator::error::Result;
use crate::sheet::aggregator::model::Table;

pub use derive::{BinaryOp, Derive, Expr};
pub use filter::{CompareOp, Condition, Filter};
pub use step::parse_step;

/// A single table transformation.
pub trait Transform {
    /// Short description used in logs.
    fn name(&self) -> String;

    fn apply(&self, table: Table) -> Table;
}

/// Ordered list of transformations.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pipeline from steps written in the textual step syntax.
    pub fn from_steps<S: AsRef<str>>(steps: &[S]) -> Result<Self> {
        let mut pipeline = Self::new();
        for step in steps {
            pipeline.steps.push(parse_step(step.as_ref())?);
        }
        Ok(pipeline)
    }

    pub fn push(&mut self, step: impl Transform + 'static) {
        self.steps.push(Box::new(step));
    }

    pub fn then(mut self, step: impl Transform + 'static) -> Self {
        self.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn apply(&self, table: Table) -> Table {
        self.steps.iter().fold(table, |table, step| {
            let before = table.len();
            let table = step.apply(table);
            debug!(
                step = %step.name(),
                rows_before = before,
                rows_after = table.len(),
                "applied pipeline step"
            );
            table
        })
    }
}

impl Transform for Pipeline {
    fn name(&self) -> String {
        let names: Vec<String> = self.steps.iter().map(|step| step.name()).collect();
        format!("pipeline[{}]", names.join(", "))
    }

    fn apply(&self, table: Table) -> Table {
        Pipeline::apply(self, table)
    }
}

fn whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"))
}

/// Lower-cases a column name and collapses whitespace runs into `_`.
pub fn normalize_column_name(name: &str) -> String {
    whitespace()
        .replace_all(&name.to_lowercase(), "_")
        .into_owned()
}

/// Normalizes every column name with [`normalize_column_name`]. Names that
/// collide after normalization are suffixed `.1`, `.2`, … in column order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeColumns;

impl Transform for NormalizeColumns {
    fn name(&self) -> String {
        "normalize".to_string()
    }

    fn apply(&self, table: Table) -> Table {
        let (columns, records) = table.into_parts();

        let mut taken = HashSet::new();
        let mut mapping = HashMap::new();
        let mut renamed = Vec::with_capacity(columns.len());
        for column in columns {
            let base = normalize_column_name(&column);
            let mut name = base.clone();
            let mut suffix = 1;
            while !taken.insert(name.clone()) {
                name = format!("{base}.{suffix}");
                suffix += 1;
            }
            if name != column {
                mapping.insert(column, name.clone());
            }
            renamed.push(name);
        }

        if mapping.is_empty() {
            return Table::from_parts(renamed, records);
        }
        let records = records
            .into_iter()
            .map(|record| record.rename(&mapping))
            .collect();
        Table::from_parts(renamed, records)
    }
}

/// Removes one column from the table. Dropping an unknown column leaves the
/// table unchanged.
#[derive(Debug, Clone)]
pub struct DropColumn {
    column: String,
}

impl DropColumn {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Transform for DropColumn {
    fn name(&self) -> String {
        format!("drop {}", self.column)
    }

    fn apply(&self, table: Table) -> Table {
        if !table.has_column(&self.column) {
            debug!(column = %self.column, "drop of unknown column ignored");
            return table;
        }
        let (mut columns, mut records) = table.into_parts();
        columns.retain(|column| column != &self.column);
        for record in &mut records {
            record.remove(&self.column);
        }
        Table::from_parts(columns, records)
    }
}
