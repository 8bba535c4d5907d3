//! Selection of file subsets by the calendar date embedded in their names,
//! e.g. `sample_2019-01-09.xlsx`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::sheet::aggregator::error::{Result, ToolError};

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2}").expect("date pattern is a valid regex")
    })
}

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl FromStr for YearMonth {
    type Err = ToolError;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || ToolError::InvalidYearMonth(value.to_string());
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Extracts the first valid `YYYY-MM-DD` date embedded in a file name.
pub fn extract_date(file_name: &str) -> Result<NaiveDate> {
    date_pattern()
        .find_iter(file_name)
        .find_map(|matched| NaiveDate::parse_from_str(matched.as_str(), "%Y-%m-%d").ok())
        .ok_or_else(|| ToolError::DateExtraction {
            file: file_name.to_string(),
        })
}

/// Groups file names by the month of their embedded date, keeping the
/// original order within each group.
pub fn group_by_year_month(file_names: &[String]) -> Result<BTreeMap<YearMonth, Vec<String>>> {
    let mut groups: BTreeMap<YearMonth, Vec<String>> = BTreeMap::new();
    for name in file_names {
        let month = YearMonth::of(extract_date(name)?);
        groups.entry(month).or_default().push(name.clone());
    }
    Ok(groups)
}

/// Keeps the file names whose embedded date falls in `target`, in original
/// order. Fails on the first name without a date.
pub fn select_year_month(file_names: &[String], target: YearMonth) -> Result<Vec<String>> {
    let mut groups = group_by_year_month(file_names)?;
    let selected = groups.remove(&target).unwrap_or_default();
    debug!(
        month = %target,
        selected = selected.len(),
        total = file_names.len(),
        "filtered files by month"
    );
    Ok(selected)
}
