use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sheet::aggregator::error::{Result, ToolError};

fn default_delimiter() -> char {
    ','
}

/// What the aggregation does when a single file cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole aggregation on the first unreadable file.
    #[default]
    FailFast,
    /// Log the failure, record the file as skipped, and continue.
    SkipUnreadable,
}

/// Settings for one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Directory scanned (non-recursively) for input files.
    pub directory: PathBuf,
    /// Regular expression matched against file base names.
    pub pattern: String,
    /// Restricts the input to files whose embedded date falls in this
    /// `YYYY-MM` month.
    #[serde(default)]
    pub year_month: Option<String>,
    #[serde(default)]
    pub on_error: FailurePolicy,
    /// Field delimiter for `.csv`/`.txt` inputs; `.tsv` always uses tabs.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Post-processing steps in the textual step syntax, applied in order.
    #[serde(default)]
    pub steps: Vec<String>,
}

impl AggregateConfig {
    pub fn new(directory: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            pattern: pattern.into(),
            year_month: None,
            on_error: FailurePolicy::default(),
            delimiter: default_delimiter(),
            steps: Vec::new(),
        }
    }

    pub fn with_year_month(mut self, year_month: impl Into<String>) -> Self {
        self.year_month = Some(year_month.into());
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Loads a configuration from a JSON document.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| ToolError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }
}
