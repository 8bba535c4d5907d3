use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Underlying reader failure carried by [`ToolError::UnreadableFile`].
pub type ReadFailure = Box<dyn StdError + Send + Sync + 'static>;

/// Stage of the aggregation in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Listing and matching files in the input directory.
    Selection,
    /// Opening and reading a workbook or delimited file.
    Reading,
    /// Extracting the embedded date from a file name.
    DateExtraction,
    /// Parsing configuration values, patterns and pipeline steps.
    Configuration,
    /// Writing the combined table out.
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Selection => "selection",
            Stage::Reading => "reading",
            Stage::DateExtraction => "date extraction",
            Stage::Configuration => "configuration",
            Stage::Export => "export",
        };
        f.write_str(label)
    }
}

/// Error type covering the different failure cases that can occur while
/// selecting, reading, aggregating, or exporting spreadsheet data.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Raised when the input directory does not exist or cannot be listed.
    #[error("directory not found or unreadable: {}: {source}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised when a file cannot be opened or parsed.
    #[error("unreadable file '{file}': {source}")]
    UnreadableFile {
        file: String,
        #[source]
        source: ReadFailure,
    },

    /// Raised when a sheet's header row cannot be determined.
    #[error("malformed sheet '{sheet}' in '{file}': {reason}")]
    MalformedSheet {
        file: String,
        sheet: String,
        reason: String,
    },

    /// Raised when a file name does not embed a `YYYY-MM-DD` date.
    #[error("no valid YYYY-MM-DD date in file name '{file}'")]
    DateExtraction { file: String },

    /// Raised when the file-name pattern is not a valid regular expression.
    #[error("invalid file pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Raised when a target month is not of the form `YYYY-MM`.
    #[error("invalid year-month '{0}', expected YYYY-MM")]
    InvalidYearMonth(String),

    /// Raised when the configured field delimiter is not a single ASCII character.
    #[error("invalid delimiter {0:?}, expected a single ASCII character")]
    InvalidDelimiter(char),

    /// Raised when a configuration file cannot be read.
    #[error("cannot read configuration {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised when a required setting is given neither on the command line
    /// nor in a configuration file.
    #[error("missing required setting {0}")]
    MissingSetting(String),

    /// Raised when a textual pipeline step cannot be parsed.
    #[error("invalid pipeline step '{step}': {reason}")]
    InvalidStep { step: String, reason: String },

    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the delimited text writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when a JSON configuration file cannot be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Reports which stage of the run produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            ToolError::DirectoryNotFound { .. } => Stage::Selection,
            ToolError::UnreadableFile { .. } | ToolError::MalformedSheet { .. } => Stage::Reading,
            ToolError::DateExtraction { .. } => Stage::DateExtraction,
            ToolError::InvalidPattern(_)
            | ToolError::InvalidYearMonth(_)
            | ToolError::InvalidDelimiter(_)
            | ToolError::ConfigFile { .. }
            | ToolError::MissingSetting(_)
            | ToolError::InvalidStep { .. }
            | ToolError::Json(_)
            | ToolError::Logging(_) => Stage::Configuration,
            ToolError::Io(_) | ToolError::Csv(_) | ToolError::ExcelWrite(_) => Stage::Export,
        }
    }

    /// Name of the file the error relates to, when there is one.
    pub fn file(&self) -> Option<&str> {
        match self {
            ToolError::UnreadableFile { file, .. }
            | ToolError::MalformedSheet { file, .. }
            | ToolError::DateExtraction { file } => Some(file),
            _ => None,
        }
    }

    /// Whether the error is confined to a single input file, i.e. whether a
    /// skip-and-continue policy may step over it.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            ToolError::UnreadableFile { .. } | ToolError::MalformedSheet { .. }
        )
    }

    pub(crate) fn unreadable(file: &str, source: impl Into<ReadFailure>) -> Self {
        ToolError::UnreadableFile {
            file: file.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn malformed(file: &str, sheet: &str, reason: impl Into<String>) -> Self {
        ToolError::MalformedSheet {
            file: file.to_string(),
            sheet: sheet.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_step(step: &str, reason: impl Into<String>) -> Self {
        ToolError::InvalidStep {
            step: step.to_string(),
            reason: reason.into(),
        }
    }
}
