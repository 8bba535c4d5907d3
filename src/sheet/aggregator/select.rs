use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::{debug, instrument};

use crate::sheet::aggregator::error::{Result, ToolError};

/// Compiles a case-sensitive file-name pattern.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(pattern)?)
}

/// Lists the regular files directly inside `directory` whose base name
/// matches `pattern`, sorted lexicographically.
#[instrument(level = "debug", skip(pattern), fields(directory = %directory.display(), pattern = %pattern))]
pub fn select_files(directory: &Path, pattern: &Regex) -> Result<Vec<String>> {
    let not_found = |source| ToolError::DirectoryNotFound {
        path: directory.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(directory).map_err(not_found)? {
        let entry = entry.map_err(not_found)?;
        if !entry.path().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            debug!(name = ?entry.file_name(), "skipping non UTF-8 file name");
            continue;
        };
        if pattern.is_match(&name) {
            names.push(name);
        }
    }

    names.sort();
    names.dedup();
    debug!(matched = names.len(), "selected files");
    Ok(names)
}
