use anyhow::{Context, Result};
use std::path::Path;

/// A non-blank line of a test table with its 1-based line number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLine {
    pub line_number: usize,
    pub text: String,
}

/// Split a record into raw fields on `separator`.
///
/// Fields are returned unprocessed; trimming and unquoting is the field
/// interpreter's job. An empty separator yields the whole line as one token.
pub fn tokenize(line: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return vec![line.to_string()];
    }
    line.split(separator).map(str::to_string).collect()
}

/// Parse table content, skipping blank lines
pub fn parse_table_content(content: &str) -> Vec<TableLine> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| TableLine {
            line_number: i + 1,
            text: line.trim_end_matches('\r').to_string(),
        })
        .collect()
}

/// Read a test table file
pub fn parse_table_file(path: &Path) -> Result<Vec<TableLine>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table: {}", path.display()))?;
    Ok(parse_table_content(&content))
}

/// Whether a path looks like a test table (cycle, suite or step)
pub fn is_table_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "cdd" || ext == "sdd" || ext == "std"
        })
        .unwrap_or(false)
}
