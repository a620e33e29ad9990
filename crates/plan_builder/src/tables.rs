//! CSV exports → [`RawTable`]
//!
//! Spreadsheet exports come with either `,` or `;` separators depending on
//! locale; the separator is picked from the header line.

use anyhow::{Context, Result};
use fv_core::RawTable;
use std::fs;
use std::path::Path;

/// Pick `;` when the header line has more semicolons than commas.
pub fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or("");
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Read a CSV file with a header row.
///
/// Short rows are kept (missing cells read as empty); fully blank rows are
/// dropped.
pub fn read_csv_table(path: &Path, name: &str) -> Result<RawTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    parse_csv_table(&content, name)
        .with_context(|| format!("Failed to parse CSV file: {}", path.display()))
}

pub fn parse_csv_table(content: &str, name: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(detect_delimiter(content))
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = RawTable::new(name, headers);
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", line + 2))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}
