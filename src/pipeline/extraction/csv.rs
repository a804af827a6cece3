use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::ExtractionResult;

pub const CSV_FILE_NAME: &str = "diem_so_hoc_sinh.csv";
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8";
pub const CSV_HEADER: &str = r#""ten_hoc_sinh","diem_so","file_name""#;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No successful extractions to download.")]
    NoSuccessfulResults,

    #[error("Could not write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A ready-to-save CSV document.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub content: String,
}

impl CsvExport {
    /// Write the document into `dir` under its fixed file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(self.file_name);
        std::fs::write(&path, self.content.as_bytes()).map_err(|source| ExportError::Write {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = self.content.len(), "CSV exported");
        Ok(path)
    }
}

/// Build the CSV of successful rows: name, score, file name.
///
/// Every field is wrapped in double quotes verbatim. Embedded quotes and
/// commas are not escaped, so a name containing `"` yields a malformed row.
pub fn build_csv(results: &[ExtractionResult]) -> Result<CsvExport, ExportError> {
    let rows: Vec<String> = results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| format!("\"{}\",\"{}\",\"{}\"", r.ten_hoc_sinh, r.diem_so, r.file_name))
        .collect();

    if rows.is_empty() {
        return Err(ExportError::NoSuccessfulResults);
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.to_string());
    lines.extend(rows);

    Ok(CsvExport {
        file_name: CSV_FILE_NAME,
        mime_type: CSV_MIME_TYPE,
        content: lines.join("\n"),
    })
}

/// Whether the download action should be offered at all.
pub fn has_successful_results(results: &[ExtractionResult]) -> bool {
    results.iter().any(|r| r.is_success())
}
