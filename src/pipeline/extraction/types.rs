use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Outcome of one uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Success,
    Error,
}

/// One row of the results table, one per uploaded file.
///
/// Build through `success` / `failure`: either the data fields or
/// `error_message` are populated, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub status: ExtractionStatus,
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Student name.
    pub ten_hoc_sinh: String,
    /// Score, kept verbatim as written on the paper ("8.5", "7,25", "9/10").
    pub diem_so: String,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

impl ExtractionResult {
    pub fn success(file_name: &str, fields: ScoreFields) -> Self {
        Self {
            status: ExtractionStatus::Success,
            file_name: file_name.to_string(),
            ten_hoc_sinh: fields.ten_hoc_sinh,
            diem_so: fields.diem_so,
            error_message: None,
        }
    }

    /// Blank messages are replaced so an error row always explains itself.
    pub fn failure(file_name: &str, message: &str) -> Self {
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message.to_string()
        };
        Self {
            status: ExtractionStatus::Error,
            file_name: file_name.to_string(),
            ten_hoc_sinh: String::new(),
            diem_so: String::new(),
            error_message: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExtractionStatus::Success
    }
}

pub const UNKNOWN_ERROR: &str = "Unknown error";

/// The two fields the model extracts from a test paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFields {
    pub ten_hoc_sinh: String,
    pub diem_so: String,
}

/// A file picked or dropped by the user.
///
/// The media type is declared, not sniffed: a non-image file keeps whatever
/// type it arrived with and fails at the model client.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: &str, media_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            media_type: media_type.to_string(),
            bytes,
        }
    }

    /// Read a file from disk, guessing the media type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractionError::FileNotFound(path.display().to_string())
            } else {
                ExtractionError::Io(e)
            }
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }
}

/// Progress snapshot published before each model call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionProgress {
    /// Zero-based position in the batch.
    pub index: usize,
    pub total: usize,
    pub file_name: String,
}

impl ExtractionProgress {
    /// Status line shown under the process button.
    pub fn message(&self) -> String {
        format!(
            "Processing file {} of {}: {}",
            self.index + 1,
            self.total,
            self.file_name
        )
    }
}
