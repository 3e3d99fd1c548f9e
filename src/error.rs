// ⚠️ Store Errors - every failure a store operation can report
// Failures are terminal for the call and leave the in-memory table untouched.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing required field or malformed Age / SerialNo
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Identifier already used by another row
    #[error("Serial number {0} already exists")]
    Conflict(String),

    /// No row carries the requested identifier
    #[error("No patient with serial number {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// PDF report could not be produced
    #[error("Report error: {0}")]
    Document(String),

    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("No data file to back up at {}", .0.display())]
    MissingDataFile(PathBuf),
}

impl StoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for failures caused by the caller's input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StoreError::Validation { .. } | StoreError::Conflict(_) | StoreError::NotFound(_)
        )
    }
}

impl From<calamine::Error> for StoreError {
    fn from(e: calamine::Error) -> Self {
        StoreError::Spreadsheet(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for StoreError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        StoreError::Spreadsheet(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
