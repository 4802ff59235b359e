//! Export of the record directory to spreadsheet files, and retrieval of
//! individual photos.
//!
//! Exports are generated on demand from a directory snapshot and are not
//! part of the durability story.

pub mod photo;
pub mod table;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::info;

use crate::models::AttendanceRecord;

pub use photo::PhotoError;
pub use table::HEADERS;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No records to export")]
    NothingToExport,

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record {0} has no photo")]
    NoPhoto(String),

    #[error(transparent)]
    Photo(#[from] PhotoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    /// `attendance_<dd-mm-yyyy>.<ext>` for the given day.
    pub fn default_file_name(&self, now: DateTime<Local>) -> String {
        format!("attendance_{}.{}", now.format("%d-%m-%Y"), self.as_str())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Export format not supported: {}", other)),
        }
    }
}

/// Write `records` to `path` in the given format.
pub fn export_records(
    records: &[AttendanceRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<PathBuf, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    match format {
        ExportFormat::Xlsx => table::write_xlsx(records, path)?,
        ExportFormat::Csv => table::write_csv(records, path)?,
    }
    info!(count = records.len(), format = %format, path = %path.display(), "Records exported");
    Ok(path.to_path_buf())
}
