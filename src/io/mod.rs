//! Table I/O: loading input tables and writing exported ones.
//!
//! Formats are negotiated here, never in the task handlers: the export task
//! only hands `(table, path, format)` to a [`TableSink`].

pub mod csv_table;
pub mod excel_table;
pub mod json_table;
pub mod parquet_table;

use crate::core::table::{Table, TableError};
use crate::core::types::Fault;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Errors from reading or writing tables.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Filesystem operation failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// No writer for this format
    #[error("Unsupported export format: {0}")]
    UnsupportedExport(String),

    /// No reader for this format
    #[error("Unsupported input format: {0}")]
    UnsupportedInput(String),

    #[error("cannot infer table format from {}", .0.display())]
    UnknownExtension(PathBuf),

    /// Data parsed but does not describe a table
    #[error("Invalid table data: {0}")]
    InvalidShape(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

impl From<IoError> for Fault {
    fn from(e: IoError) -> Self {
        Fault::new(e.to_string())
    }
}

/// Persisted table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
    Excel,
    Parquet,
}

impl TableFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" | "jsonl" => Some(Self::Json),
            "xlsx" | "xls" => Some(Self::Excel),
            "parquet" => Some(Self::Parquet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "excel",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableFormat {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "excel" => Ok(Self::Excel),
            "parquet" => Ok(Self::Parquet),
            _ => Err(IoError::UnsupportedExport(s.to_string())),
        }
    }
}

/// Destination for exported tables.
pub trait TableSink: Send + Sync {
    fn write(&self, table: &Table, path: &Path, format: TableFormat) -> Result<(), IoError>;
}

/// Writes tables to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink;

impl TableSink for FileSink {
    fn write(&self, table: &Table, path: &Path, format: TableFormat) -> Result<(), IoError> {
        save_table(table, path, format)
    }
}

/// Load a table, choosing the reader by file extension.
pub fn load_table(path: &Path) -> Result<Table, IoError> {
    let format =
        TableFormat::from_path(path).ok_or_else(|| IoError::UnknownExtension(path.to_path_buf()))?;
    let read_text = || {
        std::fs::read_to_string(path).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    let table = match format {
        TableFormat::Csv => csv_table::read_csv(&read_text()?)?,
        TableFormat::Json => json_table::read_json(&read_text()?)?,
        TableFormat::Parquet => parquet_table::read_parquet(path)?,
        TableFormat::Excel => return Err(IoError::UnsupportedInput(format.to_string())),
    };
    tracing::debug!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "loaded table"
    );
    Ok(table)
}

/// Write a table, creating parent directories as needed.
pub fn save_table(table: &Table, path: &Path, format: TableFormat) -> Result<(), IoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| IoError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let write_text = |content: String| {
        std::fs::write(path, content).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    match format {
        TableFormat::Csv => write_text(csv_table::write_csv(table)?)?,
        TableFormat::Json => write_text(json_table::write_json(table)?)?,
        TableFormat::Excel => excel_table::write_xlsx(table, path)?,
        TableFormat::Parquet => parquet_table::write_parquet(table, path)?,
    }
    tracing::debug!(path = %path.display(), %format, rows = table.row_count(), "wrote table");
    Ok(())
}
