//! Error types shared across the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the `paths.txt` run configuration.
///
/// Every variant is fatal: the run stops before any folder is scanned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file must contain at least 4 lines, found {found}")]
    TooFewLines { found: usize },

    #[error("Range must look like '2991-2995', got '{0}'")]
    MalformedRange(String),

    #[error("Range bound '{0}' is not a number")]
    NotParseable(String),

    #[error("Range start {start} is greater than range end {end}")]
    InvertedRange { start: i64, end: i64 },
}

/// Failures reported by a spreadsheet engine implementation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to open workbook {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Workbook has no sheet at index {0}")]
    NoSuchSheet(usize),

    #[error("Failed to set print area: {0}")]
    PrintArea(String),

    #[error("Failed to render PDF: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-file export failures. The scanner logs these and moves on.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Not enough visible sheets in {path}: found {found}, need 2")]
    InsufficientVisibleSheets { path: PathBuf, found: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type EngineResult<T> = Result<T, EngineError>;
pub type ExportResult<T> = Result<T, ExportError>;
