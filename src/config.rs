//! Run configuration read from a plain 4-line text file.
//!
//! ```text
//! D:\Invoices\2024
//! D:\Invoices\export
//! D:\Invoices\merged
//! 2991-2995
//! ```

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Inclusive range of batch numbers to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberRange {
    pub start: i64,
    pub end: i64,
}

impl NumberRange {
    pub fn new(start: i64, end: i64) -> ConfigResult<Self> {
        if start > end {
            return Err(ConfigError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        self.start <= value && value <= self.end
    }
}

impl std::str::FromStr for NumberRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 2 {
            return Err(ConfigError::MalformedRange(s.to_string()));
        }

        let parse = |token: &str| {
            token
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::NotParseable(token.trim().to_string()))
        };

        Self::new(parse(parts[0])?, parse(parts[1])?)
    }
}

impl std::fmt::Display for NumberRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Tree searched for numbered spreadsheet folders.
    pub source_folder: PathBuf,
    /// Where the per-workbook PDFs are written.
    pub export_folder: PathBuf,
    /// Where the merged document is written.
    pub merge_folder: PathBuf,
    pub range: NumberRange,
}

/// Read and parse the config file at `path`.
pub fn read_config(path: &Path) -> ConfigResult<Config> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse config text. Blank lines are skipped, lines after the fourth are ignored.
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 4 {
        return Err(ConfigError::TooFewLines { found: lines.len() });
    }

    Ok(Config {
        source_folder: PathBuf::from(lines[0]),
        export_folder: PathBuf::from(lines[1]),
        merge_folder: PathBuf::from(lines[2]),
        range: lines[3].parse()?,
    })
}
