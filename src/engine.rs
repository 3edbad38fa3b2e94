//! Capability interface to a spreadsheet engine.
//!
//! The exporter only needs a handful of operations from the application that
//! renders workbooks: open a file, inspect and change sheet visibility, read
//! and set print areas, export to PDF and close without saving. Anything that
//! can do those can stand in for the real engine, which keeps the scanner and
//! merger testable without an office suite installed.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::error::EngineResult;

/// Visibility state of one worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetVisibility {
    Visible,
    Hidden,
    /// Hidden and not listed in the application's unhide dialog.
    VeryHidden,
}

impl SheetVisibility {
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

impl fmt::Display for SheetVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => write!(f, "visible"),
            Self::Hidden => write!(f, "hidden"),
            Self::VeryHidden => write!(f, "veryHidden"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub name: String,
    pub visibility: SheetVisibility,
}

/// Settings for the fixed-layout export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_doc_properties: bool,
    pub ignore_print_areas: bool,
    pub open_after_publish: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_doc_properties: true,
            ignore_print_areas: false,
            open_after_publish: false,
        }
    }
}

/// Factory for workbook sessions.
///
/// Each call to [`SpreadsheetEngine::open`] starts a fresh session; nothing is
/// shared between workbooks.
#[async_trait(?Send)]
pub trait SpreadsheetEngine {
    /// Short name used in log output.
    fn name(&self) -> &str;

    async fn open(&self, path: &Path) -> EngineResult<Box<dyn Workbook>>;
}

/// An opened workbook. Sheet indexes follow workbook order.
///
/// Changes made through this trait live only for the session; [`Workbook::close`]
/// discards them and releases the engine.
#[async_trait(?Send)]
pub trait Workbook {
    fn sheets(&self) -> Vec<SheetInfo>;

    fn set_visibility(&mut self, index: usize, visibility: SheetVisibility) -> EngineResult<()>;

    /// Current print area, `None` when the sheet has none.
    fn print_area(&self, index: usize) -> EngineResult<Option<String>>;

    fn set_print_area(&mut self, index: usize, area: &str) -> EngineResult<()>;

    /// Address of the used cell range, `None` for an empty sheet.
    fn used_range(&self, index: usize) -> EngineResult<Option<String>>;

    async fn export_pdf(&mut self, output: &Path, options: &ExportOptions) -> EngineResult<()>;

    /// Close without saving and shut the engine session down. The workbook
    /// must not be used afterwards.
    async fn close(&mut self) -> EngineResult<()>;
}
