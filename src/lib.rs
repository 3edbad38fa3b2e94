//! # sheets2pdf
//!
//! Exports numbered spreadsheet batches to PDF and merges the results.
//!
//! Spreadsheets are picked up from folders whose name starts with a batch
//! number (`2991 ACME Ltd/invoice.xlsx`). For every workbook in the configured
//! range the first two visible sheets are exported to one PDF, and all PDFs
//! are merged into `Invoice+Specification <ranges>.pdf`.
//!
//! ## Usage
//!
//! ```bash
//! sheets2pdf run --config paths.txt
//! sheets2pdf plan --config paths.txt --json
//! sheets2pdf merge --dir export --output merged
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod office;
pub mod ranges;
pub mod scanner;

mod batch;
mod exporter;
mod pdf_merger;

pub use batch::{BatchRunner, RunSummary};
pub use config::{read_config, Config, NumberRange};
pub use exporter::{SheetExporter, FIRST_SHEET_PRINT_AREA};
pub use office::OfficeEngine;
pub use pdf_merger::{merge_exports, PdfMerger};
pub use scanner::{ExportedPdf, FolderScanner, ScanReport};
