//! Numbered spreadsheet discovery and per-file export.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::NumberRange;
use crate::exporter::SheetExporter;

/// Spreadsheet extensions that are exported.
pub const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xlsm"];

/// Suffix appended to the workbook stem for its exported PDF.
pub const EXPORT_SUFFIX: &str = "_invoice+specification.pdf";

/// A spreadsheet inside a numbered folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub path: PathBuf,
    pub number: i64,
}

/// A PDF written by the exporter, with the batch number it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedPdf {
    pub path: PathBuf,
    pub number: i64,
}

/// A matching spreadsheet that produced no PDF.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    /// Exported PDFs in directory walk order.
    pub exported: Vec<ExportedPdf>,
    pub skipped: Vec<SkippedFile>,
}

/// True for `.xlsx` / `.xlsm` files, ignoring the `~$` owner files office
/// suites leave next to open workbooks.
pub fn is_spreadsheet(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.starts_with("~$") {
        return false;
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Batch number of a file: the first whitespace-separated token of its parent
/// folder's name, e.g. `2991 ACME Ltd/invoice.xlsx` gives `2991`.
pub fn folder_number(path: &Path) -> Option<i64> {
    let folder = path.parent()?.file_name()?.to_string_lossy();
    folder.split_whitespace().next()?.parse().ok()
}

/// Export path for a workbook: `<export_folder>/<stem>_invoice+specification.pdf`.
pub fn export_path(spreadsheet: &Path, export_folder: &Path) -> PathBuf {
    let stem = spreadsheet
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    export_folder.join(format!("{}{}", stem, EXPORT_SUFFIX))
}

pub struct FolderScanner<'a> {
    exporter: SheetExporter<'a>,
}

impl<'a> FolderScanner<'a> {
    pub fn new(exporter: SheetExporter<'a>) -> Self {
        Self { exporter }
    }

    /// Find every spreadsheet under `source` whose folder number is in `range`.
    ///
    /// Files in folders without a numeric prefix are silently left out.
    pub fn plan(source: &Path, range: NumberRange) -> Result<Vec<Candidate>> {
        if !source.is_dir() {
            return Err(anyhow!("Source folder '{}' does not exist", source.display()));
        }

        let mut candidates = Vec::new();

        for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_spreadsheet(entry.path()) {
                continue;
            }

            let Some(number) = folder_number(entry.path()) else {
                debug!("No folder number for {}, skipping", entry.path().display());
                continue;
            };

            if range.contains(number) {
                candidates.push(Candidate {
                    path: entry.into_path(),
                    number,
                });
            } else {
                debug!("{} is outside range {}", entry.path().display(), range);
            }
        }

        Ok(candidates)
    }

    /// Export every in-range spreadsheet under `source` into `export_folder`.
    ///
    /// A workbook counts as exported when its PDF exists after the attempt.
    /// Per-file failures are logged and recorded in the report; only a
    /// missing source folder or an uncreatable export folder fails the scan.
    pub async fn scan(&self, source: &Path, export_folder: &Path, range: NumberRange) -> Result<ScanReport> {
        fs::create_dir_all(export_folder)
            .await
            .map_err(|e| anyhow!("Failed to create export folder {}: {}", export_folder.display(), e))?;

        let candidates = Self::plan(source, range)?;
        info!(
            "Found {} spreadsheet(s) in range {}, exporting with {}",
            candidates.len(),
            range,
            self.exporter.engine_name()
        );

        let mut report = ScanReport::default();

        for candidate in candidates {
            let output = export_path(&candidate.path, export_folder);

            let failure = match self.exporter.export_two_sheets(&candidate.path, &output).await {
                Ok(()) => None,
                Err(e) => {
                    warn!("Skipping {}: {}", candidate.path.display(), e);
                    Some(e.to_string())
                }
            };

            let exists = fs::try_exists(&output).await.unwrap_or(false);
            match (exists, failure) {
                (true, failure) => {
                    if failure.is_some() {
                        warn!("Using existing {} from an earlier run", output.display());
                    }
                    report.exported.push(ExportedPdf {
                        path: output,
                        number: candidate.number,
                    });
                }
                (false, Some(reason)) => report.skipped.push(SkippedFile {
                    path: candidate.path,
                    reason,
                }),
                (false, None) => {
                    warn!("Export of {} reported success but {} is missing", candidate.path.display(), output.display());
                    report.skipped.push(SkippedFile {
                        path: candidate.path,
                        reason: format!("no PDF at {}", output.display()),
                    });
                }
            }
        }

        Ok(report)
    }
}
