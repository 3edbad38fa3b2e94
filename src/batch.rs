use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info};

use crate::config::Config;
use crate::engine::SpreadsheetEngine;
use crate::exporter::SheetExporter;
use crate::pdf_merger::merge_exports;
use crate::scanner::{ExportedPdf, FolderScanner, SkippedFile};

/// Outcome of one batch run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub exported: Vec<ExportedPdf>,
    pub skipped: Vec<SkippedFile>,
    /// Path of the merged document, if one was written.
    pub merged: Option<PathBuf>,
    /// Set when the scan finished but merging failed.
    pub merge_error: Option<String>,
}

impl RunSummary {
    pub fn merge_failed(&self) -> bool {
        self.merge_error.is_some()
    }
}

/// Runs the whole pipeline for one config: export every in-range workbook,
/// then merge the results.
pub struct BatchRunner<'a> {
    config: Config,
    engine: &'a dyn SpreadsheetEngine,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: Config, engine: &'a dyn SpreadsheetEngine) -> Self {
        Self { config, engine }
    }

    /// Fails only when scanning cannot start. A failed merge is reported in the
    /// summary so the exported PDFs are still accounted for.
    pub async fn run(&self) -> Result<RunSummary> {
        info!(
            "Processing \"{}\" for numbers {}",
            self.config.source_folder.display().to_string().green(),
            self.config.range
        );

        fs::create_dir_all(&self.config.merge_folder).await?;

        let scanner = FolderScanner::new(SheetExporter::new(self.engine));
        let report = scanner
            .scan(
                &self.config.source_folder,
                &self.config.export_folder,
                self.config.range,
            )
            .await?;

        info!(
            "Exported {} PDF(s), skipped {} file(s)",
            report.exported.len(),
            report.skipped.len()
        );

        let mut summary = RunSummary {
            exported: report.exported,
            skipped: report.skipped,
            ..Default::default()
        };

        match merge_exports(&summary.exported, &self.config.merge_folder).await {
            Ok(merged) => summary.merged = merged,
            Err(e) => {
                error!("Failed to merge PDFs: {}", e);
                summary.merge_error = Some(e.to_string());
            }
        }

        Ok(summary)
    }
}
