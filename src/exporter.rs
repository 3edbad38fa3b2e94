use colored::*;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::engine::{ExportOptions, SheetVisibility, SpreadsheetEngine, Workbook};
use crate::error::{ExportError, ExportResult};

/// Print area forced onto the first exported sheet.
pub const FIRST_SHEET_PRINT_AREA: &str = "$A$1:$Q$200";

/// Exports the first two visible worksheets of a workbook into one PDF.
pub struct SheetExporter<'a> {
    engine: &'a dyn SpreadsheetEngine,
    options: ExportOptions,
}

impl<'a> SheetExporter<'a> {
    pub fn new(engine: &'a dyn SpreadsheetEngine) -> Self {
        Self {
            engine,
            options: ExportOptions::default(),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Open `spreadsheet`, export its first two visible sheets to `output_pdf`
    /// and close it again without saving.
    ///
    /// Once the workbook is open, sheet visibility is restored and the
    /// workbook closed on every path, including failures.
    pub async fn export_two_sheets(&self, spreadsheet: &Path, output_pdf: &Path) -> ExportResult<()> {
        debug!("Opening {} with {}", spreadsheet.display(), self.engine.name());
        let mut workbook = self.engine.open(spreadsheet).await?;

        let mut hidden = Vec::new();
        let result = self
            .export_internal(workbook.as_mut(), spreadsheet, output_pdf, &mut hidden)
            .await;

        for (index, original) in hidden {
            if let Err(e) = workbook.set_visibility(index, original) {
                warn!("Failed to restore visibility of sheet {} in {}: {}", index, spreadsheet.display(), e);
            }
        }

        if let Err(e) = workbook.close().await {
            warn!("Failed to close {}: {}", spreadsheet.display(), e);
        }

        result
    }

    async fn export_internal(
        &self,
        workbook: &mut dyn Workbook,
        spreadsheet: &Path,
        output_pdf: &Path,
        hidden: &mut Vec<(usize, SheetVisibility)>,
    ) -> ExportResult<()> {
        let sheets = workbook.sheets();
        let visible: Vec<usize> = sheets
            .iter()
            .enumerate()
            .filter(|(_, sheet)| sheet.visibility.is_visible())
            .map(|(index, _)| index)
            .collect();

        if visible.len() < 2 {
            return Err(ExportError::InsufficientVisibleSheets {
                path: spreadsheet.to_path_buf(),
                found: visible.len(),
            });
        }

        let (first, second) = (visible[0], visible[1]);
        debug!(
            "Exporting sheets '{}' and '{}' of {}",
            sheets[first].name,
            sheets[second].name,
            spreadsheet.display()
        );

        // Already hidden sheets are hidden again so the export set is exactly two sheets.
        for (index, sheet) in sheets.iter().enumerate() {
            if index != first && index != second {
                hidden.push((index, sheet.visibility));
                workbook.set_visibility(index, SheetVisibility::Hidden)?;
            }
        }

        workbook.set_print_area(first, FIRST_SHEET_PRINT_AREA)?;

        let second_area = workbook.print_area(second)?;
        if second_area.map_or(true, |area| area.is_empty()) {
            if let Some(used) = workbook.used_range(second)? {
                workbook.set_print_area(second, &used)?;
            }
        }

        workbook.export_pdf(output_pdf, &self.options).await?;

        info!(
            "PDF saved for {}: {}",
            spreadsheet.display(),
            output_pdf.display().to_string().green()
        );
        Ok(())
    }
}
