//! Spreadsheet engine backed by a headless LibreOffice.
//!
//! Sheet visibility and print areas are changed on an in-memory copy of the
//! workbook. On export the copy is staged in a private workspace and converted
//! by a `soffice` process that runs with its own throwaway user profile, so
//! concurrent office sessions of the operator are never touched. The source
//! file on disk is never written.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;
use umya_spreadsheet::helper::coordinate::string_from_column_index;
use umya_spreadsheet::{SheetStateValues, Spreadsheet, Worksheet};
use url::Url;

use crate::engine::{ExportOptions, SheetInfo, SheetVisibility, SpreadsheetEngine, Workbook};
use crate::error::{EngineError, EngineResult};

/// Name of the defined name holding a sheet's print area.
const PRINT_AREA_NAME: &str = "_xlnm.Print_Area";

const PDF_FILTER: &str = "pdf:calc_pdf_Export";

pub struct OfficeEngine {
    soffice: PathBuf,
}

impl OfficeEngine {
    pub fn new(soffice: impl Into<PathBuf>) -> Self {
        Self {
            soffice: soffice.into(),
        }
    }
}

impl Default for OfficeEngine {
    fn default() -> Self {
        Self::new("soffice")
    }
}

#[async_trait(?Send)]
impl SpreadsheetEngine for OfficeEngine {
    fn name(&self) -> &str {
        "LibreOffice"
    }

    async fn open(&self, path: &Path) -> EngineResult<Box<dyn Workbook>> {
        Ok(Box::new(OfficeWorkbook::load(path, &self.soffice)?))
    }
}

struct OfficeWorkbook {
    source: PathBuf,
    book: Spreadsheet,
    /// `None` once the workbook is closed.
    workspace: Option<TempDir>,
    soffice: PathBuf,
}

impl OfficeWorkbook {
    fn load(path: &Path, soffice: &Path) -> EngineResult<Self> {
        let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| EngineError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let workspace = tempfile::Builder::new().prefix("sheets2pdf-").tempdir()?;
        debug!("Session workspace for {}: {}", path.display(), workspace.path().display());

        Ok(Self {
            source: path.to_path_buf(),
            book,
            workspace: Some(workspace),
            soffice: soffice.to_path_buf(),
        })
    }

    /// Write the edited workbook into the session workspace and return its path.
    fn stage(&self) -> EngineResult<PathBuf> {
        let staged = self.workspace()?.join(self.staged_name());
        umya_spreadsheet::writer::xlsx::write(&self.book, &staged)
            .map_err(|e| EngineError::Render(format!("failed to stage workbook: {}", e)))?;
        Ok(staged)
    }

    fn sheet(&self, index: usize) -> EngineResult<&Worksheet> {
        self.book
            .get_sheet_collection()
            .get(index)
            .ok_or(EngineError::NoSuchSheet(index))
    }

    fn sheet_mut(&mut self, index: usize) -> EngineResult<&mut Worksheet> {
        self.book
            .get_sheet_collection_mut()
            .get_mut(index)
            .ok_or(EngineError::NoSuchSheet(index))
    }

    fn workspace(&self) -> EngineResult<&Path> {
        self.workspace
            .as_ref()
            .map(TempDir::path)
            .ok_or_else(|| EngineError::Render(format!("{} is already closed", self.source.display())))
    }

    /// File name the staged copy is written under; keeps the macro-enabled
    /// extension so the converter picks the right import filter.
    fn staged_name(&self) -> &'static str {
        let is_xlsm = self
            .source
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("xlsm"))
            .unwrap_or(false);
        if is_xlsm {
            "workbook.xlsm"
        } else {
            "workbook.xlsx"
        }
    }
}

#[async_trait(?Send)]
impl Workbook for OfficeWorkbook {
    fn sheets(&self) -> Vec<SheetInfo> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|sheet| SheetInfo {
                name: sheet.get_name().to_string(),
                visibility: visibility_of(sheet.get_state()),
            })
            .collect()
    }

    fn set_visibility(&mut self, index: usize, visibility: SheetVisibility) -> EngineResult<()> {
        self.sheet_mut(index)?.set_state(sheet_state(visibility));
        Ok(())
    }

    fn print_area(&self, index: usize) -> EngineResult<Option<String>> {
        let area = self
            .sheet(index)?
            .get_defined_names()
            .iter()
            .find(|name| name.get_name() == PRINT_AREA_NAME)
            .map(|name| name.get_address())
            .filter(|address| !address.is_empty());
        Ok(area)
    }

    fn set_print_area(&mut self, index: usize, area: &str) -> EngineResult<()> {
        let sheet = self.sheet_mut(index)?;
        let address = format!("{}!{}", quote_sheet_name(sheet.get_name()), area);

        let existing = sheet
            .get_defined_names_mut()
            .iter_mut()
            .find(|name| name.get_name() == PRINT_AREA_NAME);

        match existing {
            Some(name) => {
                name.set_address(address.as_str());
            }
            None => sheet
                .add_defined_name(PRINT_AREA_NAME.to_string(), address)
                .map_err(|e| EngineError::PrintArea(e.to_string()))?,
        }
        Ok(())
    }

    /// Bounding box of all stored cells, from the first used cell to the last.
    fn used_range(&self, index: usize) -> EngineResult<Option<String>> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;

        for cell in self.sheet(index)?.get_cell_collection() {
            let coordinate = cell.get_coordinate();
            let (column, row) = (coordinate.get_col_num().clone(), coordinate.get_row_num().clone());
            bounds = Some(match bounds {
                None => (column, row, column, row),
                Some((min_col, min_row, max_col, max_row)) => (
                    min_col.min(column),
                    min_row.min(row),
                    max_col.max(column),
                    max_row.max(row),
                ),
            });
        }

        Ok(bounds.map(|(min_col, min_row, max_col, max_row)| {
            format!(
                "${}${}:${}${}",
                string_from_column_index(&min_col),
                min_row,
                string_from_column_index(&max_col),
                max_row
            )
        }))
    }

    async fn export_pdf(&mut self, output: &Path, options: &ExportOptions) -> EngineResult<()> {
        check_options(options)?;

        let workspace = self.workspace()?.to_path_buf();
        let out_dir = workspace.join("out");
        let profile = workspace.join("profile");

        let staged = self.stage()?;
        fs::create_dir_all(&out_dir).await?;
        fs::create_dir_all(&profile).await?;

        let profile_url = Url::from_directory_path(&profile)
            .map_err(|_| EngineError::Render(format!("invalid profile path {}", profile.display())))?;

        debug!("Converting {} with {}", self.source.display(), self.soffice.display());
        let result = Command::new(&self.soffice)
            .arg("--headless")
            .arg("--invisible")
            .arg("--nologo")
            .arg("--norestore")
            .arg("--nolockcheck")
            .arg(format!("-env:UserInstallation={}", profile_url))
            .arg("--convert-to")
            .arg(PDF_FILTER)
            .arg("--outdir")
            .arg(&out_dir)
            .arg(&staged)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineError::Render(format!("failed to launch {}: {}", self.soffice.display(), e)))?;

        if !result.status.success() {
            return Err(EngineError::Render(format!(
                "{} exited with {}: {}",
                self.soffice.display(),
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let produced = out_dir.join(Path::new(self.staged_name()).with_extension("pdf"));
        if !fs::try_exists(&produced).await.unwrap_or(false) {
            return Err(EngineError::Render(format!(
                "converter produced no PDF for {}: {}",
                self.source.display(),
                String::from_utf8_lossy(&result.stdout).trim()
            )));
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&produced, output).await?;
        Ok(())
    }

    async fn close(&mut self) -> EngineResult<()> {
        if let Some(workspace) = self.workspace.take() {
            workspace.close()?;
        }
        Ok(())
    }
}

fn visibility_of(state: &SheetStateValues) -> SheetVisibility {
    match state {
        SheetStateValues::Hidden => SheetVisibility::Hidden,
        SheetStateValues::VeryHidden => SheetVisibility::VeryHidden,
        SheetStateValues::Visible => SheetVisibility::Visible,
    }
}

fn sheet_state(visibility: SheetVisibility) -> SheetStateValues {
    match visibility {
        SheetVisibility::Visible => SheetStateValues::Visible,
        SheetVisibility::Hidden => SheetStateValues::Hidden,
        SheetVisibility::VeryHidden => SheetStateValues::VeryHidden,
    }
}

/// The converter always embeds document properties, honours print areas and
/// never opens its output.
fn check_options(options: &ExportOptions) -> EngineResult<()> {
    if !options.include_doc_properties || options.ignore_print_areas || options.open_after_publish {
        return Err(EngineError::Render(format!(
            "export options {:?} are not supported by LibreOffice",
            options
        )));
    }
    Ok(())
}

/// Quote a sheet name for use in a cell reference when it needs it.
fn quote_sheet_name(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
