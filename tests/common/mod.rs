//! Fake spreadsheet engine shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::{dictionary, Document, Object};
use sheets2pdf::engine::{ExportOptions, SheetInfo, SheetVisibility, SpreadsheetEngine, Workbook};
use sheets2pdf::error::{EngineError, EngineResult};
use sheets2pdf::scanner::folder_number;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Engine whose workbooks are described in memory, keyed by file name.
///
/// Exports write a one-page PDF whose MediaBox width is the workbook's folder
/// number, so merged page order can be checked.
#[derive(Default)]
pub struct FakeEngine {
    sheets: HashMap<String, Vec<SheetVisibility>>,
    failing: Vec<String>,
    pub opened: Rc<RefCell<Vec<PathBuf>>>,
    pub closed: Rc<RefCell<usize>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheets(mut self, file_name: &str, sheets: Vec<SheetVisibility>) -> Self {
        self.sheets.insert(file_name.to_string(), sheets);
        self
    }

    pub fn failing(mut self, file_name: &str) -> Self {
        self.failing.push(file_name.to_string());
        self
    }

    pub fn opened_names(&self) -> Vec<String> {
        self.opened
            .borrow()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

#[async_trait(?Send)]
impl SpreadsheetEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn open(&self, path: &Path) -> EngineResult<Box<dyn Workbook>> {
        self.opened.borrow_mut().push(path.to_path_buf());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let sheets = self
            .sheets
            .get(&name)
            .cloned()
            .unwrap_or_else(|| vec![SheetVisibility::Visible, SheetVisibility::Visible]);

        Ok(Box::new(FakeWorkbook {
            sheets,
            width: folder_number(path).unwrap_or(1),
            fail: self.failing.contains(&name),
            closed: Rc::clone(&self.closed),
        }))
    }
}

struct FakeWorkbook {
    sheets: Vec<SheetVisibility>,
    width: i64,
    fail: bool,
    closed: Rc<RefCell<usize>>,
}

#[async_trait(?Send)]
impl Workbook for FakeWorkbook {
    fn sheets(&self) -> Vec<SheetInfo> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(i, visibility)| SheetInfo {
                name: format!("Sheet{}", i + 1),
                visibility: *visibility,
            })
            .collect()
    }

    fn set_visibility(&mut self, index: usize, visibility: SheetVisibility) -> EngineResult<()> {
        *self.sheets.get_mut(index).ok_or(EngineError::NoSuchSheet(index))? = visibility;
        Ok(())
    }

    fn print_area(&self, _index: usize) -> EngineResult<Option<String>> {
        Ok(None)
    }

    fn set_print_area(&mut self, _index: usize, _area: &str) -> EngineResult<()> {
        Ok(())
    }

    fn used_range(&self, _index: usize) -> EngineResult<Option<String>> {
        Ok(Some("$A$1:$B$2".to_string()))
    }

    async fn export_pdf(&mut self, output: &Path, _options: &ExportOptions) -> EngineResult<()> {
        if self.fail {
            return Err(EngineError::Render("converter crashed".to_string()));
        }
        write_pdf(output, &[self.width]);
        Ok(())
    }

    async fn close(&mut self) -> EngineResult<()> {
        *self.closed.borrow_mut() += 1;
        Ok(())
    }
}

/// Write a PDF with one page per entry of `widths`.
pub fn write_pdf(path: &Path, widths: &[i64]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = widths
        .iter()
        .map(|width| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), (*width).into(), 842.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => widths.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// MediaBox widths of the pages of `path`, in page order.
pub fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_dictionary(*id).unwrap();
            page.get(b"MediaBox").unwrap().as_array().unwrap()[2].as_i64().unwrap()
        })
        .collect()
}

/// Create `root/<folder>/<file>` as an empty file.
pub fn touch(root: &Path, folder: &str, file: &str) -> PathBuf {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file);
    File::create(&path).unwrap();
    path
}
